//! Cadence Analysis - spectral stages for streaming onset, tempo and pitch
//!
//! Every stage consumes one hop of samples (or one grain) per call and
//! exposes its result through [`AnalysisStage::output`](cadence_core::AnalysisStage::output):
//!
//! - [`fft`] - FFT wrapper with windowing functions
//! - [`phase_vocoder`] - Sliding STFT analysis and overlap-add resynthesis
//! - [`specdesc`] - Onset detection functions over phase vocoder grains
//! - [`peak_picker`] - Adaptive moving-median peak picker
//! - [`onset`] - Onset detector (phase vocoder, descriptor, peak picker, gates)
//! - [`tempo`] - Autocorrelation beat tracker
//! - [`pitch`] - YIN, YIN-FFT, Schmitt and spectral comb pitch trackers
//! - [`filterbank`] - Mel and custom spectral filter banks
//!
//! ## Example
//!
//! ```rust
//! use cadence_analysis::{Onset, OnsetMode};
//! use cadence_core::{AnalysisStage, SampleBuffer};
//!
//! let mut onset = Onset::new(OnsetMode::Hfc, 1024, 256, 44100).unwrap();
//! let block = SampleBuffer::new(256);
//! onset.process(&block);
//! if onset.output().get(0) == Some(1.0) {
//!     println!("onset at {:.3} s", onset.last_onset_s());
//! }
//! ```
//!
//! ## Features
//!
//! - `tracing` - creation and detection events through `tracing`, and
//!   released-handle warnings from `cadence-core`.

pub mod fft;
pub mod filterbank;
pub mod onset;
pub mod peak_picker;
pub mod phase_vocoder;
pub mod pitch;
pub mod specdesc;
pub mod tempo;

pub use fft::{Fft, Window};
pub use filterbank::FilterBank;
pub use onset::Onset;
pub use peak_picker::PeakPicker;
pub use phase_vocoder::PhaseVoc;
pub use pitch::{Pitch, PitchMethod, PitchUnit};
pub use specdesc::{OnsetMode, SpecDesc};
pub use tempo::Tempo;
