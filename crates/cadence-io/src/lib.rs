//! Stream endpoints and the block pipeline for cadence.
//!
//! This crate provides:
//!
//! - **Endpoints**: the [`Source`] and [`Sink`] traits with WAV file
//!   implementations ([`WavSource`], [`WavSink`])
//! - **Pipeline**: [`Pipeline`] reads a block, runs a chain of [`Process`]
//!   functions over it and optionally writes it out, until the source
//!   reports a short read
//! - **Configuration**: [`PipelineConfig`] loaded from TOML
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cadence_analysis::{Onset, OnsetMode};
//! use cadence_core::AnalysisStage;
//! use cadence_io::{Pipeline, Process};
//!
//! # fn main() -> cadence_io::Result<()> {
//! let mut pipeline = Pipeline::from_uris("input.wav", "copy.wav", 0, 256, 512)?;
//! let mut onset = Onset::new(OnsetMode::Hfc, 512, 256, pipeline.sample_rate()).unwrap();
//!
//! let mut detect = |buf: &mut cadence_core::SampleBuffer| onset.process(buf);
//! let total = pipeline.process_all(&mut [&mut detect as &mut dyn Process]);
//! println!("{total} samples");
//! # Ok(())
//! # }
//! ```

mod config;
mod pipeline;
mod sink;
mod source;

pub use config::{ConfigError, PipelineConfig};
pub use pipeline::{Pipeline, Process};
pub use sink::{Sink, WavSink};
pub use source::{Source, WavSource};

use std::io;

/// Why an endpoint could not be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OpenErrorKind {
    /// The path does not exist.
    #[error("not found")]
    NotFound,
    /// The OS refused access.
    #[error("permission denied")]
    PermissionDenied,
    /// The file is not a WAV stream this crate can decode.
    #[error("unsupported format")]
    UnsupportedFormat,
    /// The requested sample rate differs from the stream's.
    #[error("sample rate {requested} Hz requested, stream is {actual} Hz")]
    RateMismatch {
        /// Rate asked for by the caller.
        requested: u32,
        /// Rate of the stream.
        actual: u32,
    },
    /// A block size of 0 was requested.
    #[error("block size must be positive")]
    InvalidBlockSize,
    /// A sample rate of 0 was given where a rate is required.
    #[error("sample rate must be positive")]
    InvalidSampleRate,
    /// Any other I/O failure.
    #[error("i/o error")]
    Io,
}

/// A source or sink could not be opened.
#[derive(Debug, thiserror::Error)]
#[error("cannot open '{uri}': {kind}")]
pub struct OpenError {
    /// URI as given by the caller.
    pub uri: String,
    /// Failure class.
    pub kind: OpenErrorKind,
    /// OS error code, when the failure came from the OS.
    pub code: Option<i32>,
    /// Underlying decoder or I/O error.
    #[source]
    pub source: Option<hound::Error>,
}

impl OpenError {
    /// Creates an error without an underlying cause.
    pub fn new(uri: impl Into<String>, kind: OpenErrorKind) -> Self {
        Self {
            uri: uri.into(),
            kind,
            code: None,
            source: None,
        }
    }

    /// Classifies a `hound` failure.
    pub fn from_wav(uri: impl Into<String>, err: hound::Error) -> Self {
        let (kind, code) = match &err {
            hound::Error::IoError(e) => (
                match e.kind() {
                    io::ErrorKind::NotFound => OpenErrorKind::NotFound,
                    io::ErrorKind::PermissionDenied => OpenErrorKind::PermissionDenied,
                    _ => OpenErrorKind::Io,
                },
                e.raw_os_error(),
            ),
            _ => (OpenErrorKind::UnsupportedFormat, None),
        };
        Self {
            uri: uri.into(),
            kind,
            code,
            source: Some(err),
        }
    }
}

/// Error types for cadence I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An endpoint could not be opened.
    #[error(transparent)]
    Open(#[from] OpenError),

    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Invalid or unreadable configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience result type for cadence I/O.
pub type Result<T> = std::result::Result<T, Error>;

/// Strips an optional `file://` scheme from a URI.
pub(crate) fn uri_path(uri: &str) -> &str {
    uri.strip_prefix("file://").unwrap_or(uri)
}
