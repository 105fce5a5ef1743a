//! Block sources.

use std::fs::File;
use std::io::BufReader;

use cadence_core::{SampleBuffer, log_released};
use hound::{SampleFormat, WavReader};

use crate::{OpenError, OpenErrorKind, uri_path};

/// A stream of mono samples read one block at a time.
pub trait Source: Send {
    /// Reads up to one block into `buffer` and returns the number of samples
    /// read. Fewer than [`block_size`](Source::block_size) means the stream
    /// has ended.
    fn read(&mut self, buffer: &mut SampleBuffer) -> usize;

    /// Sample rate of the stream in Hz.
    fn sample_rate(&self) -> u32;

    /// Nominal samples per read.
    fn block_size(&self) -> usize;

    /// Closes the stream. Idempotent; later reads return 0.
    fn close(&mut self);

    /// Whether [`close`](Source::close) has been called.
    fn is_closed(&self) -> bool;
}

/// WAV file source.
///
/// Multichannel files are mixed down to mono by averaging channels; integer
/// PCM is scaled into `[-1, 1)`.
pub struct WavSource {
    uri: String,
    reader: Option<WavReader<BufReader<File>>>,
    sample_rate: u32,
    block_size: usize,
    channels: usize,
    format: SampleFormat,
    bits_per_sample: u16,
}

impl WavSource {
    /// Opens `uri` (a path, optionally prefixed with `file://`).
    ///
    /// `sample_rate` 0 accepts the file's rate; any other value must match it.
    pub fn open(uri: &str, sample_rate: u32, block_size: usize) -> Result<Self, OpenError> {
        if block_size == 0 {
            return Err(OpenError::new(uri, OpenErrorKind::InvalidBlockSize));
        }
        let reader = WavReader::open(uri_path(uri)).map_err(|e| OpenError::from_wav(uri, e))?;
        let spec = reader.spec();

        if sample_rate != 0 && sample_rate != spec.sample_rate {
            return Err(OpenError::new(
                uri,
                OpenErrorKind::RateMismatch {
                    requested: sample_rate,
                    actual: spec.sample_rate,
                },
            ));
        }
        if spec.channels == 0 || (spec.sample_format == SampleFormat::Int && spec.bits_per_sample > 32) {
            return Err(OpenError::new(uri, OpenErrorKind::UnsupportedFormat));
        }

        tracing::debug!(
            uri,
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            bits = spec.bits_per_sample,
            block_size,
            "source opened"
        );

        Ok(Self {
            uri: uri.to_owned(),
            reader: Some(reader),
            sample_rate: spec.sample_rate,
            block_size,
            channels: spec.channels as usize,
            format: spec.sample_format,
            bits_per_sample: spec.bits_per_sample,
        })
    }

    /// URI the source was opened with.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Channel count of the file before mixdown.
    pub fn channels(&self) -> usize {
        self.channels
    }
}

impl Source for WavSource {
    fn read(&mut self, buffer: &mut SampleBuffer) -> usize {
        let Some(reader) = self.reader.as_mut() else {
            log_released("wav source", "read");
            return 0;
        };

        let frames = self.block_size.min(buffer.size());
        let out = buffer.as_mut_slice();
        let n = match self.format {
            SampleFormat::Float => read_frames(reader.samples::<f32>(), self.channels, &mut out[..frames], |s| s),
            SampleFormat::Int => {
                let scale = 1.0 / (1_u64 << (self.bits_per_sample - 1)) as f32;
                read_frames(reader.samples::<i32>(), self.channels, &mut out[..frames], |s| s as f32 * scale)
            }
        };
        out[n..].fill(0.0);
        n
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            tracing::debug!(uri = %self.uri, "source closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.reader.is_none()
    }
}

/// Mixes interleaved samples down into `out`; returns whole frames read.
fn read_frames<S>(
    mut samples: impl Iterator<Item = hound::Result<S>>,
    channels: usize,
    out: &mut [f32],
    to_f32: impl Fn(S) -> f32,
) -> usize {
    let gain = 1.0 / channels as f32;
    for (frame, slot) in out.iter_mut().enumerate() {
        let mut acc = 0.0;
        for _ in 0..channels {
            match samples.next() {
                Some(Ok(s)) => acc += to_f32(s),
                Some(Err(err)) => {
                    tracing::warn!(%err, frame, "sample decode failed, ending stream");
                    return frame;
                }
                None => return frame,
            }
        }
        *slot = acc * gain;
    }
    out.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use tempfile::NamedTempFile;

    fn write_int16(path: &std::path::Path, channels: u16, frames: &[[i16; 2]]) {
        let spec = WavSpec {
            channels,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for frame in frames {
            for &s in &frame[..channels as usize] {
                writer.write_sample(s).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_stereo_mixdown_and_scaling() {
        let file = NamedTempFile::new().unwrap();
        write_int16(file.path(), 2, &[[16384, 0], [-32768, -32768], [8192, 8192]]);

        let mut source = WavSource::open(file.path().to_str().unwrap(), 0, 4).unwrap();
        assert_eq!(source.sample_rate(), 8000);
        assert_eq!(source.channels(), 2);

        let mut buf = SampleBuffer::new(4);
        buf.fill(9.0);
        assert_eq!(source.read(&mut buf), 3);
        assert_eq!(buf.as_slice(), &[0.25, -1.0, 0.25, 0.0]);
        assert_eq!(source.read(&mut buf), 0);
    }

    #[test]
    fn test_read_limited_by_buffer() {
        let file = NamedTempFile::new().unwrap();
        write_int16(file.path(), 1, &[[100, 0]; 10]);

        let mut source = WavSource::open(file.path().to_str().unwrap(), 8000, 8).unwrap();
        let mut small = SampleBuffer::new(3);
        assert_eq!(source.read(&mut small), 3);
        let mut large = SampleBuffer::new(16);
        assert_eq!(source.read(&mut large), 7);
        assert!(large.as_slice()[7..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_file_scheme_accepted() {
        let file = NamedTempFile::new().unwrap();
        write_int16(file.path(), 1, &[[0, 0]; 4]);
        let uri = format!("file://{}", file.path().display());
        assert!(WavSource::open(&uri, 0, 4).is_ok());
    }

    #[test]
    fn test_open_failures() {
        let err = WavSource::open("/nonexistent/input.wav", 0, 256).err().unwrap();
        assert_eq!(err.kind, OpenErrorKind::NotFound);
        assert!(err.code.is_some());

        let file = NamedTempFile::new().unwrap();
        write_int16(file.path(), 1, &[[0, 0]; 4]);
        let path = file.path().to_str().unwrap();
        let err = WavSource::open(path, 44100, 256).err().unwrap();
        assert_eq!(
            err.kind,
            OpenErrorKind::RateMismatch {
                requested: 44100,
                actual: 8000
            }
        );
        let err = WavSource::open(path, 0, 0).err().unwrap();
        assert_eq!(err.kind, OpenErrorKind::InvalidBlockSize);

        let garbage = NamedTempFile::new().unwrap();
        std::fs::write(garbage.path(), b"not a wav file").unwrap();
        let err = WavSource::open(garbage.path().to_str().unwrap(), 0, 256).err().unwrap();
        assert_eq!(err.kind, OpenErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_close_is_idempotent() {
        let file = NamedTempFile::new().unwrap();
        write_int16(file.path(), 1, &[[1, 0]; 8]);
        let mut source = WavSource::open(file.path().to_str().unwrap(), 0, 4).unwrap();
        source.close();
        source.close();
        assert!(source.is_closed());
        assert_eq!(source.read(&mut SampleBuffer::new(4)), 0);
        assert_eq!(source.sample_rate(), 8000);
    }
}
