//! Block sinks.

use std::fs::File;
use std::io::BufWriter;

use cadence_core::{SampleBuffer, log_released};
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::{OpenError, OpenErrorKind, uri_path};

/// A stream that accepts mono samples one block at a time.
pub trait Sink: Send {
    /// Writes the first `n` samples of `buffer`; returns `n`, or the number
    /// of samples written before the stream failed.
    fn write(&mut self, buffer: &SampleBuffer, n: usize) -> usize;

    /// Sample rate of the stream in Hz.
    fn sample_rate(&self) -> u32;

    /// Flushes and closes the stream. Idempotent.
    fn close(&mut self);

    /// Whether [`close`](Sink::close) has been called.
    fn is_closed(&self) -> bool;
}

/// Mono 32-bit float WAV sink.
///
/// The header is finalized on [`close`](Sink::close) or drop.
pub struct WavSink {
    uri: String,
    writer: Option<WavWriter<BufWriter<File>>>,
    sample_rate: u32,
    written: u64,
}

impl WavSink {
    /// Creates (or truncates) the file at `uri`.
    pub fn open(uri: &str, sample_rate: u32) -> Result<Self, OpenError> {
        if sample_rate == 0 {
            return Err(OpenError::new(uri, OpenErrorKind::InvalidSampleRate));
        }
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let writer = WavWriter::create(uri_path(uri), spec).map_err(|e| OpenError::from_wav(uri, e))?;
        tracing::debug!(uri, sample_rate, "sink opened");

        Ok(Self {
            uri: uri.to_owned(),
            writer: Some(writer),
            sample_rate,
            written: 0,
        })
    }

    /// URI the sink was opened with.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Samples written so far.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Sink for WavSink {
    fn write(&mut self, buffer: &SampleBuffer, n: usize) -> usize {
        let Some(writer) = self.writer.as_mut() else {
            log_released("wav sink", "write");
            return 0;
        };

        let count = n.min(buffer.size());
        if count < n {
            tracing::warn!(requested = n, available = count, "write larger than buffer, truncated");
        }
        for (i, &sample) in buffer.as_slice()[..count].iter().enumerate() {
            if let Err(err) = writer.write_sample(sample) {
                tracing::warn!(uri = %self.uri, %err, written = i, "sample write failed");
                return i;
            }
            self.written += 1;
        }
        n
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn close(&mut self) {
        let Some(writer) = self.writer.take() else {
            return;
        };
        match writer.finalize() {
            Ok(()) => tracing::debug!(uri = %self.uri, samples = self.written, "sink closed"),
            Err(err) => tracing::warn!(uri = %self.uri, %err, "failed to finalize WAV header"),
        }
    }

    fn is_closed(&self) -> bool {
        self.writer.is_none()
    }
}

impl Drop for WavSink {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::WavReader;
    use tempfile::tempdir;

    #[test]
    fn test_write_and_finalize() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let mut sink = WavSink::open(path.to_str().unwrap(), 22050).unwrap();

        let block = SampleBuffer::from_slice(&[0.1, -0.2, 0.3, 0.4]);
        assert_eq!(sink.write(&block, 4), 4);
        assert_eq!(sink.write(&block, 2), 2);
        sink.close();
        assert!(sink.is_closed());
        assert_eq!(sink.written(), 6);

        let mut reader = WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<f32> = reader.samples::<f32>().map(Result::unwrap).collect();
        assert_eq!(samples, vec![0.1, -0.2, 0.3, 0.4, 0.1, -0.2]);
    }

    #[test]
    fn test_oversized_write_is_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.wav");
        let mut sink = WavSink::open(path.to_str().unwrap(), 8000).unwrap();
        assert_eq!(sink.write(&SampleBuffer::new(2), 5), 5);
        assert_eq!(sink.written(), 2);
    }

    #[test]
    fn test_drop_finalizes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dropped.wav");
        {
            let mut sink = WavSink::open(path.to_str().unwrap(), 8000).unwrap();
            sink.write(&SampleBuffer::from_slice(&[0.5; 8]), 8);
        }
        let reader = WavReader::open(&path).unwrap();
        assert_eq!(reader.len(), 8);
    }

    #[test]
    fn test_open_failures() {
        let err = WavSink::open("/tmp/never.wav", 0).err().unwrap();
        assert_eq!(err.kind, OpenErrorKind::InvalidSampleRate);

        let err = WavSink::open("/nonexistent/dir/out.wav", 44100).err().unwrap();
        assert_eq!(err.kind, OpenErrorKind::NotFound);
        assert!(err.code.is_some());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_write_reports_short_count() {
        // Every flush to /dev/full fails with ENOSPC.
        if !std::path::Path::new("/dev/full").exists() {
            return;
        }
        let Ok(mut sink) = WavSink::open("/dev/full", 8000) else {
            return;
        };
        let block = SampleBuffer::new(40_000);
        let count = sink.write(&block, 40_000);
        assert!(count < 40_000, "count {count}");
        assert_eq!(sink.written(), count as u64);
    }

    #[test]
    fn test_write_after_close() {
        let dir = tempdir().unwrap();
        let mut sink = WavSink::open(dir.path().join("c.wav").to_str().unwrap(), 8000).unwrap();
        sink.close();
        sink.close();
        assert_eq!(sink.write(&SampleBuffer::new(4), 4), 0);
    }
}
