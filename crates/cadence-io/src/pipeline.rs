//! Block pipeline: source → processing chain → optional sink.
//!
//! A [`Pipeline`] is either open (source attached, working buffer allocated)
//! or closed; there is nothing in between. Each step reads one block into the
//! working buffer, runs every [`Process`] in the chain over it in order and
//! hands the result to the sink. A read shorter than the source's block size
//! ends the stream.

use cadence_core::SampleBuffer;

use crate::config::PipelineConfig;
use crate::sink::{Sink, WavSink};
use crate::source::{Source, WavSource};
use crate::{OpenError, Result};

/// One link of a processing chain.
///
/// Implemented for every `FnMut(&mut SampleBuffer)`, so closures that feed
/// analysis stages can be chained directly.
pub trait Process {
    /// Processes the working buffer. May modify it in place.
    fn process(&mut self, buffer: &mut SampleBuffer);
}

impl<F: FnMut(&mut SampleBuffer)> Process for F {
    fn process(&mut self, buffer: &mut SampleBuffer) {
        self(buffer);
    }
}

/// Source-to-sink block pipeline.
///
/// # Example
///
/// ```rust,no_run
/// use cadence_core::SampleBuffer;
/// use cadence_io::{Pipeline, Process};
///
/// # fn main() -> cadence_io::Result<()> {
/// let mut pipeline = Pipeline::from_uris("in.wav", "out.wav", 0, 256, 256)?;
/// let mut gain = |buf: &mut SampleBuffer| buf.as_mut_slice().iter_mut().for_each(|s| *s *= 0.5);
/// pipeline.process_all(&mut [&mut gain as &mut dyn Process]);
/// pipeline.close();
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    source: Box<dyn Source>,
    sink: Option<Box<dyn Sink>>,
    buffer: SampleBuffer,
    block_size: usize,
    processed: u64,
    closed: bool,
}

impl Pipeline {
    /// Builds a pipeline over already-open endpoints.
    pub fn new(source: Box<dyn Source>, sink: Option<Box<dyn Sink>>, buffer_size: usize) -> Self {
        let block_size = source.block_size();
        if buffer_size < block_size {
            tracing::warn!(buffer_size, block_size, "buffer smaller than block, every read will be short");
        }
        tracing::debug!(
            block_size,
            buffer_size,
            sample_rate = source.sample_rate(),
            sink = sink.is_some(),
            "pipeline opened"
        );
        Self {
            source,
            sink,
            buffer: SampleBuffer::new(buffer_size),
            block_size,
            processed: 0,
            closed: false,
        }
    }

    /// Opens a WAV source and WAV sink.
    ///
    /// With `sample_rate` 0 the rate is taken from the source and used for
    /// the sink.
    pub fn from_uris(
        source_uri: &str,
        sink_uri: &str,
        sample_rate: u32,
        block_size: usize,
        buffer_size: usize,
    ) -> std::result::Result<Self, OpenError> {
        Self::open_with(
            |rate| Ok(Box::new(WavSource::open(source_uri, rate, block_size)?) as Box<dyn Source>),
            |rate| Ok(Box::new(WavSink::open(sink_uri, rate)?) as Box<dyn Sink>),
            sample_rate,
            buffer_size,
        )
    }

    /// Opens both endpoints through the given openers.
    ///
    /// The source is opened first with `sample_rate`; the sink is opened with
    /// `sample_rate`, or the source's rate when `sample_rate` is 0. If the
    /// sink fails the source is closed before the error is returned.
    pub fn open_with<FS, FK>(
        open_source: FS,
        open_sink: FK,
        sample_rate: u32,
        buffer_size: usize,
    ) -> std::result::Result<Self, OpenError>
    where
        FS: FnOnce(u32) -> std::result::Result<Box<dyn Source>, OpenError>,
        FK: FnOnce(u32) -> std::result::Result<Box<dyn Sink>, OpenError>,
    {
        let mut source = open_source(sample_rate)?;
        let rate = if sample_rate == 0 {
            source.sample_rate()
        } else {
            sample_rate
        };

        let sink = match open_sink(rate) {
            Ok(sink) => sink,
            Err(err) => {
                tracing::warn!(%err, "sink open failed, closing source");
                source.close();
                return Err(err);
            }
        };
        Ok(Self::new(source, Some(sink), buffer_size))
    }

    /// Builds a pipeline from configuration. Without a sink path the
    /// pipeline only reads.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        let source_uri = config.source_uri().unwrap_or_default();

        match config.sink_uri() {
            Some(sink_uri) => Ok(Self::from_uris(
                &source_uri,
                &sink_uri,
                config.sample_rate,
                config.block_size,
                config.buffer_size,
            )?),
            None => {
                let source = WavSource::open(&source_uri, config.sample_rate, config.block_size)?;
                Ok(Self::new(Box::new(source), None, config.buffer_size))
            }
        }
    }

    /// Reads one block, runs the chain, writes to the sink.
    fn step(&mut self, chain: &mut [&mut dyn Process]) -> usize {
        let n = self.source.read(&mut self.buffer);
        if n == 0 {
            tracing::trace!("empty read");
            return 0;
        }

        for stage in chain.iter_mut() {
            stage.process(&mut self.buffer);
        }

        let count = match self.sink.as_mut() {
            Some(sink) => sink.write(&self.buffer, n),
            None => n,
        };
        self.processed += count as u64;
        tracing::trace!(read = n, count, "step");
        count
    }

    fn is_short(&self, count: usize) -> bool {
        count == 0 || count < self.block_size
    }

    /// Runs exactly one step. Returns the samples transferred.
    pub fn process(&mut self, chain: &mut [&mut dyn Process]) -> usize {
        if self.closed {
            tracing::warn!("process on closed pipeline");
            return 0;
        }
        self.step(chain)
    }

    /// Runs up to `n` steps, stopping after the first short read. Returns
    /// the cumulative count.
    pub fn process_n(&mut self, n: usize, chain: &mut [&mut dyn Process]) -> usize {
        if self.closed {
            tracing::warn!("process_n on closed pipeline");
            return 0;
        }
        let mut total = 0;
        for _ in 0..n {
            let count = self.step(chain);
            total += count;
            if self.is_short(count) {
                break;
            }
        }
        total
    }

    /// Runs steps until a short read. Returns the cumulative count.
    pub fn process_all(&mut self, chain: &mut [&mut dyn Process]) -> usize {
        if self.closed {
            tracing::warn!("process_all on closed pipeline");
            return 0;
        }
        let mut total = 0;
        loop {
            let count = self.step(chain);
            total += count;
            if self.is_short(count) {
                break;
            }
        }
        tracing::debug!(total, "stream drained");
        total
    }

    /// Closes the source and sink and releases the working buffer.
    /// Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.source.close();
        if let Some(sink) = self.sink.as_mut() {
            sink.close();
        }
        self.buffer.release();
        self.closed = true;
        tracing::debug!(processed = self.processed, "pipeline closed");
    }

    /// Source block size.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Working buffer capacity, 0 once closed.
    pub fn buffer_size(&self) -> usize {
        self.buffer.size()
    }

    /// Sample rate of the source.
    pub fn sample_rate(&self) -> u32 {
        self.source.sample_rate()
    }

    /// Whether a sink is attached.
    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Whether [`close`](Pipeline::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Samples transferred since the pipeline was opened.
    pub fn processed(&self) -> u64 {
        self.processed
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.close();
    }
}
