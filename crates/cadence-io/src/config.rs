//! Pipeline configuration.
//!
//! Every field is optional in TOML; missing fields take the defaults below.
//!
//! ```toml
//! source = "drums.wav"
//! sink = "copy.wav"
//! sample_rate = 0      # 0 = use the source's rate
//! block_size = 256
//! buffer_size = 512
//! silence = -90.0
//! threshold = 0.0      # 0 = stage default
//! verbose = false
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// No source path was given.
    #[error("no source given")]
    MissingSource,

    /// `block_size` is 0.
    #[error("block size must be positive")]
    ZeroBlockSize,

    /// `buffer_size` is 0.
    #[error("buffer size must be positive")]
    ZeroBufferSize,
}

/// Options shared by every pipeline driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input WAV path.
    pub source: Option<PathBuf>,
    /// Output WAV path; no sink when absent.
    pub sink: Option<PathBuf>,
    /// Requested sample rate, 0 to take the source's.
    pub sample_rate: u32,
    /// Samples per read (hop size of the analysis stages).
    pub block_size: usize,
    /// Working buffer capacity.
    pub buffer_size: usize,
    /// Silence gate in dB.
    pub silence: f32,
    /// Peak-picking threshold, 0 for the stage default.
    pub threshold: f32,
    /// Verbose logging.
    pub verbose: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: None,
            sink: None,
            sample_rate: 0,
            block_size: 256,
            buffer_size: 512,
            silence: -90.0,
            threshold: 0.0,
            verbose: false,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Checks the fields a pipeline needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.is_none() {
            return Err(ConfigError::MissingSource);
        }
        if self.block_size == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        Ok(())
    }

    /// Source path as a URI string.
    pub fn source_uri(&self) -> Option<String> {
        self.source.as_ref().map(|p| p.to_string_lossy().into_owned())
    }

    /// Sink path as a URI string.
    pub fn sink_uri(&self) -> Option<String> {
        self.sink.as_ref().map(|p| p.to_string_lossy().into_owned())
    }
}
