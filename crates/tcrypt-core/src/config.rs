//! Engine configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::digits::DEFAULT_CACHE_CAPACITY;
use crate::error::{Error, Result};

/// Initial synthetic stream length used when binding keys
pub const DEFAULT_STREAM_LENGTH: usize = 10_000;

/// Upper bound for stream growth
pub const DEFAULT_MAX_STREAM_LENGTH: usize = 1_000_000;

/// Streams longer than this are searched in parallel
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 10_000;

/// Runtime settings shared by every engine component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding `pi_1m.txt` and `e_1m.txt`
    pub data_dir: PathBuf,
    /// Worker threads for synthesis and search
    pub threads: usize,
    /// Cached ranges per constant
    pub cache_capacity: usize,
    /// Starting stream length for key binding
    pub stream_length: usize,
    /// Stream length at which growth gives up
    pub max_stream_length: usize,
    /// Minimum stream length for the parallel search
    pub parallel_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            threads: default_threads(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            stream_length: DEFAULT_STREAM_LENGTH,
            max_stream_length: DEFAULT_MAX_STREAM_LENGTH,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

/// `$HOME/.tcrypt/data`, or `./.tcrypt/data` without a home directory
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tcrypt")
        .join("data")
}

/// One fewer than the available cores, at least 1
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

impl EngineConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(Error::InvalidParameter("threads must be at least 1".into()));
        }
        if self.stream_length == 0 {
            return Err(Error::InvalidParameter(
                "stream_length must be at least 1".into(),
            ));
        }
        if self.max_stream_length < self.stream_length {
            return Err(Error::InvalidParameter(format!(
                "max_stream_length {} is below stream_length {}",
                self.max_stream_length, self.stream_length
            )));
        }
        Ok(())
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    pub fn with_stream_length(mut self, stream_length: usize) -> Self {
        self.stream_length = stream_length;
        self
    }

    pub fn with_max_stream_length(mut self, max_stream_length: usize) -> Self {
        self.max_stream_length = max_stream_length;
        self
    }

    pub fn with_parallel_threshold(mut self, parallel_threshold: usize) -> Self {
        self.parallel_threshold = parallel_threshold;
        self
    }
}
