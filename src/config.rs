use std::num::NonZeroUsize;

use crate::error::{BrcError, Result};
use crate::partition::MIN_CHUNK_SIZE;

/// What to do with a line that does not match `key;value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinePolicy {
    /// Abort the run on the first malformed line.
    #[default]
    Strict,
    /// Skip malformed lines, count them and keep going.
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadStrategy {
    /// Positional reads into a per-chunk buffer.
    #[default]
    Pread,
    /// Read chunks out of a read-only memory map.
    Mmap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub workers: usize,
    pub min_chunk_size: u64,
    pub policy: LinePolicy,
    pub read: ReadStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            workers: available_workers(),
            min_chunk_size: MIN_CHUNK_SIZE,
            policy: LinePolicy::default(),
            read: ReadStrategy::default(),
        }
    }
}

impl Config {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_min_chunk_size(mut self, bytes: u64) -> Self {
        self.min_chunk_size = bytes;
        self
    }

    pub fn with_policy(mut self, policy: LinePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_read(mut self, read: ReadStrategy) -> Self {
        self.read = read;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(BrcError::Config("worker count must be at least 1".into()));
        }
        if self.min_chunk_size == 0 {
            return Err(BrcError::Config("minimum chunk size must be at least 1 byte".into()));
        }
        Ok(())
    }
}

pub fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
