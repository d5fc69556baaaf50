use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{error, info};

use crate::aggregate::GlobalTable;
use crate::config::{Config, ReadStrategy};
use crate::error::{BrcError, Result};
use crate::merge::merge_all;
use crate::partition::partition;
use crate::scan::{scan_chunk, ChunkScan};
use crate::source::{ChunkSource, FileSource, MmapSource};

#[derive(Debug)]
pub struct RunOutcome {
    pub table: GlobalTable,
    pub file_size: u64,
    pub chunks: usize,
    pub lines: u64,
    pub skipped: u64,
    pub elapsed: Duration,
}

/// Partitions the input, scans every chunk on its own worker and merges the
/// local tables.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Config,
}

impl Engine {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Engine { config })
    }

    pub fn run(&self, path: &Path) -> Result<RunOutcome> {
        info!(path = %path.display(), read = ?self.config.read, "opening input");
        match self.config.read {
            ReadStrategy::Pread => self.run_source(&FileSource::open(path)?),
            ReadStrategy::Mmap => self.run_source(&MmapSource::open(path)?),
        }
    }

    pub fn run_source<S>(&self, source: &S) -> Result<RunOutcome>
    where
        S: ChunkSource + ?Sized,
    {
        let start = Instant::now();
        let file_size = source.len();
        let chunks = partition(file_size, self.config.workers, self.config.min_chunk_size);
        info!(
            file_size,
            chunks = chunks.len(),
            workers = self.config.workers,
            policy = ?self.config.policy,
            "partitioned input"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("brc-worker-{i}"))
            .build()?;

        let policy = self.config.policy;
        let cancel = AtomicBool::new(false);
        let results: Vec<Result<ChunkScan>> = pool.install(|| {
            chunks
                .par_iter()
                .map(|&chunk| {
                    if cancel.load(Ordering::Relaxed) {
                        return Err(BrcError::Cancelled { chunk: chunk.index });
                    }
                    let result = scan_chunk(source, chunk, policy, &cancel);
                    if result.is_err() {
                        cancel.store(true, Ordering::Relaxed);
                    }
                    result
                })
                .collect()
        });

        let mut tables = Vec::with_capacity(results.len());
        let mut failure = None;
        let (mut lines, mut skipped) = (0, 0);
        for result in results {
            match result {
                Ok(scan) if failure.is_none() => {
                    lines += scan.lines;
                    skipped += scan.skipped;
                    tables.push(scan.table);
                }
                Ok(_) | Err(BrcError::Cancelled { .. }) => {}
                Err(err) => {
                    if failure.is_none() {
                        failure = Some(err);
                    }
                }
            }
        }
        if let Some(err) = failure {
            error!(%err, "run aborted");
            return Err(err);
        }

        // Merge in chunk order so repeated runs produce identical sums.
        let table = merge_all(tables);
        let elapsed = start.elapsed();
        info!(
            lines,
            skipped,
            keys = table.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "aggregation complete"
        );
        Ok(RunOutcome { table, file_size, chunks: chunks.len(), lines, skipped, elapsed })
    }
}
