//! Producer-facing logger: registry plus its batch writer thread.

use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use tally_core::error::{Result, TallyError};
use tally_core::MetricSet;

use crate::config::LoggerSection;
use crate::registry::Registry;
use crate::writer::{BatchSink, BatchWriter, LogFile, WriterOptions, WriterReport};

/// Aggregating metrics logger over the kinds of `S`.
///
/// `log` is safe to call from any number of threads. Dropping the logger (or
/// calling [`Logger::close`]) raises shutdown and blocks until everything
/// logged before that point is on disk.
pub struct Logger<S: MetricSet> {
    registry: Arc<Registry<S>>,
    worker: Option<JoinHandle<WriterReport>>,
}

impl<S: MetricSet> Logger<S> {
    /// Append to `path` with default writer options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let registry = Registry::new()?;
        let sink = LogFile::open(path, false)?;
        Self::start(registry, sink, WriterOptions::default())
    }

    /// Validates `cfg` first; sections built in code skip the loader's checks.
    pub fn with_config(cfg: &LoggerSection) -> Result<Self> {
        cfg.validate()?;
        let registry = Registry::new()?;
        let sink = LogFile::open(&cfg.path, cfg.sync_every_batch)?;
        tracing::info!(path = %sink.path().display(), "log file opened");
        Self::start(registry, sink, cfg.writer_options())
    }

    /// Write batches to a custom sink.
    pub fn with_sink<K: BatchSink>(sink: K, options: WriterOptions) -> Result<Self> {
        Self::start(Registry::new()?, sink, options)
    }

    fn start<K: BatchSink>(registry: Registry<S>, sink: K, options: WriterOptions) -> Result<Self> {
        let registry = Arc::new(registry);
        let worker = BatchWriter::new(Arc::clone(&registry), sink, options).spawn()?;
        Ok(Self {
            registry,
            worker: Some(worker),
        })
    }

    /// Fold an update into the current batch. Never blocks on I/O.
    ///
    /// Returns `false` if the update was dropped because the logger is
    /// shutting down.
    pub fn log(&self, update: impl Into<S>) -> bool {
        self.registry.log(update)
    }

    /// Shut down, wait for the final batch, and return the writer's report.
    pub fn close(mut self) -> Result<WriterReport> {
        self.shutdown().unwrap_or_else(|| Ok(WriterReport::default()))
    }

    fn shutdown(&mut self) -> Option<Result<WriterReport>> {
        let worker = self.worker.take()?;
        self.registry.shutdown();
        Some(worker.join().map_err(|_| {
            tracing::error!("batch writer panicked");
            TallyError::WorkerPanicked
        }))
    }
}

impl<S: MetricSet> Drop for Logger<S> {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
