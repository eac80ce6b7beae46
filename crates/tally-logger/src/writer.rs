//! Background batch writer.
//!
//! A single worker thread owns the log sink. It idles on the registry until
//! something is dirty or shutdown is raised, appends one line per drained
//! batch, and on shutdown keeps draining until the registry is clean before
//! syncing and closing the sink.

use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tally_core::error::{Result, TallyError};
use tally_core::MetricSet;

use crate::registry::{Batch, Next, Registry};

/// Timestamp layout at the start of every line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Destination for rendered batch lines. Only the writer thread touches it.
pub trait BatchSink: Send + 'static {
    /// Append one line; `line` carries no trailing newline.
    fn append_line(&mut self, line: &str) -> io::Result<()>;

    /// Push everything appended so far to stable storage.
    fn sync(&mut self) -> io::Result<()>;
}

/// Append-only log file.
pub struct LogFile {
    file: File,
    path: PathBuf,
    sync_every_batch: bool,
    buf: String,
    // A failed write left bytes that could not be truncated away.
    torn: bool,
}

impl LogFile {
    /// Open `path` for appending, creating it if absent.
    pub fn open(path: impl AsRef<Path>, sync_every_batch: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| TallyError::io(format!("could not open {}", path.display()), e))?;

        Ok(Self {
            file,
            path,
            sync_every_batch,
            buf: String::new(),
            torn: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cut the file back to `len` after a failed write. If that fails too,
    /// the next line starts on a fresh line instead.
    fn discard_partial(&mut self, len: u64) {
        if let Err(e) = self.file.set_len(len) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "could not truncate partial line"
            );
            self.torn = true;
        }
    }
}

impl BatchSink for LogFile {
    fn append_line(&mut self, line: &str) -> io::Result<()> {
        // One write per line so a batch is never split across calls.
        self.buf.clear();
        if self.torn {
            self.buf.push('\n');
        }
        self.buf.push_str(line);
        self.buf.push('\n');

        let start = self.file.metadata()?.len();
        if let Err(e) = self.file.write_all(self.buf.as_bytes()) {
            self.discard_partial(start);
            return Err(e);
        }
        self.torn = false;
        if self.sync_every_batch {
            self.file.sync_data()?;
        }
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_all()
    }
}

/// Writer tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Extra coalescing delay after the first dirty wake.
    pub linger: Duration,
    /// Delay before retrying after a failed append.
    pub retry_backoff: Duration,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            linger: Duration::ZERO,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

/// What the writer did over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterReport {
    pub batches_written: u64,
    pub write_failures: u64,
    pub batches_lost: u64,
}

enum WriterState<S> {
    Idle,
    Draining(Batch<S>),
    ShuttingDown,
    Closed,
}

pub struct BatchWriter<S: MetricSet, K: BatchSink> {
    registry: Arc<Registry<S>>,
    sink: K,
    options: WriterOptions,
    report: WriterReport,
    final_retry_used: bool,
}

impl<S: MetricSet, K: BatchSink> BatchWriter<S, K> {
    pub fn new(registry: Arc<Registry<S>>, sink: K, options: WriterOptions) -> Self {
        Self {
            registry,
            sink,
            options,
            report: WriterReport::default(),
            final_retry_used: false,
        }
    }

    /// Run the writer on a dedicated thread.
    pub fn spawn(self) -> Result<JoinHandle<WriterReport>> {
        thread::Builder::new()
            .name("tally-writer".into())
            .spawn(move || self.run())
            .map_err(|e| TallyError::io("could not spawn batch writer", e))
    }

    /// Drive the writer until the registry is shut down and clean.
    pub fn run(mut self) -> WriterReport {
        tracing::info!(
            linger_ms = self.options.linger.as_millis() as u64,
            "batch writer started"
        );

        let mut state = WriterState::Idle;
        loop {
            state = match state {
                WriterState::Idle => match self.registry.next_batch(self.options.linger) {
                    Next::Batch(batch) => WriterState::Draining(batch),
                    Next::Shutdown => WriterState::ShuttingDown,
                },
                WriterState::Draining(batch) => {
                    self.append(batch);
                    WriterState::Idle
                }
                WriterState::ShuttingDown => {
                    self.close();
                    WriterState::Closed
                }
                WriterState::Closed => break,
            };
        }

        tracing::info!(
            written = self.report.batches_written,
            failures = self.report.write_failures,
            lost = self.report.batches_lost,
            "batch writer closed"
        );
        self.report
    }

    fn append(&mut self, batch: Batch<S>) {
        let line = render_line(Utc::now(), &batch);
        let err = match self.sink.append_line(&line) {
            Ok(()) => {
                self.report.batches_written += 1;
                tracing::debug!(entries = batch.len(), "batch appended");
                return;
            }
            Err(e) => e,
        };
        self.report.write_failures += 1;

        if !self.registry.is_shutdown() {
            let entries = batch.len();
            self.registry.restore(batch);
            tracing::error!(
                error = %err,
                entries,
                pending = self.registry.pending(),
                "batch write failed, retrying after backoff"
            );
            self.registry.wait_for_shutdown(self.options.retry_backoff);
            return;
        }

        if self.final_retry_used {
            self.report.batches_lost += 1;
            tracing::error!(error = %err, %line, "final batch write failed, batch dropped");
            return;
        }
        self.final_retry_used = true;
        tracing::error!(error = %err, entries = batch.len(), "final batch write failed, retrying once");
        self.registry.restore(batch);
    }

    fn close(&mut self) {
        if let Err(e) = self.sink.sync() {
            tracing::error!(error = %e, "log sync on close failed");
        }
    }
}

/// `<timestamp> UTC "<name>" <value> "<name>" <value> ...`
pub fn render_line<S: MetricSet>(at: DateTime<Utc>, batch: &Batch<S>) -> String {
    let mut line = format!("{} UTC", at.format(TIMESTAMP_FORMAT));
    for value in batch.values() {
        let _ = write!(line, " \"{}\" {}", value.name(), value.format_value());
    }
    line
}
