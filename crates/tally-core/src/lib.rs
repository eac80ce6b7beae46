//! tally core: metric primitives, metric sets, and the shared error surface.
//!
//! This crate defines what a metric is (identity, combine, rendering) and how
//! a fixed, ordered list of metric kinds is declared. It carries no I/O or
//! threading so the aggregation rules can be tested on their own.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `TallyError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metric;

/// Shared result type.
pub use error::{ErrorKind, Result, TallyError};
pub use metric::{Counter, Metric, MetricSet, Product, RunningAverage};
