//! tally logger: asynchronous batching metrics logger.
//!
//! Producers fold typed updates into a [`Registry`]; a single
//! [`BatchWriter`] thread drains dirty slots into one timestamped line per
//! cycle. [`Logger`] wires the two together and owns the shutdown handshake.

pub mod config;
pub mod logger;
pub mod registry;
pub mod writer;

pub use logger::Logger;
pub use registry::{Batch, Registry};
pub use writer::{BatchSink, BatchWriter, LogFile, WriterOptions, WriterReport};
