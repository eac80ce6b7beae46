//! Top-level facade crate for tally.
//!
//! Re-exports core types and the logger library so users can depend on a single crate.

pub use tally_core::metric_set;

pub mod core {
    pub use tally_core::*;
}

pub mod logger {
    pub use tally_logger::*;
}
