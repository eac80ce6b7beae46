//! Built-in metric kinds.

use super::Metric;

/// Rendered in place of an average that has no observations.
pub const NO_DATA: &str = "n/a";

/// Running integer sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter(i64);

impl Counter {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl Metric for Counter {
    const NAME: &'static str = "counter";

    fn identity() -> Self {
        Self(0)
    }

    // Wrapping keeps the fold total and associative at the i64 boundary.
    fn combine(&self, update: &Self) -> Self {
        Self(self.0.wrapping_add(update.0))
    }

    fn format_value(&self) -> String {
        self.0.to_string()
    }
}

/// Running floating-point product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Product(f64);

impl Product {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Metric for Product {
    const NAME: &'static str = "product";

    fn identity() -> Self {
        Self(1.0)
    }

    fn combine(&self, update: &Self) -> Self {
        Self(self.0 * update.0)
    }

    fn format_value(&self) -> String {
        format!("{:.6}", self.0)
    }
}

/// Mean of integer observations, kept as `(sum, count)` so partial
/// aggregates combine exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunningAverage {
    sum: i64,
    count: i64,
}

impl RunningAverage {
    /// Pre-aggregated update: `count` observations summing to `sum`.
    pub fn new(sum: i64, count: i64) -> Self {
        Self { sum, count }
    }

    /// A single observation.
    pub fn observe(value: i64) -> Self {
        Self::new(value, 1)
    }

    pub fn sum(self) -> i64 {
        self.sum
    }

    pub fn count(self) -> i64 {
        self.count
    }

    /// `None` when there are no observations.
    pub fn mean(self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum as f64 / self.count as f64)
    }
}

impl Metric for RunningAverage {
    const NAME: &'static str = "average";

    fn identity() -> Self {
        Self { sum: 0, count: 0 }
    }

    fn combine(&self, update: &Self) -> Self {
        Self {
            sum: self.sum.wrapping_add(update.sum),
            count: self.count.wrapping_add(update.count),
        }
    }

    fn format_value(&self) -> String {
        match self.mean() {
            Some(mean) => format!("{mean:.6}"),
            None => NO_DATA.to_string(),
        }
    }
}
