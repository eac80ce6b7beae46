//! Metric primitives.
//!
//! A metric kind is a value with an identity element and an associative
//! `combine`. Kinds are grouped into a closed, ordered set with
//! [`metric_set!`](crate::metric_set); the position of a kind in that set is
//! its slot index, which fixes both lookup and rendering order.

mod kinds;

pub use kinds::{Counter, Product, RunningAverage, NO_DATA};

use crate::error::{Result, TallyError};

/// A combinable metric value.
///
/// `combine` must be associative with `identity()` as neutral element, and
/// must not depend on application order for correctness: concurrent updates
/// are folded in whatever order producers win the lock.
pub trait Metric: Sized + Send + 'static {
    /// Display name written in front of every rendered value.
    const NAME: &'static str;

    /// Neutral element for `combine`.
    fn identity() -> Self;

    /// Fold `update` into `self`, returning the new aggregate.
    fn combine(&self, update: &Self) -> Self;

    /// Render the aggregate for the log line.
    fn format_value(&self) -> String;
}

/// A closed, ordered set of metric kinds.
///
/// Implemented by enums generated with [`metric_set!`](crate::metric_set).
/// Every value carries its kind, so slot lookup is a match on the
/// discriminant rather than a type inspection.
pub trait MetricSet: Sized + Send + 'static {
    /// Display names in slot order.
    const NAMES: &'static [&'static str];

    /// Slot index of this value's kind.
    fn slot(&self) -> usize;

    /// Identity value for the kind stored at `slot`.
    fn identity(slot: usize) -> Option<Self>;

    /// Combine `update` into `self`. Returns `false` (leaving `self`
    /// untouched) when `update` belongs to a different slot.
    fn merge(&mut self, update: Self) -> bool;

    /// Display name of this value's kind.
    fn name(&self) -> &'static str;

    /// Rendered aggregate.
    fn format_value(&self) -> String;

    /// Number of slots.
    fn len() -> usize {
        Self::NAMES.len()
    }

    /// Reject sets where two kinds share a display name; their lines would be
    /// indistinguishable in the log.
    fn validate() -> Result<()> {
        for (i, name) in Self::NAMES.iter().enumerate() {
            if Self::NAMES[..i].contains(name) {
                return Err(TallyError::DuplicateKind(name));
            }
        }
        Ok(())
    }
}

/// Declare a [`MetricSet`] enum over an ordered list of [`Metric`] kinds.
///
/// ```
/// use tally_core::{metric_set, Counter, Product};
///
/// metric_set! {
///     pub enum ServerMetrics {
///         Requests(Counter),
///         Scale(Product),
///     }
/// }
///
/// let m: ServerMetrics = Counter::new(1).into();
/// assert_eq!(tally_core::MetricSet::slot(&m), 0);
/// ```
///
/// A `From<Kind>` impl is generated per variant, so listing a kind twice
/// fails to compile.
#[macro_export]
macro_rules! metric_set {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident($kind:ty)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $($variant($kind)),+
        }

        impl $crate::metric::MetricSet for $name {
            const NAMES: &'static [&'static str] =
                &[$(<$kind as $crate::metric::Metric>::NAME),+];

            fn slot(&self) -> usize {
                #[allow(dead_code)]
                enum Slot { $($variant),+ }
                match self {
                    $($name::$variant(_) => Slot::$variant as usize),+
                }
            }

            fn identity(slot: usize) -> ::std::option::Option<Self> {
                #[allow(dead_code)]
                enum Slot { $($variant),+ }
                $(
                    if slot == Slot::$variant as usize {
                        return ::std::option::Option::Some($name::$variant(
                            <$kind as $crate::metric::Metric>::identity(),
                        ));
                    }
                )+
                ::std::option::Option::None
            }

            fn merge(&mut self, update: Self) -> bool {
                match (self, update) {
                    $(
                        ($name::$variant(current), $name::$variant(update)) => {
                            *current = <$kind as $crate::metric::Metric>::combine(current, &update);
                            true
                        }
                    )+
                    #[allow(unreachable_patterns)]
                    _ => false,
                }
            }

            fn name(&self) -> &'static str {
                match self {
                    $($name::$variant(_) => <$kind as $crate::metric::Metric>::NAME),+
                }
            }

            fn format_value(&self) -> ::std::string::String {
                match self {
                    $($name::$variant(m) => <$kind as $crate::metric::Metric>::format_value(m)),+
                }
            }
        }

        $(
            impl ::std::convert::From<$kind> for $name {
                fn from(m: $kind) -> Self {
                    $name::$variant(m)
                }
            }
        )+
    };
}
