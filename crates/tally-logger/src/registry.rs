//! Shared aggregate state between producers and the batch writer.
//!
//! One slot per kind of the metric set, all behind a single mutex. Producers
//! fold updates into slots and mark them dirty; the writer blocks on the
//! condvar until something is dirty or shutdown is raised, then drains every
//! dirty slot in one critical section.

use std::collections::BTreeSet;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tally_core::error::{Result, TallyError};
use tally_core::MetricSet;

struct State<S> {
    slots: Vec<S>,
    dirty: BTreeSet<usize>,
    shutdown: bool,
}

/// Dirty slots taken out of the registry, in ascending slot order.
#[derive(Debug)]
pub struct Batch<S> {
    values: Vec<S>,
}

impl<S: MetricSet> Batch<S> {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[S] {
        &self.values
    }

    /// `(name, rendered value)` pairs in slot order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        self.values
            .iter()
            .map(|v| (v.name(), v.format_value()))
            .collect()
    }
}

/// What the writer should do next.
pub(crate) enum Next<S> {
    Batch(Batch<S>),
    Shutdown,
}

pub struct Registry<S: MetricSet> {
    state: Mutex<State<S>>,
    wake: Condvar,
}

impl<S: MetricSet> Registry<S> {
    /// Allocate one identity slot per kind.
    ///
    /// Fails with a config error when two kinds share a display name.
    pub fn new() -> Result<Self> {
        S::validate()?;
        let slots = (0..S::len())
            .map(S::identity)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| TallyError::Config("metric set has a slot without identity".into()))?;

        Ok(Self {
            state: Mutex::new(State {
                slots,
                dirty: BTreeSet::new(),
                shutdown: false,
            }),
            wake: Condvar::new(),
        })
    }

    /// Fold `update` into its slot and wake the writer.
    ///
    /// Returns `false` when the update was dropped because shutdown already
    /// began.
    pub fn log(&self, update: impl Into<S>) -> bool {
        let update = update.into();
        let slot = update.slot();

        let mut state = self.state.lock();
        if state.shutdown {
            tracing::trace!(metric = update.name(), "update after shutdown dropped");
            return false;
        }
        let Some(current) = state.slots.get_mut(slot) else {
            return false;
        };
        if !current.merge(update) {
            return false;
        }
        state.dirty.insert(slot);
        drop(state);

        self.wake.notify_one();
        true
    }

    /// Snapshot and reset every dirty slot.
    pub fn drain(&self) -> Batch<S> {
        let mut state = self.state.lock();
        Self::take_dirty(&mut state)
    }

    /// Put back a batch that could not be written. Values are folded into
    /// whatever accumulated since the drain.
    pub fn restore(&self, batch: Batch<S>) {
        let mut state = self.state.lock();
        for value in batch.values {
            let slot = value.slot();
            if let Some(current) = state.slots.get_mut(slot) {
                if current.merge(value) {
                    state.dirty.insert(slot);
                }
            }
        }
    }

    /// Raise the shutdown flag and wake the writer. Idempotent.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        if state.shutdown {
            return;
        }
        state.shutdown = true;
        drop(state);
        self.wake.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Number of dirty slots.
    pub fn pending(&self) -> usize {
        self.state.lock().dirty.len()
    }

    /// Block until a slot is dirty or shutdown is raised.
    ///
    /// With a non-zero `linger`, a wake caused by dirty slots waits that much
    /// longer (cut short by shutdown) so more updates land in the same batch.
    pub(crate) fn next_batch(&self, linger: Duration) -> Next<S> {
        let mut state = self.state.lock();
        self.wake
            .wait_while(&mut state, |s| s.dirty.is_empty() && !s.shutdown);

        if state.dirty.is_empty() {
            return Next::Shutdown;
        }
        if !linger.is_zero() && !state.shutdown {
            self.wake.wait_while_for(&mut state, |s| !s.shutdown, linger);
        }
        Next::Batch(Self::take_dirty(&mut state))
    }

    /// Sleep up to `timeout`, returning early once shutdown is raised.
    pub(crate) fn wait_for_shutdown(&self, timeout: Duration) {
        let mut state = self.state.lock();
        self.wake.wait_while_for(&mut state, |s| !s.shutdown, timeout);
    }

    fn take_dirty(state: &mut State<S>) -> Batch<S> {
        let dirty = std::mem::take(&mut state.dirty);
        let mut values = Vec::with_capacity(dirty.len());
        for slot in dirty {
            let (Some(current), Some(identity)) = (state.slots.get_mut(slot), S::identity(slot)) else {
                continue;
            };
            values.push(std::mem::replace(current, identity));
        }
        Batch { values }
    }
}
