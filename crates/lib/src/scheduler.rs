//! Timer queue for debounced work.
//!
//! The engine is single-threaded and never sleeps. Debounced emissions are
//! recorded here with a due time, and the host fires them by calling
//! [`Form::run_pending_timers`](crate::form::Form::run_pending_timers) once the
//! form's clock has moved past that time. Scheduling a timer whose key is
//! already pending supersedes the pending one.

use serde_json::Value;

use crate::field::FieldId;

/// What a timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TimerKey {
    /// Deliver a debounced value for one field subscription.
    FieldDebounce(FieldId),
    /// Sample the model once and emit a model change.
    ModelChange,
}

#[derive(Debug, Clone)]
pub(crate) struct Timer {
    pub(crate) key: TimerKey,
    pub(crate) due: u64,
    seq: u64,
    pub(crate) payload: Option<Value>,
}

#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    timers: Vec<Timer>,
    seq: u64,
}

impl Scheduler {
    /// Schedules `key` at `due`, replacing a pending timer with the same key.
    pub(crate) fn schedule(&mut self, key: TimerKey, due: u64, payload: Option<Value>) {
        self.cancel(key);
        self.seq += 1;
        self.timers.push(Timer {
            key,
            due,
            seq: self.seq,
            payload,
        });
    }

    pub(crate) fn cancel(&mut self, key: TimerKey) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.key != key);
        before != self.timers.len()
    }

    pub(crate) fn is_pending(&self, key: TimerKey) -> bool {
        self.timers.iter().any(|t| t.key == key)
    }

    pub(crate) fn clear(&mut self) {
        self.timers.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.timers.len()
    }

    /// Earliest due time among pending timers.
    pub(crate) fn next_due(&self) -> Option<u64> {
        self.timers.iter().map(|t| t.due).min()
    }

    /// Removes and returns the earliest timer due at or before `now`.
    ///
    /// Ties are broken by scheduling order.
    pub(crate) fn pop_due(&mut self, now: u64) -> Option<Timer> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by_key(|(_, t)| (t.due, t.seq))
            .map(|(i, _)| i)?;
        Some(self.timers.remove(index))
    }
}
