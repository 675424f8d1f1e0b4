//! Scheduled event records and their firing order.

use std::cmp::Ordering;
use std::fmt;

use crate::callback::Callback;

/// Position of an event in firing order.
///
/// Events fire by trigger tick first and by sequence second, so events due
/// on the same tick fire in the order they were scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKey {
    trigger_tick: i64,
    sequence: u64,
}

impl EventKey {
    /// Create a key.
    #[must_use]
    pub const fn new(trigger_tick: i64, sequence: u64) -> Self {
        Self {
            trigger_tick,
            sequence,
        }
    }

    /// Tick at or after which the event fires.
    #[must_use]
    pub const fn trigger_tick(&self) -> i64 {
        self.trigger_tick
    }

    /// Tie-breaker among events sharing a trigger tick.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.trigger_tick
            .cmp(&other.trigger_tick)
            .then(self.sequence.cmp(&other.sequence))
    }
}

/// A pending event. Never mutated once scheduled.
pub struct TimerEvent<C> {
    name: String,
    key: EventKey,
    callback: Box<dyn Callback<C>>,
}

impl<C> TimerEvent<C> {
    pub(crate) fn new(name: String, key: EventKey, callback: Box<dyn Callback<C>>) -> Self {
        Self {
            name,
            key,
            callback,
        }
    }

    /// Event name; unique per trigger tick.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tick at or after which the event fires.
    #[must_use]
    pub const fn trigger_tick(&self) -> i64 {
        self.key.trigger_tick
    }

    /// Scheduling sequence number.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.key.sequence
    }

    /// Position in firing order.
    #[must_use]
    pub const fn key(&self) -> EventKey {
        self.key
    }

    /// The stored action.
    #[must_use]
    pub fn callback(&self) -> &dyn Callback<C> {
        self.callback.as_ref()
    }

    pub(crate) fn into_parts(self) -> (String, Box<dyn Callback<C>>) {
        (self.name, self.callback)
    }
}

impl<C> fmt::Debug for TimerEvent<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEvent")
            .field("name", &self.name)
            .field("trigger_tick", &self.key.trigger_tick)
            .field("sequence", &self.key.sequence)
            .field("callback", &self.callback)
            .finish()
    }
}
