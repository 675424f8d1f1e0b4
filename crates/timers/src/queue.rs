//! The tick-driven timer queue.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tickq_core::{Error, Result, ResultExt};
use tracing::{debug, error, info, warn};

use crate::callback::Callback;
use crate::event::{EventKey, TimerEvent};
use crate::persistence::{RestoreReport, SkippedEntry, decode_entry, encode_entry};
use crate::registry::CallbackRegistry;

/// Configuration for a [`TimerQueue`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerQueueConfig {
    /// Log dropped duplicate schedules at warn instead of debug.
    pub warn_on_duplicate: bool,
    /// Stop a single `tick` call after this many firings. Remaining due
    /// events stay pending for the next call. `None` means unlimited.
    pub max_fires_per_tick: Option<usize>,
}

/// Pending events keyed by firing order, plus a name index.
///
/// `events` owns every pending [`TimerEvent`]. `names` maps each event name
/// to its trigger ticks and the sequence stored for that tick, which serves
/// both the `(name, tick)` duplicate check and cancellation by name. The two
/// maps always describe the same set of events; only this type mutates them.
pub struct TimerQueue<C> {
    registry: Arc<CallbackRegistry<C>>,
    config: TimerQueueConfig,
    events: BTreeMap<EventKey, TimerEvent<C>>,
    names: BTreeMap<String, BTreeMap<i64, u64>>,
    next_sequence: u64,
}

impl<C: 'static> TimerQueue<C> {
    /// Create an empty queue bound to `registry`.
    #[must_use]
    pub const fn new(registry: Arc<CallbackRegistry<C>>, config: TimerQueueConfig) -> Self {
        Self {
            registry,
            config,
            events: BTreeMap::new(),
            names: BTreeMap::new(),
            next_sequence: 0,
        }
    }

    /// Create a queue from persisted entries.
    ///
    /// Sequence numbers restart at zero, so events sharing a trigger tick
    /// fire in input order.
    pub fn restored<I>(
        registry: Arc<CallbackRegistry<C>>,
        config: TimerQueueConfig,
        records: I,
    ) -> (Self, RestoreReport)
    where
        I: IntoIterator,
        I::Item: Borrow<Value>,
    {
        let mut queue = Self::new(registry, config);
        let report = queue.restore_from(records);
        (queue, report)
    }

    /// Schedule `callback` to fire at or after `trigger_tick`.
    ///
    /// Returns `false` and leaves the queue untouched when an event with the
    /// same name and trigger tick is already pending; the first schedule wins.
    pub fn schedule(
        &mut self,
        name: impl Into<String>,
        trigger_tick: i64,
        callback: impl Callback<C>,
    ) -> bool {
        self.schedule_boxed(name, trigger_tick, Box::new(callback))
    }

    /// Same as [`schedule`](Self::schedule) for an already boxed callback.
    pub fn schedule_boxed(
        &mut self,
        name: impl Into<String>,
        trigger_tick: i64,
        callback: Box<dyn Callback<C>>,
    ) -> bool {
        let name = name.into();

        if self
            .names
            .get(&name)
            .is_some_and(|ticks| ticks.contains_key(&trigger_tick))
        {
            if self.config.warn_on_duplicate {
                warn!(event = %name, trigger_tick, "Event already scheduled for this tick, dropping");
            } else {
                debug!(event = %name, trigger_tick, "Event already scheduled for this tick, dropping");
            }
            return false;
        }

        let sequence = self.next_sequence;
        // Never wraps in practice: 2^64 schedules per queue.
        self.next_sequence = self.next_sequence.wrapping_add(1);
        let key = EventKey::new(trigger_tick, sequence);

        self.names
            .entry(name.clone())
            .or_default()
            .insert(trigger_tick, sequence);
        debug!(event = %name, trigger_tick, sequence, "Scheduled event");
        self.events.insert(key, TimerEvent::new(name, key, callback));
        true
    }

    /// Remove every pending event called `name`.
    ///
    /// Returns the number of events removed; unknown names remove nothing.
    pub fn cancel(&mut self, name: &str) -> usize {
        let Some(ticks) = self.names.remove(name) else {
            return 0;
        };

        let expected = ticks.len();
        let removed = ticks
            .into_iter()
            .filter(|&(tick, sequence)| self.events.remove(&EventKey::new(tick, sequence)).is_some())
            .count();

        debug_assert_eq!(removed, expected, "name index out of sync for '{name}'");
        debug!(event = %name, removed, "Cancelled events");
        removed
    }

    /// Fire every event due at `current_tick`.
    ///
    /// Events fire one at a time in firing order. Each is removed before its
    /// callback runs, so callbacks see a consistent queue and may schedule
    /// or cancel events; anything they schedule at or before `current_tick`
    /// fires within this same call.
    ///
    /// Returns the number of events fired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CallbackFailed`] from the first callback that fails.
    /// That event is already gone and is not retried; later due events stay
    /// pending for the next call.
    pub fn tick(&mut self, context: &mut C, current_tick: i64) -> Result<usize> {
        let mut fired = 0usize;

        loop {
            if self
                .config
                .max_fires_per_tick
                .is_some_and(|limit| fired >= limit)
            {
                if self.next_trigger_tick().is_some_and(|next| next <= current_tick) {
                    warn!(current_tick, fired, "Fire limit reached, deferring remaining due events");
                }
                break;
            }

            let Some(event) = self.pop_due(current_tick) else {
                break;
            };

            let trigger_tick = event.trigger_tick();
            let (name, callback) = event.into_parts();
            debug!(event = %name, trigger_tick, current_tick, "Firing event");

            callback
                .invoke(context, self, current_tick)
                .map_err(|e| Error::callback_failed(&name, current_tick, e))
                .inspect_error(|e| error!(event = %name, error = %e, "Event callback failed"))?;

            fired = fired.saturating_add(1);
        }

        Ok(fired)
    }

    /// Encode every pending event in firing order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnregisteredCallback`] if a pending callback's type
    /// is missing from the registry, or a codec error if it cannot be encoded.
    pub fn persist(&self) -> Result<Vec<Value>> {
        let codec = self.registry.codec();
        self.events
            .values()
            .map(|event| encode_entry(event, &codec))
            .collect()
    }

    /// Insert persisted entries into this queue.
    ///
    /// Entries that cannot be decoded are skipped with a warning and listed
    /// in the report; the rest are scheduled in input order, so when two
    /// entries share a name and trigger tick the earlier one wins.
    pub fn restore_from<I>(&mut self, records: I) -> RestoreReport
    where
        I: IntoIterator,
        I::Item: Borrow<Value>,
    {
        let registry = Arc::clone(&self.registry);
        let codec = registry.codec();
        let mut report = RestoreReport::default();

        for (index, raw) in records.into_iter().enumerate() {
            match decode_entry(raw.borrow(), &codec) {
                Ok(entry) => {
                    if self.schedule_boxed(entry.name, entry.trigger_tick, entry.callback) {
                        report.loaded = report.loaded.saturating_add(1);
                    } else {
                        report.duplicates = report.duplicates.saturating_add(1);
                    }
                }
                Err(error) => {
                    warn!(index, error = %error, "Skipping unreadable persisted event");
                    report.skipped.push(SkippedEntry { index, error });
                }
            }
        }

        info!(
            loaded = report.loaded,
            duplicates = report.duplicates,
            skipped = report.skipped.len(),
            "Restored timer queue"
        );
        report
    }

    /// Parse a JSON array of persisted entries and insert them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonParseFailed`] if `text` is not a JSON array.
    /// Individual bad entries are skipped, not reported as errors.
    pub fn restore_from_json(&mut self, text: &str) -> Result<RestoreReport> {
        let records: Vec<Value> =
            serde_json::from_str(text).map_err(|e| Error::json_parse_failed(e.to_string()))?;
        Ok(self.restore_from(records))
    }

    /// Pending events in firing order.
    pub fn events(&self) -> impl Iterator<Item = &TimerEvent<C>> {
        self.events.values()
    }

    /// Distinct names of pending events, sorted.
    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    /// Check whether any event called `name` is pending.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Trigger tick of the next event to fire.
    #[must_use]
    pub fn next_trigger_tick(&self) -> Option<i64> {
        self.events.keys().next().map(EventKey::trigger_tick)
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The registry this queue encodes and decodes with.
    #[must_use]
    pub const fn registry(&self) -> &Arc<CallbackRegistry<C>> {
        &self.registry
    }

    /// The queue's configuration.
    #[must_use]
    pub const fn config(&self) -> &TimerQueueConfig {
        &self.config
    }

    /// Verify that the event map and the name index describe the same events.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let indexed: usize = self.names.values().map(BTreeMap::len).sum();

        indexed == self.events.len()
            && self.names.iter().all(|(name, ticks)| {
                !ticks.is_empty()
                    && ticks.iter().all(|(&tick, &sequence)| {
                        self.events
                            .get(&EventKey::new(tick, sequence))
                            .is_some_and(|event| event.name() == name)
                    })
            })
            && self
                .events
                .iter()
                .all(|(key, event)| event.key() == *key && key.sequence() < self.next_sequence)
    }

    fn pop_due(&mut self, current_tick: i64) -> Option<TimerEvent<C>> {
        let next = *self.events.keys().next()?;
        if next.trigger_tick() > current_tick {
            return None;
        }

        let (key, event) = self.events.pop_first()?;
        let unindexed = self.names.get_mut(event.name()).map(|ticks| {
            let sequence = ticks.remove(&key.trigger_tick());
            (sequence, ticks.is_empty())
        });

        debug_assert!(
            matches!(unindexed, Some((Some(sequence), _)) if sequence == key.sequence()),
            "name index out of sync for '{}'",
            event.name()
        );
        if matches!(unindexed, Some((_, true))) {
            self.names.remove(event.name());
        }

        Some(event)
    }
}

impl<C: 'static> fmt::Debug for TimerQueue<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("config", &self.config)
            .field("pending", &self.events.len())
            .field("next_trigger_tick", &self.next_trigger_tick())
            .field("next_sequence", &self.next_sequence)
            .finish_non_exhaustive()
    }
}
