//! Shared fixtures for timer queue integration tests.

#![allow(dead_code)]

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tickq_timers::{Callback, CallbackRegistry, Result, TimerQueue, TimerQueueConfig};

/// Host context recording every firing.
#[derive(Debug, Default)]
pub struct Recorder {
    pub fired: Vec<Fired>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired {
    pub label: String,
    pub tick: i64,
}

impl Recorder {
    pub fn labels(&self) -> Vec<&str> {
        self.fired.iter().map(|f| f.label.as_str()).collect()
    }
}

/// Records its label when fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "Label")]
    pub label: String,
}

pub fn record(label: &str) -> Record {
    Record {
        label: label.to_string(),
    }
}

impl Callback<Recorder> for Record {
    fn invoke(&self, recorder: &mut Recorder, _: &mut TimerQueue<Recorder>, tick: i64) -> Result<()> {
        recorder.fired.push(Fired {
            label: self.label.clone(),
            tick,
        });
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Records its label, then schedules a `Record` under `next_name`
/// `delay` ticks later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    #[serde(rename = "Label")]
    pub label: String,
    #[serde(rename = "NextName")]
    pub next_name: String,
    #[serde(rename = "NextLabel")]
    pub next_label: String,
    #[serde(rename = "Delay")]
    pub delay: i64,
}

impl Callback<Recorder> for Chain {
    fn invoke(&self, recorder: &mut Recorder, queue: &mut TimerQueue<Recorder>, tick: i64) -> Result<()> {
        recorder.fired.push(Fired {
            label: self.label.clone(),
            tick,
        });
        let at = tick.saturating_add(self.delay);
        queue.schedule(self.next_name.clone(), at, record(&self.next_label));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Cancels every event called `target` when fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOther {
    #[serde(rename = "Target")]
    pub target: String,
}

impl Callback<Recorder> for CancelOther {
    fn invoke(&self, _: &mut Recorder, queue: &mut TimerQueue<Recorder>, _: i64) -> Result<()> {
        queue.cancel(&self.target);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn registry() -> Arc<CallbackRegistry<Recorder>> {
    let registry = CallbackRegistry::builder()
        .register_serde::<Record>("record")
        .and_then(|b| b.register_serde::<Chain>("chain"))
        .and_then(|b| b.register_serde::<CancelOther>("cancel_other"));

    match registry {
        Ok(builder) => Arc::new(builder.build()),
        Err(e) => panic!("fixture registry must build: {e}"),
    }
}

pub fn queue() -> TimerQueue<Recorder> {
    TimerQueue::new(registry(), TimerQueueConfig::default())
}

/// Route engine logs to the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
