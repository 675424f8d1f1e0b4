//! # tickq-timers
//!
//! Deterministic, tick-driven deferred callbacks.
//!
//! A [`TimerQueue`] holds named events that fire at or after a trigger tick.
//! Each call to [`TimerQueue::tick`] fires every due event exactly once,
//! ordered by trigger tick and then by scheduling order. Callbacks are open
//! ended: any type implementing [`Callback`] can be stored, and registering
//! it with a [`CallbackRegistry`] makes it persistable under a string tag.
//!
//! # Key Types
//!
//! - [`Callback`]: the action capability (`invoke` + identity for the codec)
//! - [`CallbackRegistry`]: tag-to-schema map, built once and shared
//! - [`TimerEvent`]: an immutable pending event
//! - [`TimerQueue`]: schedule / cancel / tick / persist / restore
//!
//! # Example
//!
//! ```ignore
//! let registry = Arc::new(
//!     CallbackRegistry::builder()
//!         .register_serde::<RunFunction>("function")?
//!         .build(),
//! );
//! let mut queue = TimerQueue::new(registry, TimerQueueConfig::default());
//! queue.schedule("daily", 24_000, RunFunction::new("reset"));
//! queue.tick(&mut host, 24_000)?;
//! let saved = queue.persist()?;
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod callback;
pub mod event;
pub mod persistence;
pub mod queue;
pub mod registry;

pub use callback::Callback;
pub use event::{EventKey, TimerEvent};
pub use persistence::{RestoreReport, SkippedEntry};
pub use queue::{TimerQueue, TimerQueueConfig};
pub use registry::{CallbackCodec, CallbackRegistry, CallbackRegistryBuilder, CallbackSchema, SerdeSchema, TYPE_FIELD};
pub use tickq_core::{Error, Result};
