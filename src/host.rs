//! The simulation host and the callback variants it knows how to run.
//!
//! Two variants are registered:
//!
//! - `function`: run one function from the config's function table
//! - `function_tag`: run every function listed under a tag
//!
//! Both resolve their target when they fire, so a function removed from
//! the config between runs is reported and skipped rather than failing.
//!
//! A repeating function re-schedules itself under the name of the event
//! that fired it, so cancelling that name stops the repeats. Members of a
//! tag repeat as `<tag event>/<member>`.

use std::any::Any;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tickq_core::{Error, Result};
use tickq_timers::{Callback, CallbackRegistry, TimerQueue};
use tracing::{info, warn};

use crate::config::{FunctionDef, HostConfig};

/// Registry tag of [`RunFunction`].
pub const FUNCTION_TYPE: &str = "function";
/// Registry tag of [`RunFunctionTag`].
pub const FUNCTION_TAG_TYPE: &str = "function_tag";

/// One line produced by a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub tick: i64,
    pub function: String,
    pub text: String,
}

/// Context handed to every callback.
#[derive(Debug, Default)]
pub struct Host {
    functions: BTreeMap<String, FunctionDef>,
    tags: BTreeMap<String, Vec<String>>,
    output: Vec<OutputLine>,
}

impl Host {
    /// Create a host over the configured function table.
    #[must_use]
    pub fn from_config(config: &HostConfig) -> Self {
        Self {
            functions: config.functions.clone(),
            tags: config.tags.clone(),
            output: Vec::new(),
        }
    }

    /// Lines produced so far.
    #[must_use]
    pub fn output(&self) -> &[OutputLine] {
        &self.output
    }

    /// Run `name`, re-scheduling it under `event` if it repeats.
    ///
    /// Returns `false` if no such function exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigInvalid`] if the next repeat would overflow the
    /// tick range.
    pub fn run_function(
        &mut self,
        queue: &mut TimerQueue<Self>,
        name: &str,
        event: &str,
        current_tick: i64,
    ) -> Result<bool> {
        let Some(def) = self.functions.get(name) else {
            warn!(function = %name, current_tick, "Couldn't find function, skipping");
            return Ok(false);
        };

        for text in &def.output {
            info!(function = %name, current_tick, "{text}");
            self.output.push(OutputLine {
                tick: current_tick,
                function: name.to_string(),
                text: text.clone(),
            });
        }

        if let Some(every) = def.repeat_every {
            let next = current_tick.checked_add(every).ok_or_else(|| {
                Error::config_invalid(format!("function '{name}' repeats past the last tick"))
            })?;
            queue.schedule(event, next, RunFunction::for_event(name, event));
        }

        Ok(true)
    }

    /// Run every member of `tag` in listed order.
    ///
    /// Repeating members re-schedule under `<event>/<member>`.
    /// Returns `false` if no such tag exists.
    ///
    /// # Errors
    ///
    /// Propagates the first member's error.
    pub fn run_tag(
        &mut self,
        queue: &mut TimerQueue<Self>,
        tag: &str,
        event: &str,
        current_tick: i64,
    ) -> Result<bool> {
        let Some(members) = self.tags.get(tag).cloned() else {
            warn!(tag = %tag, current_tick, "Couldn't find function tag, skipping");
            return Ok(false);
        };

        for member in &members {
            self.run_function(queue, member, &member_event(event, member), current_tick)?;
        }
        Ok(true)
    }
}

/// Event name a tag member repeats under.
#[must_use]
pub fn member_event(event: &str, member: &str) -> String {
    format!("{event}/{member}")
}

/// Runs one function from the host's table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFunction {
    #[serde(rename = "Name")]
    pub function: String,

    /// Event name repeats are scheduled under, when it is not the function.
    #[serde(rename = "Event", default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

impl RunFunction {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            event: None,
        }
    }

    /// A callback for `function` scheduled under the event name `event`.
    pub fn for_event(function: impl Into<String>, event: impl Into<String>) -> Self {
        let function = function.into();
        let event = event.into();
        let event = (event != function).then_some(event);
        Self { function, event }
    }

    /// Name of the event this callback belongs to.
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.event.as_deref().unwrap_or(&self.function)
    }
}

impl Callback<Host> for RunFunction {
    fn invoke(&self, host: &mut Host, queue: &mut TimerQueue<Host>, current_tick: i64) -> Result<()> {
        host.run_function(queue, &self.function, self.event_name(), current_tick)
            .map(|_| ())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Runs every function listed under a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFunctionTag {
    #[serde(rename = "Name")]
    pub tag: String,

    /// Event name member repeats are grouped under, when it is not `#tag`.
    #[serde(rename = "Event", default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

impl RunFunctionTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            event: None,
        }
    }

    /// A callback for `tag` scheduled under the event name `event`.
    pub fn for_event(tag: impl Into<String>, event: impl Into<String>) -> Self {
        let tag = tag.into();
        let event = event.into();
        let event = (event != default_tag_event(&tag)).then_some(event);
        Self { tag, event }
    }

    /// Name of the event this callback belongs to.
    #[must_use]
    pub fn event_name(&self) -> String {
        self.event
            .clone()
            .unwrap_or_else(|| default_tag_event(&self.tag))
    }
}

/// Event name used for a tag when none is given.
#[must_use]
pub fn default_tag_event(tag: &str) -> String {
    format!("#{tag}")
}

impl Callback<Host> for RunFunctionTag {
    fn invoke(&self, host: &mut Host, queue: &mut TimerQueue<Host>, current_tick: i64) -> Result<()> {
        host.run_tag(queue, &self.tag, &self.event_name(), current_tick)
            .map(|_| ())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Registry of the host's callback variants.
///
/// # Errors
///
/// Fails only if two variants claim the same tag.
pub fn registry() -> Result<CallbackRegistry<Host>> {
    Ok(CallbackRegistry::builder()
        .register_serde::<RunFunction>(FUNCTION_TYPE)?
        .register_serde::<RunFunctionTag>(FUNCTION_TAG_TYPE)?
        .build())
}
