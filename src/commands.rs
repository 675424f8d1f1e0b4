//! CLI command handlers.
//!
//! Every command loads the save file, acts on the queue, and writes the
//! pending set back before returning.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tickq_timers::{CallbackRegistry, RestoreReport, TimerQueue};
use tracing::{info, warn};

use crate::cli::Commands;
use crate::config::HostConfig;
use crate::host::{Host, RunFunction, RunFunctionTag, default_tag_event};
use crate::save;

/// Everything a command needs besides its arguments.
#[derive(Debug)]
pub struct Session {
    pub config: HostConfig,
    pub save_path: PathBuf,
    pub registry: Arc<CallbackRegistry<Host>>,
}

impl Session {
    fn load_queue(&self) -> Result<TimerQueue<Host>> {
        let mut queue = TimerQueue::new(Arc::clone(&self.registry), self.config.queue.clone());
        let report = save::load(&mut queue, &self.save_path)
            .with_context(|| format!("Failed to load {}", self.save_path.display()))?;
        if let Some(skipped) = unreadable_entries(&report) {
            warn!(
                skipped,
                path = %self.save_path.display(),
                "Ignoring saved events that could not be read"
            );
        }
        Ok(queue)
    }

    fn store_queue(&self, queue: &TimerQueue<Host>) -> Result<()> {
        save::store(queue, &self.save_path)
            .with_context(|| format!("Failed to save {}", self.save_path.display()))
    }
}

/// Number of saved entries that could not be read, if any.
fn unreadable_entries(report: &RestoreReport) -> Option<usize> {
    (!report.skipped.is_empty()).then_some(report.skipped.len())
}

/// The tick to simulate after `tick`.
///
/// Skips ahead to the next pending event when nothing is due sooner.
fn next_tick(queue: &TimerQueue<Host>, tick: i64, end: i64) -> i64 {
    let following = tick.saturating_add(1);
    queue
        .next_trigger_tick()
        .map_or(end, |due| due.max(following))
        .min(end)
}

/// Execute a CLI command.
///
/// This is the main command dispatcher that routes to the appropriate handler.
pub fn execute_command(command: Commands, session: &Session) -> Result<()> {
    match command {
        Commands::Run { from, ticks } => cmd_run(session, from, ticks),

        Commands::Schedule {
            function,
            tag,
            at,
            name,
        } => cmd_schedule(session, function, tag, at, name),

        Commands::Cancel { name } => cmd_cancel(session, &name),

        Commands::List => cmd_list(session),
    }
}

/// Advance the clock from `from` for `ticks` ticks.
///
/// Ticks with nothing due are skipped. The pending set is saved even when a
/// callback fails.
fn cmd_run(session: &Session, from: Option<i64>, ticks: Option<u64>) -> Result<()> {
    let start = from.unwrap_or(session.config.start_tick);
    let count = ticks.unwrap_or(session.config.ticks);
    let end = i64::try_from(count)
        .ok()
        .and_then(|count| start.checked_add(count))
        .ok_or_else(|| anyhow!("{count} ticks from {start} overflows the tick range"))?;

    let mut queue = session.load_queue()?;
    let mut host = Host::from_config(&session.config);
    info!(start, end, pending = queue.len(), "Running");

    let mut fired = 0usize;
    let mut outcome = Ok(());
    let mut tick = queue.next_trigger_tick().map_or(end, |due| due.clamp(start, end));
    while tick < end {
        match queue.tick(&mut host, tick) {
            Ok(count) => fired = fired.saturating_add(count),
            Err(e) => {
                outcome = Err(e).with_context(|| format!("Run stopped at tick {tick}"));
                break;
            }
        }
        tick = next_tick(&queue, tick, end);
    }

    for line in host.output() {
        println!("[{:>6}] {}: {}", line.tick, line.function, line.text);
    }
    println!("Fired {fired} event(s), {} pending", queue.len());

    session.store_queue(&queue)?;
    outcome
}

/// Schedule a function or tag.
fn cmd_schedule(
    session: &Session,
    function: Option<String>,
    tag: Option<String>,
    at: i64,
    name: Option<String>,
) -> Result<()> {
    let mut queue = session.load_queue()?;

    let (name, scheduled) = match (function, tag) {
        (Some(function), None) => {
            if !session.config.functions.contains_key(&function) {
                warn!(function = %function, "Function is not configured yet");
            }
            let name = name.unwrap_or_else(|| function.clone());
            let callback = RunFunction::for_event(function, name.as_str());
            let scheduled = queue.schedule(name.clone(), at, callback);
            (name, scheduled)
        }
        (None, Some(tag)) => {
            if !session.config.tags.contains_key(&tag) {
                warn!(tag = %tag, "Function tag is not configured yet");
            }
            let name = name.unwrap_or_else(|| default_tag_event(&tag));
            let callback = RunFunctionTag::for_event(tag, name.as_str());
            let scheduled = queue.schedule(name.clone(), at, callback);
            (name, scheduled)
        }
        _ => return Err(anyhow!("Exactly one of --function or --tag is required")),
    };

    if scheduled {
        println!("Scheduled '{name}' at tick {at}");
    } else {
        println!("'{name}' is already scheduled at tick {at}");
    }

    session.store_queue(&queue)
}

/// Cancel every pending event called `name`, plus the repeats of tag
/// members it started (`name/<member>`).
fn cmd_cancel(session: &Session, name: &str) -> Result<()> {
    let mut queue = session.load_queue()?;
    let prefix = format!("{name}/");
    let members: Vec<String> = queue
        .event_names()
        .filter(|event| event.starts_with(&prefix))
        .map(String::from)
        .collect();

    let removed = members
        .iter()
        .fold(queue.cancel(name), |removed, member| {
            removed.saturating_add(queue.cancel(member))
        });
    println!("Cancelled {removed} event(s) named '{name}'");
    session.store_queue(&queue)
}

/// Print pending events in firing order.
fn cmd_list(session: &Session) -> Result<()> {
    let queue = session.load_queue()?;

    if queue.is_empty() {
        println!("No pending events");
        return Ok(());
    }

    for event in queue.events() {
        let kind = session
            .registry
            .tag_of(event.callback())
            .unwrap_or("<unregistered>");
        println!(
            "{:>8}  {:<24} {:<14} {:?}",
            event.trigger_tick(),
            event.name(),
            kind,
            event.callback()
        );
    }
    println!(
        "{} pending: {}",
        queue.len(),
        itertools::join(queue.event_names(), ", ")
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::indexing_slicing)]

    use serde_json::Value;

    use super::*;
    use crate::config::FunctionDef;
    use crate::host::registry;

    fn session(dir: &tempfile::TempDir) -> Session {
        let mut config = HostConfig::default();
        config.functions.insert(
            "heartbeat".into(),
            FunctionDef {
                output: vec!["beat".into()],
                repeat_every: Some(4),
            },
        );
        Session {
            config,
            save_path: dir.path().join("save.json"),
            registry: Arc::new(registry().unwrap()),
        }
    }

    fn saved(session: &Session) -> Vec<Value> {
        let text = std::fs::read_to_string(&session.save_path).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_schedule_writes_save_file() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(&dir);

        cmd_schedule(&session, Some("heartbeat".into()), None, 2, None).unwrap();

        let entries = saved(&session);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["Name"], "heartbeat");
        assert_eq!(entries[0]["TriggerTime"], 2);
        assert_eq!(entries[0]["Callback"]["Type"], "function");
    }

    #[test]
    fn test_tag_schedule_uses_hash_name() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(&dir);

        cmd_schedule(&session, None, Some("daily".into()), 7, None).unwrap();

        let entries = saved(&session);
        assert_eq!(entries[0]["Name"], "#daily");
        assert_eq!(entries[0]["Callback"]["Type"], "function_tag");
    }

    #[test]
    fn test_run_advances_and_saves_repeats() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(&dir);
        cmd_schedule(&session, Some("heartbeat".into()), None, 0, None).unwrap();

        cmd_run(&session, Some(0), Some(5)).unwrap();

        let entries = saved(&session);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["TriggerTime"], 8);
    }

    #[test]
    fn test_cancel_removes_from_save() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(&dir);
        cmd_schedule(&session, Some("heartbeat".into()), None, 3, None).unwrap();
        cmd_schedule(&session, Some("heartbeat".into()), None, 9, None).unwrap();

        cmd_cancel(&session, "heartbeat").unwrap();

        assert!(saved(&session).is_empty());
    }

    #[test]
    fn test_cancel_stops_custom_named_repeat_after_it_fired() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(&dir);
        cmd_schedule(&session, Some("heartbeat".into()), None, 0, Some("custom".into())).unwrap();

        cmd_run(&session, Some(0), Some(2)).unwrap();
        let entries = saved(&session);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["Name"], "custom");
        assert_eq!(entries[0]["TriggerTime"], 4);

        cmd_cancel(&session, "custom").unwrap();
        assert!(saved(&session).is_empty());
    }

    #[test]
    fn test_cancel_tag_event_stops_member_repeats() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);
        session
            .config
            .tags
            .insert("daily".into(), vec!["heartbeat".into()]);
        cmd_schedule(&session, None, Some("daily".into()), 1, None).unwrap();

        cmd_run(&session, Some(0), Some(3)).unwrap();
        assert_eq!(saved(&session)[0]["Name"], "#daily/heartbeat");

        cmd_cancel(&session, "#daily").unwrap();
        assert!(saved(&session).is_empty());
    }

    #[test]
    fn test_duplicates_alone_are_not_reported_as_unreadable() {
        let report = RestoreReport {
            loaded: 1,
            duplicates: 2,
            skipped: Vec::new(),
        };
        assert_eq!(unreadable_entries(&report), None);

        let report = RestoreReport {
            skipped: vec![tickq_timers::SkippedEntry {
                index: 0,
                error: tickq_core::Error::missing_field("Name"),
            }],
            ..report
        };
        assert_eq!(unreadable_entries(&report), Some(1));
    }

    #[test]
    fn test_run_skips_ticks_with_nothing_due() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);
        session.config.functions.insert(
            "once".into(),
            FunctionDef {
                output: vec!["late".into()],
                repeat_every: None,
            },
        );
        let far = 3_000_000_000_000_i64;
        cmd_schedule(&session, Some("once".into()), None, far, None).unwrap();

        cmd_run(&session, Some(0), Some(4_000_000_000_000)).unwrap();

        assert!(saved(&session).is_empty());
    }

    #[test]
    fn test_next_tick_jumps_to_next_due_event() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(&dir);
        let mut queue = TimerQueue::new(Arc::clone(&session.registry), Default::default());

        assert_eq!(next_tick(&queue, 0, 100), 100);
        queue.schedule("heartbeat", 40, RunFunction::new("heartbeat"));
        assert_eq!(next_tick(&queue, 0, 100), 40);
        assert_eq!(next_tick(&queue, 0, 30), 30);
        assert_eq!(next_tick(&queue, 40, 100), 41);
    }

    #[test]
    fn test_run_rejects_overflowing_window() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(&dir);

        let result = cmd_run(&session, Some(i64::MAX), Some(2));
        assert!(result.is_err());
    }

    #[test]
    fn test_list_reads_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(&dir);

        cmd_list(&session).unwrap();
        assert!(!session.save_path.exists());
    }
}
