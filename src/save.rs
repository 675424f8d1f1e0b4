//! Loading and storing the pending event set.

use std::path::Path;

use tickq_core::{Error, Result};
use tickq_timers::{RestoreReport, TimerQueue};
use tracing::{debug, info};

/// Restore `path` into `queue`.
///
/// A missing file is an empty save.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or is not a JSON
/// array. Unreadable entries inside the array are skipped and listed in the
/// report.
pub fn load<C: 'static>(queue: &mut TimerQueue<C>, path: &Path) -> Result<RestoreReport> {
    if !path.exists() {
        debug!(path = %path.display(), "No save file, starting empty");
        return Ok(RestoreReport::default());
    }

    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::file_read_failed(path, e.to_string()))?;
    queue.restore_from_json(&text)
}

/// Write the pending events of `queue` to `path`.
///
/// The file is replaced atomically through a sibling temp file.
///
/// # Errors
///
/// Returns an error if an event cannot be encoded or the file cannot be
/// written.
pub fn store<C: 'static>(queue: &TimerQueue<C>, path: &Path) -> Result<()> {
    let entries = queue.persist()?;
    let text = serde_json::to_string_pretty(&entries)
        .map_err(|e| Error::file_write_failed(path, e.to_string()))?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, text).map_err(|e| Error::file_write_failed(&tmp, e.to_string()))?;
    std::fs::rename(&tmp, path).map_err(|e| Error::file_write_failed(path, e.to_string()))?;

    info!(path = %path.display(), events = entries.len(), "Saved pending events");
    Ok(())
}
