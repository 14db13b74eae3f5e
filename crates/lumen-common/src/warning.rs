//! Engine warnings routed through the `log` facade.
//!
//! Provides deduplication to avoid spamming the same warning multiple times
//! when a style recalc pass revisits the same unsupported input over and over.

use std::collections::HashSet;
use std::sync::Mutex;

/// Global set of warnings we've already emitted (to deduplicate)
static WARNED: Mutex<Option<HashSet<String>>> = Mutex::new(None);

/// Warn about unsupported input (emitted once per unique message).
///
/// Returns `true` if this call emitted the warning, `false` if the same
/// message had already been reported.
///
/// # Example
/// ```
/// use lumen_common::warning::warn_once;
///
/// assert!(warn_once("Selectors", "ignoring complex selector 'div p'"));
/// assert!(!warn_once("Selectors", "ignoring complex selector 'div p'"));
/// ```
pub fn warn_once(component: &str, message: &str) -> bool {
    let key = format!("[{component}] {message}");
    let should_emit = WARNED
        .lock()
        .map(|mut guard| guard.get_or_insert_with(HashSet::new).insert(key))
        // A poisoned set only loses deduplication, never the warning itself.
        .unwrap_or(true);

    if should_emit {
        log::warn!(target: "lumen", "[{component}] {message}");
    }
    should_emit
}

/// Clear all recorded warnings (call when loading a new document).
pub fn clear_warnings() {
    if let Ok(mut guard) = WARNED.lock()
        && let Some(set) = guard.as_mut()
    {
        set.clear();
    }
}
