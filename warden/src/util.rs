//! Small shared utilities: id generation, timestamps, config paths.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Current unix time in milliseconds.
#[must_use]
pub fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Generate a process-unique id with the given prefix.
///
/// Combines the current millisecond timestamp with a monotonic counter,
/// so ids are unique within a process and sort roughly by creation time.
#[must_use]
pub fn generate_id(prefix: &str) -> String {
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}-{:x}-{:x}", prefix, timestamp_ms(), seq)
}

/// Generate a task id.
#[must_use]
pub fn generate_task_id() -> String {
    generate_id("task")
}

/// Generate a message id.
#[must_use]
pub fn generate_message_id() -> String {
    generate_id("msg")
}

/// The warden configuration directory (`~/.config/warden` or platform
/// equivalent), falling back to the current directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("warden")
}

/// Default path of the persisted task file.
#[must_use]
pub fn tasks_path() -> PathBuf {
    config_dir().join("tasks.json")
}

/// Truncate a string to at most `max` characters, appending an ellipsis
/// when something was cut.
#[must_use]
pub fn truncate_str(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}\u{2026}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_uniqueness() {
        let a = generate_task_id();
        let b = generate_task_id();
        assert_ne!(a, b);
        assert!(a.starts_with("task-"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate_str("hello", 10), "hello");
        let t = truncate_str("hello world", 5);
        assert_eq!(t.chars().count(), 5);
        assert!(t.ends_with('\u{2026}'));
    }
}
