use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

pub const DEFAULT_CAPACITY: usize = 100;

/// Recent surfaced errors, oldest first, for the `errors` command.
pub struct ErrorLog {
    errors: Mutex<VecDeque<ErrorEntry>>,
    max_entries: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEntry {
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub error: String,
    pub context: Option<String>,
}

impl ErrorLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            errors: Mutex::new(VecDeque::with_capacity(max_entries)),
            max_entries: max_entries.max(1),
        }
    }

    pub fn log_error(&self, command: &str, error: &str, context: Option<&str>) {
        let entry = ErrorEntry {
            timestamp: Utc::now(),
            command: command.to_string(),
            error: error.to_string(),
            context: context.map(|s| s.to_string()),
        };

        log::error!("{}: {}", command, error);

        let mut errors = self.entries();
        if errors.len() >= self.max_entries {
            errors.pop_front();
        }
        errors.push_back(entry);
    }

    pub fn get_errors(&self) -> Vec<ErrorEntry> {
        self.entries().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<ErrorEntry>> {
        self.errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

pub fn render_errors(entries: &[ErrorEntry]) -> String {
    if entries.is_empty() {
        return "No errors recorded.".to_string();
    }
    entries
        .iter()
        .map(|e| {
            let context = e
                .context
                .as_deref()
                .map(|c| format!(" ({})", c))
                .unwrap_or_default();
            format!(
                "{}  {}{}: {}",
                e.timestamp.format("%H:%M:%S"),
                e.command,
                context,
                e.error
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
