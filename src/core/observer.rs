use crate::domain::ports::SecurityObserver;
use std::sync::Mutex;

/// Keeps the last fullness value it was told and how many times it was told.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    state: Mutex<Recorded>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Recorded {
    last: Option<bool>,
    count: usize,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<bool> {
        self.state.lock().map(|s| s.last).unwrap_or(None)
    }

    /// `true` once the last notification reported a full lot.
    pub fn is_notified_full(&self) -> bool {
        self.last().unwrap_or(false)
    }

    pub fn notifications(&self) -> usize {
        self.state.lock().map(|s| s.count).unwrap_or(0)
    }
}

impl SecurityObserver for RecordingObserver {
    fn on_fullness_changed(&self, is_full: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.last = Some(is_full);
            state.count += 1;
        }
    }
}

/// Reports every notification through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    lot: String,
}

impl LoggingObserver {
    pub fn new(lot: impl Into<String>) -> Self {
        Self { lot: lot.into() }
    }
}

impl SecurityObserver for LoggingObserver {
    fn on_fullness_changed(&self, is_full: bool) {
        if is_full {
            tracing::warn!(lot = %self.lot, "🚨 Security notified: lot is full");
        } else {
            tracing::info!(lot = %self.lot, "🔓 Security notified: lot has space");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_tracks_last_value() {
        let observer = RecordingObserver::new();
        assert_eq!(observer.last(), None);
        assert!(!observer.is_notified_full());

        observer.on_fullness_changed(true);
        observer.on_fullness_changed(false);

        assert_eq!(observer.last(), Some(false));
        assert_eq!(observer.notifications(), 2);
    }
}
