//! Protocol events and line classification.
//!
//! The program under test announces each phase of a persist/restore cycle
//! by printing a fixed marker somewhere in a log line. Classification is a
//! plain case-sensitive substring search; there is no log format to parse.

use serde::Serialize;

/// A protocol phase announced by the program under test.
///
/// # Example
///
/// ```rust
/// use persist_monitor::Event;
///
/// assert_eq!(Event::PersistTriggered.marker(), "persist was triggered");
/// assert!(Event::RestoreFinished.matches("[INFO] restore finished in 3ms"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    /// A persist request started (`persist was triggered`).
    PersistTriggered,
    /// A persist request was deferred behind one already in flight.
    PersistQueued,
    /// The staging buffer used during the persist was released.
    BufferCleared,
    /// The persisted state was reloaded, closing the cycle.
    RestoreFinished,
}

impl Event {
    /// All events in the order they are checked against a line.
    pub const ALL: [Event; 4] = [
        Event::PersistTriggered,
        Event::PersistQueued,
        Event::BufferCleared,
        Event::RestoreFinished,
    ];

    /// Returns the exact text that announces this event.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Event::PersistTriggered => "persist was triggered",
            Event::PersistQueued => "persist was queued! persist now...",
            Event::BufferCleared => "finished clearing buffer",
            Event::RestoreFinished => "restore finished",
        }
    }

    /// Returns true if `line` contains this event's marker.
    #[inline]
    #[must_use]
    pub fn matches(self, line: &str) -> bool {
        line.contains(self.marker())
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Event::PersistTriggered => "persist-triggered",
            Event::PersistQueued => "persist-queued",
            Event::BufferCleared => "buffer-cleared",
            Event::RestoreFinished => "restore-finished",
        };
        f.write_str(name)
    }
}

/// Classifies a line into zero or more events.
///
/// Every marker is checked independently, so a single line may yield more
/// than one event. Matches are always produced in [`Event::ALL`] order.
///
/// # Example
///
/// ```rust
/// use persist_monitor::{classify, Event};
///
/// let events: Vec<_> = classify("vnv: persist was triggered").collect();
/// assert_eq!(events, vec![Event::PersistTriggered]);
/// assert_eq!(classify("new iteration").count(), 0);
/// ```
pub fn classify(line: &str) -> impl Iterator<Item = Event> + '_ {
    Event::ALL.into_iter().filter(move |event| event.matches(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_marker_classifies_alone() {
        for event in Event::ALL {
            let line = format!("[WARN] {}", event.marker());
            let found: Vec<_> = classify(&line).collect();
            assert_eq!(found, vec![event]);
        }
    }

    #[test]
    fn test_unrelated_line_yields_nothing() {
        assert_eq!(classify("").count(), 0);
        assert_eq!(classify("new iteration").count(), 0);
        assert_eq!(classify("persist was").count(), 0);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert_eq!(classify("Persist Was Triggered").count(), 0);
        assert_eq!(classify("RESTORE FINISHED").count(), 0);
    }

    #[test]
    fn test_buffer_marker_matches_with_suffix() {
        // The heap tests print the buffer size after the marker.
        let found: Vec<_> = classify("finished clearing buffer with 2000 bytes").collect();
        assert_eq!(found, vec![Event::BufferCleared]);
    }

    #[test]
    fn test_multiple_markers_keep_fixed_order() {
        let line = "restore finished; persist was triggered";
        let found: Vec<_> = classify(line).collect();
        assert_eq!(found, vec![Event::PersistTriggered, Event::RestoreFinished]);
    }

    #[test]
    fn test_queued_marker_needs_full_text() {
        assert_eq!(classify("persist was queued!").count(), 0);
        assert_eq!(
            classify("persist was queued! persist now...").collect::<Vec<_>>(),
            vec![Event::PersistQueued]
        );
    }
}
