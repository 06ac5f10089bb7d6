//! Error types for the protocol monitor.
//!
//! A protocol violation is the only error the monitor raises on its own
//! account; the remaining variants wrap failures of the surrounding
//! plumbing (the line source, the echo sink, configuration files).

use thiserror::Error;

use crate::event::Event;
use crate::machine::ProtocolState;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// An event arrived in a state from which the protocol has no transition.
///
/// Carries the offending event and the state the machine was in when the
/// event arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error(
    "protocol violation: '{}' received in state {}{}",
    .event.marker(),
    .state,
    LineSuffix(.line_number)
)]
pub struct ProtocolViolation {
    /// Event that had no legal transition.
    pub event: Event,
    /// State of the machine when the event arrived.
    pub state: ProtocolState,
    /// 1-based input line that carried the event, when known.
    pub line_number: Option<u64>,
}

impl ProtocolViolation {
    /// Creates a violation that is not yet tied to an input line.
    #[must_use]
    pub const fn new(event: Event, state: ProtocolState) -> Self {
        Self {
            event,
            state,
            line_number: None,
        }
    }

    /// Attaches the input line number that carried the event.
    #[must_use]
    pub const fn at_line(mut self, line_number: u64) -> Self {
        self.line_number = Some(line_number);
        self
    }
}

struct LineSuffix<'a>(&'a Option<u64>);

impl std::fmt::Display for LineSuffix<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(line) => write!(f, " (line {line})"),
            None => Ok(()),
        }
    }
}

/// Errors that can occur while monitoring a log stream.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The program under test broke the persist/restore protocol.
    #[error(transparent)]
    Violation(#[from] ProtocolViolation),

    /// An event was offered after the machine already halted on a violation.
    #[error("monitor halted after a protocol violation; no further events are accepted")]
    Halted,

    /// Reading the line source or writing the echo stream failed.
    #[error("stream I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MonitorError {
    /// Returns the protocol violation carried by this error, if any.
    #[must_use]
    pub fn as_violation(&self) -> Option<&ProtocolViolation> {
        match self {
            Self::Violation(violation) => Some(violation),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_message_names_marker_and_state() {
        let violation = ProtocolViolation::new(Event::RestoreFinished, ProtocolState::Idle);
        assert_eq!(
            violation.to_string(),
            "protocol violation: 'restore finished' received in state idle"
        );
    }

    #[test]
    fn test_violation_message_includes_line() {
        let violation =
            ProtocolViolation::new(Event::PersistQueued, ProtocolState::Queued).at_line(17);
        assert!(violation.to_string().ends_with("in state queued (line 17)"));
    }

    #[test]
    fn test_violation_is_a_std_error() {
        let violation =
            ProtocolViolation::new(Event::PersistTriggered, ProtocolState::BufferCleared).at_line(4);
        let err: &dyn std::error::Error = &violation;
        assert!(err.source().is_none());
        assert_eq!(
            err.to_string(),
            "protocol violation: 'persist was triggered' received in state buffer-cleared (line 4)"
        );
    }

    #[test]
    fn test_monitor_error_exposes_violation() {
        let err: MonitorError =
            ProtocolViolation::new(Event::BufferCleared, ProtocolState::Idle).into();
        let violation = err.as_violation().unwrap();
        assert_eq!(violation.event, Event::BufferCleared);
        assert_eq!(violation.state, ProtocolState::Idle);
        assert!(MonitorError::Halted.as_violation().is_none());
    }
}
