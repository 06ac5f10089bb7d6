//! # Protocol State Machine
//!
//! Validates the order in which persist/restore phases are announced.
//!
//! ## Transition Table
//!
//! | Current state            | Event             | Next state      | Effect                       |
//! |--------------------------|-------------------|-----------------|------------------------------|
//! | `Idle`                   | persist-triggered | `Triggered`     | `recoveries_triggered += 1`  |
//! | `Triggered`              | persist-queued    | `Queued`        | `persists_queued += 1`       |
//! | `Triggered` or `Queued`  | buffer-cleared    | `BufferCleared` |                              |
//! | `BufferCleared`          | restore-finished  | `Idle`          |                              |
//! | `Queued`                 | persist-triggered | `Queued`        | ignored, nothing counted     |
//!
//! Every other pairing is a [`ProtocolViolation`]. A violation halts the
//! machine: the state and counters stay exactly as they were when the
//! offending event arrived, and nothing is accepted afterwards.
//!
//! ## Example
//!
//! ```rust
//! use persist_monitor::{Event, ProtocolMachine, ProtocolState};
//!
//! let mut machine = ProtocolMachine::new();
//! machine.apply(Event::PersistTriggered)?;
//! machine.apply(Event::BufferCleared)?;
//! machine.apply(Event::RestoreFinished)?;
//!
//! assert_eq!(machine.state(), ProtocolState::Idle);
//! assert_eq!(machine.statistics().recoveries_triggered, 1);
//! # Ok::<(), persist_monitor::MonitorError>(())
//! ```

use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::{MonitorError, ProtocolViolation, Result};
use crate::event::{classify, Event};

/// Phase of the persist/restore protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolState {
    /// No persist in flight.
    #[default]
    Idle,
    /// A persist was requested and is running.
    Triggered,
    /// A second persist request was merged into the running one.
    Queued,
    /// The persist wrote its checkpoint and released its staging buffer.
    BufferCleared,
}

impl std::fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProtocolState::Idle => "idle",
            ProtocolState::Triggered => "triggered",
            ProtocolState::Queued => "queued",
            ProtocolState::BufferCleared => "buffer-cleared",
        };
        f.write_str(name)
    }
}

/// Counters accumulated over a run. They only ever grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Statistics {
    /// Accepted `Idle -> Triggered` events.
    pub recoveries_triggered: u64,
    /// Accepted `Triggered -> Queued` events.
    pub persists_queued: u64,
}

/// What an accepted event did to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The machine moved from one state to another.
    Advanced {
        /// Event that drove the move.
        event: Event,
        /// State before the event.
        from: ProtocolState,
        /// State after the event.
        to: ProtocolState,
    },
    /// A benign duplicate trigger while a persist is queued.
    Ignored {
        /// Event that was ignored.
        event: Event,
        /// State the machine stayed in.
        state: ProtocolState,
    },
}

impl Transition {
    /// Returns the event behind this transition.
    #[must_use]
    pub const fn event(&self) -> Event {
        match self {
            Transition::Advanced { event, .. } | Transition::Ignored { event, .. } => *event,
        }
    }
}

/// Transitions driven by a single line, in marker order.
///
/// A line carries at most one match per marker (four in total), so the
/// outcome is a fixed inline array and never allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineOutcome {
    transitions: [Option<Transition>; 4],
    len: usize,
}

impl LineOutcome {
    fn push(&mut self, transition: Transition) {
        self.transitions[self.len] = Some(transition);
        self.len += 1;
    }

    /// Returns the transitions taken, in order.
    pub fn transitions(&self) -> impl Iterator<Item = Transition> + '_ {
        self.transitions[..self.len].iter().flatten().copied()
    }

    /// Returns the number of events accepted from the line.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the line carried no marker.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if the line ended on an ignored duplicate trigger.
    #[must_use]
    pub fn ended_on_duplicate(&self) -> bool {
        matches!(self.transitions().last(), Some(Transition::Ignored { .. }))
    }
}

/// Snapshot of the machine, used for diagnostics at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MachineStatus {
    /// Current protocol state.
    pub state: ProtocolState,
    /// Counters so far.
    pub statistics: Statistics,
    /// Completed trigger -> restore cycles.
    pub cycles_completed: u64,
    /// Lines handed to [`ProtocolMachine::process_line`].
    pub lines_seen: u64,
    /// Whether a violation halted the machine.
    pub halted: bool,
}

/// The persist/restore protocol checker.
///
/// Owned by exactly one processing loop; it is plain data with no interior
/// mutability, so each run (or each test) gets its own instance.
#[derive(Debug, Default)]
pub struct ProtocolMachine {
    state: ProtocolState,
    statistics: Statistics,
    cycles_completed: u64,
    lines_seen: u64,
    violation: Option<ProtocolViolation>,
}

impl ProtocolMachine {
    /// Creates a machine in the `Idle` state with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a single event.
    ///
    /// # Returns
    ///
    /// The [`Transition`] taken, or an error if:
    /// - the event has no transition from the current state
    ///   ([`MonitorError::Violation`], which also halts the machine)
    /// - the machine already halted ([`MonitorError::Halted`])
    pub fn apply(&mut self, event: Event) -> Result<Transition> {
        self.apply_at(event, None)
    }

    /// Classifies a line and applies every event it carries, in marker order.
    ///
    /// `line_number` is 1-based and only used to annotate diagnostics.
    ///
    /// An ignored duplicate trigger ends evaluation of the line: any later
    /// marker on the same line is not looked at. Evaluation also stops at
    /// the first violation.
    pub fn process_line(&mut self, line: &str, line_number: u64) -> Result<LineOutcome> {
        if self.violation.is_some() {
            return Err(MonitorError::Halted);
        }
        self.lines_seen += 1;

        let mut outcome = LineOutcome::default();
        for event in classify(line) {
            let transition = self.apply_at(event, Some(line_number))?;
            outcome.push(transition);
            if matches!(transition, Transition::Ignored { .. }) {
                break;
            }
        }
        Ok(outcome)
    }

    fn apply_at(&mut self, event: Event, line_number: Option<u64>) -> Result<Transition> {
        if self.violation.is_some() {
            return Err(MonitorError::Halted);
        }

        let from = self.state;
        let to = match (from, event) {
            (ProtocolState::Idle, Event::PersistTriggered) => {
                self.statistics.recoveries_triggered += 1;
                ProtocolState::Triggered
            }
            (ProtocolState::Queued, Event::PersistTriggered) => {
                warn!("Persist triggered while another persist is queued, ignoring duplicate");
                return Ok(Transition::Ignored { event, state: from });
            }
            (ProtocolState::Triggered, Event::PersistQueued) => {
                self.statistics.persists_queued += 1;
                ProtocolState::Queued
            }
            (ProtocolState::Triggered | ProtocolState::Queued, Event::BufferCleared) => {
                ProtocolState::BufferCleared
            }
            (ProtocolState::BufferCleared, Event::RestoreFinished) => {
                self.cycles_completed += 1;
                ProtocolState::Idle
            }
            _ => {
                let mut violation = ProtocolViolation::new(event, from);
                if let Some(line) = line_number {
                    violation = violation.at_line(line);
                }
                error!("{}", violation);
                self.violation = Some(violation);
                return Err(violation.into());
            }
        };

        debug!("{}: {} -> {}", event, from, to);
        self.state = to;
        Ok(Transition::Advanced { event, from, to })
    }

    /// Returns the current protocol state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ProtocolState {
        self.state
    }

    /// Returns the counters accumulated so far.
    #[inline]
    #[must_use]
    pub const fn statistics(&self) -> Statistics {
        self.statistics
    }

    /// Returns the number of completed trigger -> restore cycles.
    #[inline]
    #[must_use]
    pub const fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    /// Returns the number of lines processed.
    #[inline]
    #[must_use]
    pub const fn lines_seen(&self) -> u64 {
        self.lines_seen
    }

    /// Returns true once a violation has been recorded.
    #[inline]
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.violation.is_some()
    }

    /// Returns the violation that halted the machine, if any.
    #[must_use]
    pub fn violation(&self) -> Option<&ProtocolViolation> {
        self.violation.as_ref()
    }

    /// Returns a snapshot of the machine.
    #[must_use]
    pub fn status(&self) -> MachineStatus {
        MachineStatus {
            state: self.state,
            statistics: self.statistics,
            cycles_completed: self.cycles_completed,
            lines_seen: self.lines_seen,
            halted: self.is_halted(),
        }
    }
}
