//! # Persist Monitor
//!
//! Streaming conformance checker for the persist/restore checkpoint
//! protocol. It consumes the live log of a program under test, passes every
//! line through untouched, and fails loudly the moment the program
//! announces protocol phases in an illegal order.
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`run`] | Line source + echo stage, cancellable monitoring loop |
//! | [`ProtocolMachine`] | Transition table and counters |
//! | [`classify`] | Marker matching for a single line |
//! | [`write_report`] | Final statistics block |
//! | [`MonitorConfig`] | TOML-backed settings |
//!
//! ## Architecture
//!
//! ```text
//! producer ──lines──▶ run ──echo──▶ sink
//!                      │
//!                      ▼
//!               ProtocolMachine ──▶ Statistics ──▶ write_report
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use persist_monitor::{Event, ProtocolMachine, ProtocolState};
//!
//! let mut machine = ProtocolMachine::new();
//! machine.process_line("persist was triggered", 1)?;
//! machine.process_line("persist was queued! persist now...", 2)?;
//! machine.process_line("finished clearing buffer", 3)?;
//! machine.process_line("restore finished", 4)?;
//!
//! assert_eq!(machine.state(), ProtocolState::Idle);
//! assert_eq!(machine.statistics().persists_queued, 1);
//!
//! // Out of order: restore without a persist.
//! let err = machine.process_line("restore finished", 5).unwrap_err();
//! assert_eq!(err.as_violation().unwrap().event, Event::RestoreFinished);
//! # Ok::<(), persist_monitor::MonitorError>(())
//! ```
//!
//! ## Notes
//!
//! - Echo happens before interpretation; a violation never hides a line
//! - A violation halts the machine; the counters stay available for the report
//! - An interrupt is a normal end of run, not an error

mod config;
mod error;
mod event;
mod machine;
mod report;
mod stream;

pub use config::MonitorConfig;
pub use error::{MonitorError, ProtocolViolation, Result};
pub use event::{classify, Event};
pub use machine::{
    LineOutcome, MachineStatus, ProtocolMachine, ProtocolState, Statistics, Transition,
};
pub use report::{render_report, write_report, ReportFormat};
pub use stream::{open_capture, run, RunOutcome, Termination};
