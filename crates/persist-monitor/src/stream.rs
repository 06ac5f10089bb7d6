//! Line source, echo stage and the monitoring loop.
//!
//! One task reads one line at a time, echoes it, then hands it to the
//! [`ProtocolMachine`]. The only await points are the read and the echo
//! write. Shutdown is a [`CancellationToken`] raced against the read, so an
//! operator stop ends the loop the same way end-of-stream does.

use std::path::Path;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{MonitorError, ProtocolViolation, Result};
use crate::machine::{MachineStatus, ProtocolMachine, ProtocolState, Statistics};

/// Why the monitoring loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The producer closed its stream.
    EndOfStream,
    /// The shutdown token was cancelled while waiting for a line.
    Interrupted,
    /// The program under test broke the protocol.
    Violation(ProtocolViolation),
}

/// Summary of a finished run, handed to the statistics reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Final counters.
    pub statistics: Statistics,
    /// State the machine ended in. Not necessarily `Idle`.
    pub final_state: ProtocolState,
    /// Lines echoed to the sink.
    pub lines_echoed: u64,
    /// Why the loop stopped.
    pub termination: Termination,
}

impl RunOutcome {
    /// Returns the violation that ended the run, if any.
    #[must_use]
    pub fn violation(&self) -> Option<&ProtocolViolation> {
        match &self.termination {
            Termination::Violation(violation) => Some(violation),
            _ => None,
        }
    }
}

/// Opens a replayed capture file as a line source.
pub async fn open_capture(path: impl AsRef<Path>) -> Result<BufReader<tokio::fs::File>> {
    let file = tokio::fs::File::open(path.as_ref()).await?;
    Ok(BufReader::new(file))
}

/// Monitors `source` until it ends, `shutdown` fires, or a violation occurs.
///
/// Each line is written to `sink` (and flushed) before it is interpreted,
/// so line N is always visible downstream before anything line N causes.
/// The trailing `\n` is stripped and rewritten; every other byte is echoed
/// as read. Classification sees a lossy UTF-8 view of the line.
///
/// # Errors
///
/// Only I/O failures on `source` or `sink` are returned as errors. A
/// protocol violation is a normal outcome here and is reported through
/// [`Termination::Violation`] so the caller can still print statistics.
///
/// # Example
///
/// ```rust
/// use persist_monitor::{run, ProtocolMachine, Termination};
/// use tokio_util::sync::CancellationToken;
///
/// # tokio_test_block(async {
/// let input: &[u8] = b"persist was triggered\nfinished clearing buffer\nrestore finished\n";
/// let mut echoed = Vec::new();
/// let mut machine = ProtocolMachine::new();
///
/// let outcome = run(input, &mut echoed, &mut machine, CancellationToken::new()).await?;
/// assert_eq!(outcome.termination, Termination::EndOfStream);
/// assert_eq!(outcome.statistics.recoveries_triggered, 1);
/// assert_eq!(echoed, input);
/// # Ok::<(), persist_monitor::MonitorError>(())
/// # }).unwrap();
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub async fn run<R, W>(
    mut source: R,
    sink: &mut W,
    machine: &mut ProtocolMachine,
    shutdown: CancellationToken,
) -> Result<RunOutcome>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::with_capacity(256);
    let mut line_number = 0u64;

    let termination = loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            read = source.read_until(b'\n', &mut buf) => Some(read?),
        };

        let n = match read {
            None => {
                info!("Shutdown requested after {} lines", line_number);
                break Termination::Interrupted;
            }
            Some(0) => {
                debug!("Line source closed after {} lines", line_number);
                break Termination::EndOfStream;
            }
            Some(n) => n,
        };

        let line = if buf[n - 1] == b'\n' {
            &buf[..n - 1]
        } else {
            &buf[..n]
        };
        line_number += 1;

        sink.write_all(line).await?;
        sink.write_all(b"\n").await?;
        sink.flush().await?;

        let text = String::from_utf8_lossy(line);
        match machine.process_line(&text, line_number) {
            Ok(_) => {}
            Err(MonitorError::Violation(violation)) => break Termination::Violation(violation),
            Err(e) => return Err(e),
        }
    };

    let MachineStatus {
        state, statistics, ..
    } = machine.status();

    Ok(RunOutcome {
        statistics,
        final_state: state,
        lines_echoed: line_number,
        termination,
    })
}
