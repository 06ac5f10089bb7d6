//! Persist Monitor CLI - checks a live persist/restore log on stdin

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use persist_monitor::{
    open_capture, run, write_report, MonitorConfig, ProtocolMachine, ReportFormat, RunOutcome,
    Termination,
};
use tokio::io::{AsyncBufRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "persist-monitor")]
#[command(about = "Echo a persist/restore log and fail on protocol violations")]
struct Cli {
    /// Replay a captured log file instead of reading stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Statistics report format: text or json
    #[arg(short, long)]
    format: Option<ReportFormat>,

    /// Diagnostics filter for stderr, e.g. "persist_monitor=debug"
    #[arg(long)]
    log_filter: Option<String>,
}

impl Cli {
    fn resolve_config(&self) -> anyhow::Result<MonitorConfig> {
        let mut config = match &self.config {
            Some(path) => MonitorConfig::load(path)?,
            None => MonitorConfig::default(),
        };
        if let Some(input) = &self.input {
            config = config.with_input(input);
        }
        if let Some(format) = self.format {
            config = config.with_report_format(format);
        }
        if let Some(filter) = &self.log_filter {
            config = config.with_log_filter(filter);
        }
        Ok(config)
    }
}

fn init_tracing(config: &MonitorConfig, explicit: bool) -> anyhow::Result<()> {
    // An explicit --log-filter beats RUST_LOG; RUST_LOG beats the config file.
    let filter = if explicit {
        EnvFilter::try_new(&config.log_filter)?
    } else {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&config.log_filter)?,
        }
    };

    // stdout carries the echoed log and the report only.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn monitor(config: MonitorConfig) -> anyhow::Result<RunOutcome> {
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
            }
        }
    });

    let source: Box<dyn AsyncBufRead + Unpin + Send> = match &config.input {
        Some(path) => Box::new(
            open_capture(path)
                .await
                .with_context(|| format!("cannot open capture {}", path.display()))?,
        ),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let mut stdout = tokio::io::stdout();
    let mut machine = ProtocolMachine::new();
    let outcome = match run(source, &mut stdout, &mut machine, shutdown).await {
        Ok(outcome) => outcome,
        Err(e) => {
            // Keep the counts gathered before the stream failed.
            if let Err(report_err) =
                write_report(&mut stdout, &machine.statistics(), config.report_format).await
            {
                warn!("Could not write statistics after stream failure: {}", report_err);
            }
            return Err(e.into());
        }
    };

    write_report(&mut stdout, &outcome.statistics, config.report_format).await?;

    let status = machine.status();
    info!(
        "Run ended ({:?}): {} lines, {} cycles completed, final state {}",
        outcome.termination, status.lines_seen, status.cycles_completed, status.state
    );
    Ok(outcome)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    init_tracing(&config, cli.log_filter.is_some())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(monitor(config));
    // The stdin reader can still be parked on a blocking read after an interrupt.
    runtime.shutdown_background();

    let outcome = result?;
    if let Termination::Violation(violation) = outcome.termination {
        anyhow::bail!(violation);
    }
    Ok(())
}
