//! Statistics reporter.
//!
//! Runs once after the line source ends, whatever the reason. The text
//! block is the format downstream tooling greps for and must not drift.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::Result;
use crate::machine::Statistics;

/// How the final statistics are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// The fixed human-readable block.
    #[default]
    Text,
    /// A single-line JSON object.
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format '{other}' (expected text or json)")),
        }
    }
}

impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "########## STATISTICS ##########")?;
        writeln!(f, "Total Recoveries Executed: {}", self.recoveries_triggered)?;
        writeln!(f, "Recoveries Queued: {}", self.persists_queued)?;
        writeln!(f, "################################")
    }
}

/// Renders the statistics in the requested format, newline-terminated.
///
/// # Example
///
/// ```rust
/// use persist_monitor::{render_report, ReportFormat, Statistics};
///
/// let stats = Statistics { recoveries_triggered: 2, persists_queued: 1 };
/// let json = render_report(&stats, ReportFormat::Json)?;
/// assert_eq!(json, "{\"recoveries_triggered\":2,\"persists_queued\":1}\n");
/// # Ok::<(), persist_monitor::MonitorError>(())
/// ```
pub fn render_report(statistics: &Statistics, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(statistics.to_string()),
        ReportFormat::Json => {
            let mut json = serde_json::to_string(statistics)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            json.push('\n');
            Ok(json)
        }
    }
}

/// Writes the report to `sink` and flushes it.
pub async fn write_report<W>(sink: &mut W, statistics: &Statistics, format: ReportFormat) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let rendered = render_report(statistics, format)?;
    sink.write_all(rendered.as_bytes()).await?;
    sink.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_block_is_exact() {
        let stats = Statistics {
            recoveries_triggered: 12,
            persists_queued: 3,
        };
        let expected = "\n\
            ########## STATISTICS ##########\n\
            Total Recoveries Executed: 12\n\
            Recoveries Queued: 3\n\
            ################################\n";
        assert_eq!(render_report(&stats, ReportFormat::Text).unwrap(), expected);
    }

    #[test]
    fn test_zero_counts_still_reported() {
        let text = render_report(&Statistics::default(), ReportFormat::Text).unwrap();
        assert!(text.contains("Total Recoveries Executed: 0\n"));
        assert!(text.contains("Recoveries Queued: 0\n"));
    }

    #[test]
    fn test_json_report_parses() {
        let stats = Statistics {
            recoveries_triggered: 7,
            persists_queued: 4,
        };
        let json = render_report(&stats, ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["recoveries_triggered"], 7);
        assert_eq!(value["persists_queued"], 4);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("text".parse::<ReportFormat>().unwrap(), ReportFormat::Text);
        assert_eq!("JSON".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("yaml".parse::<ReportFormat>().is_err());
    }

    #[tokio::test]
    async fn test_write_report_to_sink() {
        let mut sink = Vec::new();
        let stats = Statistics {
            recoveries_triggered: 1,
            persists_queued: 0,
        };
        write_report(&mut sink, &stats, ReportFormat::Text).await.unwrap();
        let out = String::from_utf8(sink).unwrap();
        assert!(out.starts_with("\n########## STATISTICS"));
    }
}
