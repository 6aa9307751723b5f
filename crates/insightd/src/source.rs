//! Telemetry sources.
//!
//! The daemon does not compute telemetry; it reads snapshots produced
//! elsewhere. The stock source reads one JSON object per line.

use anyhow::Result;
use insight_common::TelemetrySnapshot;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::warn;

/// Reads newline-delimited JSON snapshots
pub struct JsonLinesSource<R> {
    lines: Lines<R>,
    skipped: u64,
}

impl JsonLinesSource<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            skipped: 0,
        }
    }

    /// Next valid snapshot, or `None` at end of input. Bad lines are logged and skipped.
    pub async fn next_snapshot(&mut self) -> Result<Option<TelemetrySnapshot>> {
        while let Some(line) = self.lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match TelemetrySnapshot::from_json_line(&line) {
                Ok(snapshot) => return Ok(Some(snapshot)),
                Err(e) => {
                    self.skipped += 1;
                    warn!("Skipping malformed telemetry line: {}", e);
                }
            }
        }
        Ok(None)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
