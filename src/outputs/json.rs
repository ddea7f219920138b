//! Append-only JSON-lines output.
//!
//! # Output Structure
//!
//! One file per country and calendar month of the window start:
//! ```text
//! output_dir/
//! └── US/
//!     └── 2017/
//!         ├── 01.json
//!         └── 02.json
//! ```
//!
//! Each line is one [`ToneChart`]. Repeated runs keep appending.

use super::locks::LockRegistry;
use super::record::encode_line;
use crate::error::Result;
use crate::models::ToneChart;
use chrono::{Datelike, NaiveDateTime};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

/// `{base}/{country}/{YYYY}/{MM}.json` for a window starting at `start`.
pub fn output_path(base: &Path, country: &str, start: &NaiveDateTime) -> PathBuf {
    base.join(country)
        .join(format!("{:04}", start.year()))
        .join(format!("{:02}.json", start.month()))
}

/// Length bookkeeping an append needs to undo itself.
trait Truncate {
    async fn current_len(&self) -> io::Result<u64>;
    async fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl Truncate for fs::File {
    async fn current_len(&self) -> io::Result<u64> {
        Ok(self.metadata().await?.len())
    }

    async fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len).await
    }
}

/// Append `line` and flush. If the write fails partway the file is cut back
/// to its previous length, so a torn record never precedes the next append.
async fn append_line<W>(file: &mut W, line: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Truncate + Unpin,
{
    let committed = file.current_len().await?;
    let written = async {
        file.write_all(line).await?;
        file.flush().await
    }
    .await;
    if let Err(e) = written {
        warn!(committed, error = %e, "Append failed; rolling back partial line");
        file.truncate_to(committed).await?;
        return Err(e);
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ChartWriter {
    base_dir: PathBuf,
    registry: &'static LockRegistry,
}

impl ChartWriter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            registry: LockRegistry::global(),
        }
    }

    /// Append `chart` as one line to its country/month file.
    ///
    /// The line is encoded before the file lock is taken, so the lock only
    /// covers open + write + flush. Returns the path written.
    ///
    /// # Errors
    ///
    /// Encoding or filesystem failures. Nothing is written on encode failure.
    #[instrument(
        level = "info",
        skip_all,
        fields(country = %chart.country, window = %chart.window)
    )]
    pub async fn append_chart(&self, chart: &ToneChart) -> Result<PathBuf> {
        let path = output_path(&self.base_dir, &chart.country, &chart.window.start);
        let line = encode_line(chart)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let lock = self.registry.acquire(&path).await;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        append_line(&mut file, line.as_bytes()).await?;
        drop(file);
        debug!(path = %lock.path().display(), bytes = line.len(), "Appended record");
        lock.release();

        info!(path = %path.display(), articles = chart.article_count(), "Wrote tone chart");
        Ok(path)
    }
}
