//! Tone histogram client for the GDELT DOC 2.0 API.

use super::wire::decode_tone_chart;
use crate::error::Result;
use crate::models::{Task, ToneBin};
use crate::utils::{gdelt_timestamp, truncate_for_log};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Build the search expression for a task.
///
/// Non-empty parts are joined with spaces in this order: base query,
/// `theme:<THEME>`, tone clause, `sourcecountry:<COUNTRY>`.
pub fn build_query(task: &Task) -> String {
    let theme = task.theme.as_ref().map(|t| format!("theme:{}", t.trim()));
    let country = format!("sourcecountry:{}", task.country);

    [
        Some(task.base_query.trim().to_string()),
        theme,
        task.tone.as_ref().map(|t| t.trim().to_string()),
        Some(country),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Full request URL for a task's tone chart.
pub fn tone_chart_url(base_url: &str, task: &Task) -> String {
    format!(
        "{}?query={}&mode=tonechart&STARTDATETIME={}&ENDDATETIME={}&format=json",
        base_url,
        urlencoding::encode(&build_query(task)),
        gdelt_timestamp(&task.window.start),
        gdelt_timestamp(&task.window.end),
    )
}

#[derive(Debug, Clone)]
pub struct HistogramClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl HistogramClient {
    pub fn new(http: Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            timeout,
        }
    }

    /// Fetch the tone histogram for one task.
    ///
    /// Returns the buckets in service order, each holding its sampled
    /// articles without content.
    ///
    /// # Errors
    ///
    /// - [`crate::error::HarvestError::Http`] on transport failure or a non-2xx status
    /// - [`crate::error::HarvestError::MalformedResponse`] when the body is not a tone
    ///   chart even after sanitization
    #[instrument(level = "info", skip_all, fields(country = %task.country, window = %task.window))]
    pub async fn fetch_tone_chart(&self, task: &Task) -> Result<Vec<ToneBin>> {
        let url = tone_chart_url(&self.base_url, task);
        debug!(%url, "Requesting tone chart");

        let t0 = Instant::now();
        let body = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let bins = decode_tone_chart(&body, &task.country).inspect_err(|e| {
            warn!(
                error = %e,
                response_preview = %truncate_for_log(&body, 300),
                "Tone chart response unrecoverable after sanitization"
            )
        })?;

        let refs: usize = bins.iter().map(|b| b.articles.len()).sum();
        info!(
            bins = bins.len(),
            article_refs = refs,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched tone chart"
        );
        Ok(bins)
    }
}
