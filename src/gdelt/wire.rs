//! Wire format of the DOC API `tonechart` mode.
//!
//! ```json
//! { "tonechart": [ { "bin": -3, "count": 12,
//!     "toparts": [ { "url": "https://…", "title": "…" } ] } ] }
//! ```
//!
//! [`decode_tone_chart`] maps these fields onto [`ToneBin`] and [`Article`].

use super::sanitize::sanitize_json;
use crate::error::{HarvestError, Result};
use crate::models::{Article, ArticleRef, ToneBin};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct ToneChartResponse {
    #[serde(default)]
    tonechart: Vec<WireBin>,
}

#[derive(Debug, Deserialize)]
struct WireBin {
    bin: i32,
    count: u64,
    #[serde(default)]
    toparts: Vec<WireArticle>,
}

#[derive(Debug, Deserialize)]
struct WireArticle {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
}

/// Decode a raw response body for a task targeting `country`.
///
/// The body is sanitized first. References without a URL are skipped, and a
/// bucket never keeps more references than its `count`. An empty object
/// (the service's "no matches" answer) yields no bins.
///
/// # Errors
///
/// [`HarvestError::MalformedResponse`] when the sanitized text is still not
/// a valid tone chart.
pub fn decode_tone_chart(raw: &str, country: &str) -> Result<Vec<ToneBin>> {
    let sanitized = sanitize_json(raw);
    let response: ToneChartResponse =
        serde_json::from_str(&sanitized).map_err(HarvestError::MalformedResponse)?;

    Ok(response
        .tonechart
        .into_iter()
        .map(|wire_bin| {
            let limit = usize::try_from(wire_bin.count).unwrap_or(usize::MAX);
            if wire_bin.toparts.len() > limit {
                warn!(
                    bin = wire_bin.bin,
                    count = wire_bin.count,
                    toparts = wire_bin.toparts.len(),
                    "More references than bucket count; truncating"
                );
            }
            let articles = wire_bin
                .toparts
                .into_iter()
                .filter(|a| !a.url.trim().is_empty())
                .take(limit)
                .map(|a| {
                    let article_ref = ArticleRef {
                        url: a.url.trim().to_string(),
                        title: a.title.trim().to_string(),
                    };
                    Article::from_ref(article_ref, wire_bin.bin, country)
                })
                .collect();
            ToneBin {
                bin_index: wire_bin.bin,
                count: wire_bin.count,
                articles,
            }
        })
        .collect())
}
