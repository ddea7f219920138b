//! Core entities of a harvest run.
//!
//! These types carry no wire-format concerns. Decoding from the GDELT
//! response lives in [`crate::gdelt::wire`] and encoding of output records in
//! [`crate::outputs::record`].
//!
//! - [`Window`]: half-open time interval bounding one query
//! - [`Task`]: one unit of work (country × window × query)
//! - [`ArticleRef`] / [`Article`]: a sampled article before and after fetching
//! - [`ToneBin`] / [`ToneChart`]: the per-task result

use crate::utils::gdelt_timestamp;
use chrono::NaiveDateTime;
use std::fmt;

/// A half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            gdelt_timestamp(&self.start),
            gdelt_timestamp(&self.end)
        )
    }
}

/// One unit of work: a single histogram query for one country and window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// FIPS country code as understood by `sourcecountry:`.
    pub country: String,
    pub window: Window,
    pub base_query: String,
    /// GKG theme, e.g. `IMMIGRATION`.
    pub theme: Option<String>,
    /// Raw tone clause such as `tone>0 tone<0.999`.
    pub tone: Option<String>,
}

/// An article reference as listed in a tone bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRef {
    pub url: String,
    pub title: String,
}

/// A sampled article travelling through fetch and extraction.
///
/// `raw_content` only lives between the fetch and extraction phases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub seen_date: Option<NaiveDateTime>,
    pub domain: Option<String>,
    pub language: Option<String>,
    pub source_country: Option<String>,
    pub tone_bin: i32,
    pub raw_content: Option<String>,
    pub extracted_title: Option<String>,
    pub extracted_body: Option<String>,
}

impl Article {
    /// Build an article for bucket `tone_bin` from a histogram reference.
    pub fn from_ref(article_ref: ArticleRef, tone_bin: i32, country: &str) -> Self {
        let domain = domain_of(&article_ref.url);
        Self {
            url: article_ref.url,
            title: article_ref.title,
            domain,
            source_country: Some(country.to_string()),
            tone_bin,
            ..Default::default()
        }
    }
}

/// Host of a URL without a leading `www.`.
///
/// For example: `"https://www.bbc.co.uk/news/1"` -> `"bbc.co.uk"`
fn domain_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.trim_start_matches("www.").to_string())
}

/// One tone bucket.
///
/// `count` is the population reported by the service and never changes,
/// however many of `articles` survive fetching and extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToneBin {
    pub bin_index: i32,
    pub count: u64,
    pub articles: Vec<Article>,
}

/// Result of one completed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToneChart {
    pub country: String,
    pub window: Window,
    pub bins: Vec<ToneBin>,
}

impl ToneChart {
    pub fn article_count(&self) -> usize {
        self.bins.iter().map(|b| b.articles.len()).sum()
    }
}
