//! Encoding of a [`ToneChart`] as one output line.
//!
//! ```json
//! {"source_country":"US","start_datetime":"20170101000000","end_datetime":"20170101010000",
//!  "tonechart":[{"bin":-3,"count":12,"top_articles":[{"url":"…","title":"…","tone":-3,…}]}]}
//! ```
//!
//! `None`, empty strings and empty lists are left out of the record.

use crate::error::{HarvestError, Result};
use crate::models::{Article, ToneBin, ToneChart};
use crate::utils::gdelt_timestamp;
use serde::Serialize;

/// `seendate` layout used by the DOC API.
const SEEN_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

#[derive(Debug, Serialize)]
struct ChartRecord<'a> {
    source_country: &'a str,
    start_datetime: String,
    end_datetime: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tonechart: Vec<BinRecord<'a>>,
}

#[derive(Debug, Serialize)]
struct BinRecord<'a> {
    bin: i32,
    count: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    top_articles: Vec<ArticleRecord<'a>>,
}

#[derive(Debug, Serialize)]
struct ArticleRecord<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seendate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sourcecountry: Option<&'a str>,
    tone: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    html_title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    html_body: Option<&'a str>,
}

fn present(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

fn present_opt(s: &Option<String>) -> Option<&str> {
    s.as_deref().and_then(present)
}

impl<'a> From<&'a Article> for ArticleRecord<'a> {
    fn from(a: &'a Article) -> Self {
        Self {
            url: present(&a.url),
            title: present(&a.title),
            seendate: a.seen_date.map(|d| d.format(SEEN_DATE_FORMAT).to_string()),
            domain: present_opt(&a.domain),
            language: present_opt(&a.language),
            sourcecountry: present_opt(&a.source_country),
            tone: a.tone_bin,
            html_title: present_opt(&a.extracted_title),
            html_body: present_opt(&a.extracted_body),
        }
    }
}

impl<'a> From<&'a ToneBin> for BinRecord<'a> {
    fn from(b: &'a ToneBin) -> Self {
        Self {
            bin: b.bin_index,
            count: b.count,
            top_articles: b.articles.iter().map(ArticleRecord::from).collect(),
        }
    }
}

/// Encode a chart as a single newline-terminated JSON line.
pub fn encode_line(chart: &ToneChart) -> Result<String> {
    let record = ChartRecord {
        source_country: &chart.country,
        start_datetime: gdelt_timestamp(&chart.window.start),
        end_datetime: gdelt_timestamp(&chart.window.end),
        tonechart: chart.bins.iter().map(BinRecord::from).collect(),
    };
    let mut line = serde_json::to_string(&record).map_err(HarvestError::Encode)?;
    line.push('\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Window;
    use chrono::NaiveDate;
    use serde_json::Value;

    fn chart(bins: Vec<ToneBin>) -> ToneChart {
        let start = NaiveDate::from_ymd_opt(2017, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        ToneChart {
            country: "US".to_string(),
            window: Window {
                start,
                end: start + chrono::TimeDelta::hours(1),
            },
            bins,
        }
    }

    #[test]
    fn test_encode_single_line() {
        let line = encode_line(&chart(vec![])).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);

        let v: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(v["source_country"], "US");
        assert_eq!(v["start_datetime"], "20170101000000");
        assert_eq!(v["end_datetime"], "20170101010000");
        assert!(v.get("tonechart").is_none());
    }

    #[test]
    fn test_encode_omits_empty_fields() {
        let article = Article {
            url: "https://a.example/1".to_string(),
            title: String::new(),
            domain: Some("a.example".to_string()),
            source_country: Some("US".to_string()),
            tone_bin: -4,
            extracted_title: None,
            extracted_body: Some("line one\nline two".to_string()),
            raw_content: Some("<html>should never be written</html>".to_string()),
            ..Default::default()
        };
        let bins = vec![
            ToneBin {
                bin_index: -4,
                count: 12,
                articles: vec![article],
            },
            ToneBin {
                bin_index: 2,
                count: 3,
                articles: vec![],
            },
        ];
        let line = encode_line(&chart(bins)).unwrap();
        let v: Value = serde_json::from_str(line.trim_end()).unwrap();

        let first = &v["tonechart"][0];
        assert_eq!(first["bin"], -4);
        assert_eq!(first["count"], 12);
        let a = &first["top_articles"][0];
        assert_eq!(a["url"], "https://a.example/1");
        assert_eq!(a["tone"], -4);
        assert_eq!(a["sourcecountry"], "US");
        assert_eq!(a["html_body"], "line one\nline two");
        assert!(a.get("title").is_none());
        assert!(a.get("html_title").is_none());
        assert!(a.get("seendate").is_none());
        assert!(a.get("language").is_none());
        assert!(!line.contains("should never be written"));

        assert_eq!(v["tonechart"][1]["count"], 3);
        assert!(v["tonechart"][1].get("top_articles").is_none());
    }

    #[test]
    fn test_encode_seen_date() {
        let seen = NaiveDate::from_ymd_opt(2017, 1, 1)
            .unwrap()
            .and_hms_opt(0, 15, 0)
            .unwrap();
        let bins = vec![ToneBin {
            bin_index: 0,
            count: 1,
            articles: vec![Article {
                url: "https://a/1".to_string(),
                seen_date: Some(seen),
                ..Default::default()
            }],
        }];
        let line = encode_line(&chart(bins)).unwrap();
        assert!(line.contains(r#""seendate":"20170101T001500Z""#));
    }
}
