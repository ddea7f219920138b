//! Article content fetcher.
//!
//! One GET per article, bounded by a per-request timeout. Responses without a
//! declared charset are decoded with a guessed encoding. Failed fetches are
//! logged and dropped; there is no retry.

use crate::error::Result;
use crate::models::Article;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Bytes of the document searched for a `<meta>` charset declaration.
const META_SNIFF_LIMIT: usize = 4096;

static META_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([A-Za-z0-9_:.\-]+)"#)
        .expect("static charset regex")
});

#[derive(Debug, Clone)]
pub struct ContentFetcher {
    http: Client,
    timeout: Duration,
    concurrency: usize,
}

impl ContentFetcher {
    pub fn new(http: Client, timeout: Duration, concurrency: usize) -> Self {
        Self {
            http,
            timeout,
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch every article concurrently, at most `concurrency` at a time.
    ///
    /// Returns the articles whose fetch succeeded, with `raw_content` set, in
    /// completion order.
    #[instrument(level = "info", skip_all, fields(articles = articles.len()))]
    pub async fn fetch_all(&self, articles: Vec<Article>) -> Vec<Article> {
        let submitted = articles.len();
        let fetched: Vec<Article> = stream::iter(articles)
            .map(|article| self.fetch_one(article))
            .buffer_unordered(self.concurrency)
            .filter_map(std::future::ready)
            .collect()
            .await;

        info!(
            submitted,
            fetched = fetched.len(),
            dropped = submitted - fetched.len(),
            "Fetched article contents"
        );
        fetched
    }

    async fn fetch_one(&self, mut article: Article) -> Option<Article> {
        match self.fetch_html(&article.url).await {
            Ok(html) => {
                debug!(url = %article.url, bytes = html.len(), "Fetched article");
                article.raw_content = Some(html);
                Some(article)
            }
            Err(e) => {
                warn!(
                    url = %article.url,
                    tone_bin = article.tone_bin,
                    error = %e,
                    "Article fetch failed; dropping"
                );
                None
            }
        }
    }

    /// GET `url` and decode the body as text.
    pub async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type)
            .and_then(|label| Encoding::for_label(label.as_bytes()));

        let bytes = response.bytes().await?;
        let encoding = declared.unwrap_or_else(|| guess_encoding(&bytes));
        let (text, _, had_errors) = encoding.decode(&bytes);
        if had_errors {
            debug!(%url, encoding = encoding.name(), "Replaced undecodable bytes");
        }
        Ok(text.into_owned())
    }
}

/// The `charset` parameter of a `Content-Type` header value, if any.
fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(|c| c == '"' || c == '\''))
    })
}

/// Guess the encoding of an undeclared document.
///
/// Order: byte-order mark, `<meta>` declaration, UTF-8 validity, then
/// windows-1252.
pub fn guess_encoding(bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }

    let head = &bytes[..bytes.len().min(META_SNIFF_LIMIT)];
    let from_meta = META_CHARSET
        .captures(head)
        .and_then(|caps| caps.get(1))
        .and_then(|m| Encoding::for_label(m.as_bytes()));
    if let Some(encoding) = from_meta {
        return encoding;
    }

    if std::str::from_utf8(bytes).is_ok() {
        UTF_8
    } else {
        WINDOWS_1252
    }
}
