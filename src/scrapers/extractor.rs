//! Readable-text extraction from article markup.
//!
//! [`extract`] is a pure function. The body comes from the first matcher in
//! [`BODY_MATCHERS`] that yields text:
//!
//! 1. an `article`/`main` element (or the equivalent ARIA role)
//! 2. a `div` carrying a well-known content class, in [`CONTENT_CLASSES`] order
//! 3. the `p`/`div`/`section` with the longest text in the document
//!
//! [`ExtractorPool`] runs extraction on a rayon pool so parsing never competes
//! with the async runtime's I/O threads.

use crate::error::{HarvestError, Result};
use crate::models::Article;
use once_cell::sync::Lazy;
use rayon::{ThreadPool, ThreadPoolBuilder};
use scraper::{ElementRef, Html, Selector};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

/// Class names of common CMS article containers.
pub const CONTENT_CLASSES: [&str; 5] = [
    "article-body",
    "post-content",
    "entry-content",
    "story-body",
    "blog-post",
];

/// Elements whose text is never part of the readable content.
const NON_CONTENT_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

static SEMANTIC: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"article, main, [role="article"], [role="main"]"#)
        .expect("static semantic selector")
});
static CONTENT_CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    CONTENT_CLASSES
        .iter()
        .map(|class| Selector::parse(&format!("div.{class}")).expect("static class selector"))
        .collect()
});
static BLOCKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p, div, section").expect("static block selector"));
static TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("static title selector"));
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("static h1 selector"));

type BodyMatcher = fn(&Html) -> Option<String>;

/// Body matchers in priority order.
const BODY_MATCHERS: [BodyMatcher; 3] =
    [semantic_container, content_class_container, largest_block];

/// Title and body of one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub title: String,
    pub body: String,
}

/// Extract `(title, body)` from raw markup.
///
/// # Errors
///
/// [`HarvestError::NoContent`] when no matcher finds any text.
pub fn extract(html: &str) -> Result<Extracted> {
    let document = Html::parse_document(html);
    let body = BODY_MATCHERS
        .iter()
        .find_map(|matcher| matcher(&document))
        .ok_or(HarvestError::NoContent)?;
    Ok(Extracted {
        title: extract_title(&document),
        body,
    })
}

/// Document `<title>`, replaced by the first `<h1>` when that is longer.
pub fn extract_title(document: &Html) -> String {
    let title = document
        .select(&TITLE)
        .next()
        .map(|el| element_text(el, " "))
        .unwrap_or_default();
    match document.select(&H1).next().map(|el| element_text(el, " ")) {
        Some(h1) if h1.chars().count() > title.chars().count() => h1,
        _ => title,
    }
}

/// Trimmed, non-empty text nodes joined by `separator`, leaving out the
/// contents of scripts, stylesheets and other non-rendered elements.
fn element_text(element: ElementRef<'_>, separator: &str) -> String {
    element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != element.id())
                .filter_map(|ancestor| ancestor.value().as_element())
                .any(|el| NON_CONTENT_ELEMENTS.contains(&el.name()));
            (!hidden).then(|| text.trim())
        })
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

fn semantic_container(document: &Html) -> Option<String> {
    document
        .select(&SEMANTIC)
        .find_map(|el| non_empty(element_text(el, "\n")))
}

fn content_class_container(document: &Html) -> Option<String> {
    CONTENT_CONTAINERS.iter().find_map(|selector| {
        document
            .select(selector)
            .find_map(|el| non_empty(element_text(el, "\n")))
    })
}

fn largest_block(document: &Html) -> Option<String> {
    let mut largest: Option<(usize, String)> = None;
    for el in document.select(&BLOCKS) {
        let text = element_text(el, "\n");
        let len = text.chars().count();
        if len > largest.as_ref().map_or(0, |(l, _)| *l) {
            largest = Some((len, text));
        }
    }
    largest.map(|(_, text)| text)
}

/// Bounded CPU worker pool for [`extract`].
#[derive(Clone)]
pub struct ExtractorPool {
    pool: Arc<ThreadPool>,
}

impl ExtractorPool {
    /// Build a pool of `threads` workers; `0` means one per CPU.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("extract-{i}"))
            .build()?;
        info!(threads = pool.current_num_threads(), "Extractor pool ready");
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Extract every fetched article on the pool and wait for all of them.
    ///
    /// Each article's `raw_content` is consumed. Articles whose extraction
    /// fails are logged by URL and dropped. Output order is completion order.
    #[instrument(level = "info", skip_all, fields(articles = articles.len()))]
    pub async fn extract_all(&self, articles: Vec<Article>) -> Vec<Article> {
        let submitted = articles.len();
        let (tx, mut rx) = mpsc::unbounded_channel();

        for mut article in articles {
            let tx = tx.clone();
            self.pool.spawn(move || {
                let outcome = match article.raw_content.take() {
                    Some(html) => run_guarded(|| extract(&html)),
                    None => Err(HarvestError::NoContent),
                };
                let _ = tx.send((article, outcome));
            });
        }
        drop(tx);

        let mut extracted = Vec::with_capacity(submitted);
        while let Some((mut article, outcome)) = rx.recv().await {
            match outcome {
                Ok(Extracted { title, body }) => {
                    debug!(url = %article.url, chars = body.len(), "Extracted article");
                    article.extracted_title = non_empty(title);
                    article.extracted_body = Some(body);
                    extracted.push(article);
                }
                Err(e) => {
                    warn!(
                        url = %article.url,
                        tone_bin = article.tone_bin,
                        error = %e,
                        "Extraction failed; dropping"
                    );
                }
            }
        }

        info!(
            submitted,
            extracted = extracted.len(),
            dropped = submitted - extracted.len(),
            "Extracted article contents"
        );
        extracted
    }
}

/// Run one extraction job, turning a panic into [`HarvestError::ExtractionPanicked`].
fn run_guarded(job: impl FnOnce() -> Result<Extracted>) -> Result<Extracted> {
    panic::catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!(%message, "Extractor panicked");
        Err(HarvestError::ExtractionPanicked(message))
    })
}
