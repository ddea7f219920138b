//! Article content retrieval and text extraction.
//!
//! The two stages run on separate pools so network-bound and CPU-bound work
//! never compete:
//!
//! | Stage | Module | Concurrency |
//! |-------|--------|-------------|
//! | Fetch | [`fetcher`] | async, `fetch_concurrency` requests in flight |
//! | Extract | [`extractor`] | rayon pool, `extract_threads` workers |
//!
//! Failures in either stage drop only the affected article.

pub mod extractor;
pub mod fetcher;

pub use extractor::ExtractorPool;
pub use fetcher::ContentFetcher;
