//! GDELT DOC 2.0 API access.
//!
//! # Submodules
//!
//! - [`client`]: query building and the per-task tone chart request
//! - [`sanitize`]: textual repair of malformed responses
//! - [`wire`]: decoding of the `tonechart` response into tone buckets

pub mod client;
pub mod sanitize;
pub mod wire;

pub use client::HistogramClient;
