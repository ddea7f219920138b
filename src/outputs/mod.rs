//! Output of completed tone charts.
//!
//! # Submodules
//!
//! - [`json`]: derives the per-country/per-month path and appends records
//! - [`locks`]: process-wide per-path lock registry used by the writer
//! - [`record`]: encodes a [`crate::models::ToneChart`] as one JSON line

pub mod json;
pub mod locks;
pub mod record;

pub use json::ChartWriter;
