//! # Insight
//!
//! Everything that computes something: the prize draw, dashboard numbers and AI summaries.
//!
//! ## Modules
//! - [`draw`]: weighted prize draw run after every survey submission
//! - [`trends`]: period windows, bucketed chart series and the growth formula
//! - [`scope`]: who sees which merchants
//! - [`dashboard`]: totals and deltas assembled per caller
//! - [`summary`]: prompt building and model selection over a [`summary::TextGenerator`]
//! - [`gemini`]: the hosted text-generation client
//!
//! Nothing here keeps state between calls. Reads go through [`records::Database`].
pub mod dashboard;
pub mod draw;
pub mod error;
pub mod gemini;
pub mod models;
pub mod scope;
pub mod summary;
pub mod trends;
pub mod utils;

pub use error::InsightError;
