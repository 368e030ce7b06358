//! Home media catalog statistics - shared modules for the CLI.
//!
//! Pipeline: [`load`] raw tables, [`catalog::Catalog::build`] them
//! (normalize, link summaries, group series), then open an
//! [`session::AnalysisSession`] that owns the filter, the genre exclusions
//! and every aggregate computed for them.

pub mod aggregate;
pub mod catalog;
pub mod cooccurrence;
pub mod drilldown;
pub mod export;
pub mod filter;
pub mod link;
pub mod load;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod safety;
pub mod series;
pub mod session;

#[cfg(test)]
mod fixtures;
