//! # litmine
//!
//! Literature mining for biomedical research in two stages: collect records
//! from PubMed, Europe PMC and Scopus into one table, then clean, filter and
//! enrich them with country, topic and laboratory signals.

pub mod client;
pub mod config;
pub mod error;
pub mod mining;
pub mod resilience;

pub use client::{PaperRecord, Source};
pub use config::Config;
pub use error::{Error, Result};
pub use mining::{Collector, EnrichedRecord, Enricher};
pub use resilience::{RetryConfig, RetryPolicy};
