//! Stage 1: run every enabled source in turn and merge their records.

use crate::client::providers::{
    EuropePmcProvider, ProviderError, PubMedProvider, ScopusProvider, SourceProvider, Termination,
};
use crate::client::{HttpFetcher, PaperRecord, Source};
use crate::{Config, Result};
use std::time::Duration;
use tracing::{info, warn};

/// How one source fared during collection
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub source: Source,
    pub records: usize,
    pub pages_fetched: usize,
    pub elapsed: Duration,
    /// `None` when the source failed fatally and contributed nothing
    pub termination: Option<Termination>,
    pub error: Option<ProviderError>,
}

impl SourceOutcome {
    /// True when the source delivered everything it was asked for
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(
            self.termination,
            Some(Termination::Exhausted | Termination::LimitReached)
        )
    }
}

/// Merged stage-1 table plus a per-source report
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub records: Vec<PaperRecord>,
    pub outcomes: Vec<SourceOutcome>,
}

/// Runs providers sequentially and concatenates their output in order
#[derive(Default)]
pub struct Collector {
    providers: Vec<Box<dyn SourceProvider>>,
}

impl Collector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Box<dyn SourceProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Enabled sources in PubMed, Europe PMC, Scopus order.
    ///
    /// Scopus is skipped with a warning when no API key is configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut collector = Self::new();

        if config.pubmed.enabled {
            let fetcher = HttpFetcher::from_config("pubmed", config, config.pubmed.max_attempts)?;
            collector = collector.with_provider(Box::new(PubMedProvider::new(
                config.pubmed_source(),
                fetcher,
            )));
        }

        if config.europe_pmc.enabled {
            let fetcher =
                HttpFetcher::from_config("europe_pmc", config, config.europe_pmc.max_attempts)?;
            collector = collector.with_provider(Box::new(EuropePmcProvider::new(
                config.europe_pmc_source(),
                fetcher,
            )));
        }

        if config.scopus.enabled {
            let source = config.scopus_source();
            if source.api_key.is_some() {
                let fetcher = HttpFetcher::from_config("scopus", config, config.scopus.max_attempts)?;
                collector = collector.with_provider(Box::new(
                    ScopusProvider::new(source, fetcher)
                        .with_page_delay(Duration::from_millis(config.scopus.page_delay_ms))
                        .with_abstract_timeout(Duration::from_secs(
                            config.scopus.abstract_timeout_secs,
                        )),
                ));
            } else {
                warn!("No Scopus API key configured, skipping Scopus");
            }
        }

        Ok(collector)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Collect from every provider; a failing source never stops the others
    pub async fn collect(&self) -> Collection {
        let mut collection = Collection::default();

        for provider in &self.providers {
            info!("Collecting from {}", provider.source());

            match provider.search().await {
                Ok(result) => {
                    if let Termination::Aborted(e) = &result.termination {
                        warn!(
                            "{} stopped early, keeping {} records: {}",
                            result.source,
                            result.records.len(),
                            e
                        );
                    }
                    info!("{}: {} records", result.source, result.records.len());

                    collection.outcomes.push(SourceOutcome {
                        source: result.source,
                        records: result.records.len(),
                        pages_fetched: result.pages_fetched,
                        elapsed: result.search_time,
                        termination: Some(result.termination),
                        error: None,
                    });
                    collection.records.extend(result.records);
                }
                Err(e) => {
                    warn!("{} failed, no records kept: {}", provider.source(), e);
                    collection.outcomes.push(SourceOutcome {
                        source: provider.source(),
                        records: 0,
                        pages_fetched: 0,
                        elapsed: Duration::ZERO,
                        termination: None,
                        error: Some(e),
                    });
                }
            }
        }

        info!("Collected {} records in total", collection.records.len());
        collection
    }
}
