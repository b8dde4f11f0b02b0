//! Europe PMC REST search with cursor pagination.

use super::traits::{ProviderError, ProviderResult, SourceConfig, SourceProvider, Termination};
use crate::client::{doi_url, HttpFetcher, PaperRecord, Source};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, info, warn};

const EUROPE_PMC_SEARCH_URL: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest/search";
const INITIAL_CURSOR: &str = "*";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    hit_count: Option<usize>,
    next_cursor_mark: Option<String>,
    #[serde(default)]
    result_list: ResultList,
}

#[derive(Debug, Default, Deserialize)]
struct ResultList {
    #[serde(default)]
    result: Vec<serde_json::Value>,
}

/// Individual result; every field may be missing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResultItem {
    #[serde(default)]
    pmcid: Option<String>,
    #[serde(default)]
    doi: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    abstract_text: Option<String>,
    #[serde(default)]
    journal_title: Option<String>,
    #[serde(default)]
    pub_year: Option<String>,
    #[serde(default)]
    author_string: Option<String>,
}

/// Europe PMC provider
pub struct EuropePmcProvider {
    fetcher: HttpFetcher,
    config: SourceConfig,
    base_url: String,
}

impl EuropePmcProvider {
    #[must_use]
    pub fn new(config: SourceConfig, fetcher: HttpFetcher) -> Self {
        Self {
            fetcher,
            config,
            base_url: EUROPE_PMC_SEARCH_URL.to_string(),
        }
    }

    /// Point the provider at another search endpoint
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Query restricted to the configured publication years
    fn build_query(&self) -> String {
        format!(
            "({}) AND PUB_YEAR:[{} TO {}]",
            self.config.query, self.config.year_start, self.config.year_end
        )
    }

    fn page_params(&self, cursor: &str) -> Vec<(&'static str, String)> {
        vec![
            ("query", self.build_query()),
            ("format", "json".to_string()),
            ("pageSize", self.config.page_size.to_string()),
            ("cursorMark", cursor.to_string()),
        ]
    }

    async fn fetch_page(&self, cursor: &str) -> Result<SearchPage, ProviderError> {
        let response = self
            .fetcher
            .get(&self.base_url, &HeaderMap::new(), &self.page_params(cursor))
            .await?;

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to read response: {e}")))?;

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::Parse(format!("Failed to parse Europe PMC JSON: {e}")))
    }

    fn convert_result(item: SearchResultItem, index: usize) -> PaperRecord {
        let pmcid = item.pmcid.unwrap_or_default();
        let doi = item.doi.unwrap_or_default();

        let id = if !pmcid.is_empty() {
            pmcid.clone()
        } else if !doi.is_empty() {
            doi.clone()
        } else {
            Source::EuropePmc.fallback_id(index)
        };

        let url_fulltext = if !pmcid.is_empty() {
            format!("https://www.ncbi.nlm.nih.gov/pmc/articles/{pmcid}/")
        } else if !doi.is_empty() {
            doi_url(&doi)
        } else {
            String::new()
        };

        PaperRecord {
            id,
            pmcid,
            doi,
            title: item.title.unwrap_or_default(),
            abstract_text: item.abstract_text.unwrap_or_default(),
            journal: item.journal_title.unwrap_or_default(),
            year: item.pub_year.unwrap_or_default(),
            authors: item.author_string.unwrap_or_default(),
            url_fulltext,
            source: Source::EuropePmc,
        }
    }
}

/// Cursor for the next page, or `None` when pagination must stop.
///
/// Stops on a missing or empty cursor and on a cursor equal to the current
/// one, which Europe PMC returns on the last page.
#[must_use]
pub fn next_cursor(current: &str, next: Option<&str>) -> Option<String> {
    match next {
        Some(next) if !next.is_empty() && next != current => Some(next.to_string()),
        _ => None,
    }
}

#[async_trait]
impl SourceProvider for EuropePmcProvider {
    fn name(&self) -> &str {
        "europe_pmc"
    }

    fn source(&self) -> Source {
        Source::EuropePmc
    }

    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn search(&self) -> Result<ProviderResult, ProviderError> {
        let start_time = Instant::now();
        info!("Searching Europe PMC for: {}", self.build_query());

        let mut records = Vec::new();
        let mut cursor = INITIAL_CURSOR.to_string();
        let mut pages_fetched = 0;
        let mut total_available = None;

        let termination = 'pages: loop {
            let page = match self.fetch_page(&cursor).await {
                Ok(page) => page,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Europe PMC page failed (cursor {}): {}", cursor, e);
                    break Termination::Aborted(e);
                }
            };
            pages_fetched += 1;
            total_available = total_available.or(page.hit_count);

            if page.result_list.result.is_empty() {
                break Termination::Exhausted;
            }

            debug!(
                "Europe PMC page {} returned {} results",
                pages_fetched,
                page.result_list.result.len()
            );

            for raw in page.result_list.result {
                match serde_json::from_value::<SearchResultItem>(raw) {
                    Ok(item) => records.push(Self::convert_result(item, records.len())),
                    Err(e) => warn!("Skipping malformed Europe PMC result: {}", e),
                }
                if self.config.limit_reached(records.len()) {
                    break 'pages Termination::LimitReached;
                }
            }

            match next_cursor(&cursor, page.next_cursor_mark.as_deref()) {
                Some(next) => cursor = next,
                None => break Termination::Exhausted,
            }
        };

        let search_time = start_time.elapsed();
        info!(
            "Europe PMC search completed: {} records from {} pages in {:?}",
            records.len(),
            pages_fetched,
            search_time
        );

        Ok(ProviderResult {
            records,
            source: Source::EuropePmc,
            total_available,
            pages_fetched,
            search_time,
            termination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_cursor_stops_on_repeat() {
        assert_eq!(next_cursor("*", Some("AoE123")), Some("AoE123".to_string()));
        assert_eq!(next_cursor("AoE123", Some("AoE123")), None);
        assert_eq!(next_cursor("AoE123", Some("")), None);
        assert_eq!(next_cursor("AoE123", None), None);
    }

    #[test]
    fn test_convert_prefers_pmcid() {
        let item = SearchResultItem {
            pmcid: Some("PMC123".to_string()),
            doi: Some("10.1/x".to_string()),
            title: Some("Resistance in Chile".to_string()),
            ..SearchResultItem::default()
        };
        let record = EuropePmcProvider::convert_result(item, 0);
        assert_eq!(record.id, "PMC123");
        assert_eq!(
            record.url_fulltext,
            "https://www.ncbi.nlm.nih.gov/pmc/articles/PMC123/"
        );
        assert_eq!(record.source, Source::EuropePmc);
    }

    #[test]
    fn test_convert_falls_back_to_doi_then_index() {
        let item = SearchResultItem {
            doi: Some("10.1/x".to_string()),
            ..SearchResultItem::default()
        };
        let record = EuropePmcProvider::convert_result(item, 4);
        assert_eq!(record.id, "10.1/x");
        assert_eq!(record.url_fulltext, "https://doi.org/10.1/x");

        let record = EuropePmcProvider::convert_result(SearchResultItem::default(), 4);
        assert_eq!(record.id, "pmc_4");
        assert!(record.url_fulltext.is_empty());
    }
}
