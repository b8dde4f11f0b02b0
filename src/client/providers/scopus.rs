//! Scopus Search API with offset pagination and a per-record abstract fallback.

use super::traits::{ProviderError, ProviderResult, SourceConfig, SourceProvider, Termination};
use crate::client::{doi_url, join_authors, HttpFetcher, PaperRecord, RateLimiter, Source};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const ELSEVIER_API_URL: &str = "https://api.elsevier.com";
const SEARCH_PATH: &str = "/content/search/scopus";
const ABSTRACT_PATH: &str = "/content/abstract/eid";
const API_KEY_HEADER: &str = "X-ELS-APIKey";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "search-results")]
    search_results: SearchResults,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(rename = "opensearch:totalResults", default, deserialize_with = "lenient_usize")]
    total_results: Option<usize>,
    #[serde(rename = "opensearch:startIndex", default, deserialize_with = "lenient_usize")]
    start_index: Option<usize>,
    #[serde(rename = "opensearch:itemsPerPage", default, deserialize_with = "lenient_usize")]
    items_per_page: Option<usize>,
    #[serde(default)]
    entry: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ScopusEntry {
    #[serde(default)]
    eid: Option<String>,
    #[serde(rename = "prism:doi", default)]
    doi: Option<String>,
    #[serde(rename = "dc:title", default)]
    title: Option<String>,
    #[serde(rename = "dc:description", default)]
    description: Option<String>,
    #[serde(rename = "prism:coverDate", default)]
    cover_date: Option<String>,
    #[serde(rename = "prism:publicationName", default)]
    publication_name: Option<String>,
    #[serde(rename = "dc:creator", default)]
    creator: Option<String>,
    #[serde(default)]
    author: Option<Vec<ScopusAuthor>>,
}

#[derive(Debug, Default, Deserialize)]
struct ScopusAuthor {
    #[serde(default)]
    authname: Option<String>,
    #[serde(default)]
    surname: Option<String>,
}

/// Scopus reports its opensearch counters as strings; accept numbers too.
fn lenient_usize<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Offset of the next page computed from the counters the API reported.
///
/// `None` when the offset would not advance.
#[must_use]
pub const fn next_start(start_index: usize, items_per_page: usize) -> Option<usize> {
    match start_index.checked_add(items_per_page) {
        Some(next) if next != start_index => Some(next),
        _ => None,
    }
}

/// Normalize a Scopus abstract: collapse whitespace, drop an `Abstract`
/// label and the publisher copyright notice.
#[must_use]
pub fn clean_abstract(text: &str) -> String {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    static LEADING_COPYRIGHT: OnceLock<Regex> = OnceLock::new();
    static TRAILING_COPYRIGHT: OnceLock<Regex> = OnceLock::new();

    let label = LABEL.get_or_init(|| Regex::new(r"(?i)^abstract\s*[:.]?\s+").expect("valid regex"));
    let leading = LEADING_COPYRIGHT
        .get_or_init(|| Regex::new(r"(?i)^(©|\(c\)|copyright)\s*\d{4}[^.]*\.\s*").expect("valid regex"));
    // A bare "(c) <year>" only counts as a notice when it is the final sentence
    let trailing = TRAILING_COPYRIGHT.get_or_init(|| {
        Regex::new(r"(?i)\s*(?:(?:©|copyright ©?)\s*\d{4}.*|\(c\)\s*\d{4}[^.]*\.?)$")
            .expect("valid regex")
    });

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let without_label = label.replace(&collapsed, "");
    let without_leading = leading.replace(&without_label, "");
    trailing.replace(&without_leading, "").trim().to_string()
}

/// Scopus provider
pub struct ScopusProvider {
    fetcher: HttpFetcher,
    config: SourceConfig,
    base_url: String,
    page_delay: Duration,
    abstract_timeout: Duration,
}

impl ScopusProvider {
    #[must_use]
    pub fn new(config: SourceConfig, fetcher: HttpFetcher) -> Self {
        Self {
            fetcher,
            config,
            base_url: ELSEVIER_API_URL.to_string(),
            page_delay: Duration::from_millis(300),
            abstract_timeout: Duration::from_secs(20),
        }
    }

    /// Point the provider at another Elsevier API host
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub const fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    #[must_use]
    pub const fn with_abstract_timeout(mut self, timeout: Duration) -> Self {
        self.abstract_timeout = timeout;
        self
    }

    /// Query with an inclusive publication year window
    fn build_query(&self) -> String {
        format!(
            "{} AND PUBYEAR > {} AND PUBYEAR < {}",
            self.config.query,
            self.config.year_start.saturating_sub(1),
            self.config.year_end.saturating_add(1)
        )
    }

    fn headers(&self, api_key: &str) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let key = HeaderValue::from_str(api_key)
            .map_err(|e| ProviderError::Auth(format!("API key is not a valid header value: {e}")))?;
        headers.insert(API_KEY_HEADER, key);
        Ok(headers)
    }

    async fn fetch_page(
        &self,
        headers: &HeaderMap,
        start: usize,
    ) -> Result<SearchResults, ProviderError> {
        let params = [
            ("query", self.build_query()),
            ("count", self.config.page_size.to_string()),
            ("start", start.to_string()),
            ("view", "STANDARD".to_string()),
        ];
        let url = format!("{}{SEARCH_PATH}", self.base_url);
        let response = self.fetcher.get(&url, headers, &params).await?;

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to read response: {e}")))?;

        let parsed: SearchResponse = serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(800).collect();
            warn!("Failed to parse Scopus response: {}", preview);
            ProviderError::Parse(format!("Failed to parse Scopus JSON: {e}"))
        })?;
        Ok(parsed.search_results)
    }

    /// Abstract from the dedicated retrieval endpoint; empty on any failure
    async fn fetch_abstract(&self, headers: &HeaderMap, eid: &str) -> String {
        let url = format!("{}{ABSTRACT_PATH}/{eid}", self.base_url);
        let response = match self
            .fetcher
            .get_with_timeout(&url, headers, &[], Some(self.abstract_timeout))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("Abstract fallback failed for {}: {}", eid, e);
                return String::new();
            }
        };

        match response.json::<serde_json::Value>().await {
            Ok(body) => clean_abstract(
                body["abstracts-retrieval-response"]["coredata"]["dc:description"]
                    .as_str()
                    .unwrap_or_default(),
            ),
            Err(e) => {
                debug!("Abstract fallback for {} returned invalid JSON: {}", eid, e);
                String::new()
            }
        }
    }

    async fn convert_entry(
        &self,
        entry: ScopusEntry,
        index: usize,
        headers: &HeaderMap,
        abstract_cache: &mut HashMap<String, String>,
    ) -> PaperRecord {
        let eid = entry.eid.unwrap_or_default();
        let doi = entry.doi.unwrap_or_default();

        let mut abstract_text = clean_abstract(entry.description.as_deref().unwrap_or_default());
        if abstract_text.is_empty() && !eid.is_empty() {
            abstract_text = match abstract_cache.get(&eid) {
                Some(cached) => cached.clone(),
                None => {
                    let fetched = self.fetch_abstract(headers, &eid).await;
                    abstract_cache.insert(eid.clone(), fetched.clone());
                    fetched
                }
            };
        }

        let authors = match entry.author {
            Some(authors) if !authors.is_empty() => join_authors(
                authors
                    .into_iter()
                    .filter_map(|a| a.authname.or(a.surname)),
            ),
            _ => join_authors(entry.creator),
        };

        let year = entry
            .cover_date
            .unwrap_or_default()
            .chars()
            .take(4)
            .collect();

        let id = if !eid.is_empty() {
            eid.clone()
        } else if !doi.is_empty() {
            doi.clone()
        } else {
            Source::Scopus.fallback_id(index)
        };

        let url_fulltext = if doi.is_empty() {
            format!("https://www.scopus.com/record/display.uri?eid={eid}")
        } else {
            doi_url(&doi)
        };

        PaperRecord {
            id,
            pmcid: String::new(),
            doi,
            title: entry.title.unwrap_or_default(),
            abstract_text,
            journal: entry.publication_name.unwrap_or_default(),
            year,
            authors,
            url_fulltext,
            source: Source::Scopus,
        }
    }
}

#[async_trait]
impl SourceProvider for ScopusProvider {
    fn name(&self) -> &str {
        "scopus"
    }

    fn source(&self) -> Source {
        Source::Scopus
    }

    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn search(&self) -> Result<ProviderResult, ProviderError> {
        let start_time = Instant::now();
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Auth("no Scopus API key configured".to_string()))?;
        let headers = self.headers(api_key)?;

        info!("Searching Scopus for: {}", self.build_query());

        let mut records = Vec::new();
        let mut abstract_cache = HashMap::new();
        let mut pacing = RateLimiter::with_interval(self.page_delay);
        let mut start = 0;
        let mut pages_fetched = 0;
        let mut total_available = None;

        let termination = 'pages: loop {
            pacing.acquire().await;
            info!("Scopus page {} (start={})", pages_fetched + 1, start);

            let page = match self.fetch_page(&headers, start).await {
                Ok(page) => page,
                Err(e) if e.is_fatal() => {
                    warn!("Scopus rejected the request, discarding results: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Scopus page failed (start={}): {}", start, e);
                    break Termination::Aborted(e);
                }
            };
            pages_fetched += 1;
            total_available = total_available.or(page.total_results);

            // An empty result set comes back as a single entry carrying `error`
            let entries: Vec<_> = page
                .entry
                .into_iter()
                .filter(|entry| entry.get("error").is_none())
                .collect();
            if entries.is_empty() {
                debug!("Scopus returned no entries, stopping");
                break Termination::Exhausted;
            }

            for raw in entries {
                match serde_json::from_value::<ScopusEntry>(raw) {
                    Ok(entry) => {
                        let record = self
                            .convert_entry(entry, records.len(), &headers, &mut abstract_cache)
                            .await;
                        records.push(record);
                    }
                    Err(e) => warn!("Skipping malformed Scopus entry: {}", e),
                }
                if self.config.limit_reached(records.len()) {
                    info!("Scopus max_results reached");
                    break 'pages Termination::LimitReached;
                }
            }

            let reported_start = page.start_index.unwrap_or(start);
            let per_page = page.items_per_page.unwrap_or(self.config.page_size);
            let Some(next) = next_start(reported_start, per_page) else {
                break Termination::Exhausted;
            };
            if total_available.is_some_and(|total| next >= total) {
                break Termination::Exhausted;
            }
            start = next;
        };

        let search_time = start_time.elapsed();
        info!(
            "Scopus search completed: {} records from {} pages in {:?}",
            records.len(),
            pages_fetched,
            search_time
        );

        Ok(ProviderResult {
            records,
            source: Source::Scopus,
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
    fn test_next_start_uses_reported_counters() {
        assert_eq!(next_start(0, 25), Some(25));
        assert_eq!(next_start(25, 25), Some(50));
        assert_eq!(next_start(40, 0), None);
    }

    #[test]
    fn test_next_start_overflow_does_not_advance() {
        assert_eq!(next_start(usize::MAX, 25), None);
        assert_eq!(next_start(usize::MAX - 1, 1), Some(usize::MAX));
    }

    #[test]
    fn test_counters_accept_strings_and_numbers() {
        let results: SearchResults = serde_json::from_str(
            r#"{"opensearch:totalResults": "120", "opensearch:startIndex": 0,
                "opensearch:itemsPerPage": "25", "entry": []}"#,
        )
        .unwrap();
        assert_eq!(results.total_results, Some(120));
        assert_eq!(results.start_index, Some(0));
        assert_eq!(results.items_per_page, Some(25));
    }

    #[test]
    fn test_clean_abstract() {
        assert_eq!(
            clean_abstract("  Abstract:  Clarithromycin\n resistance was   high. © 2021 Elsevier B.V. All rights reserved."),
            "Clarithromycin resistance was high."
        );
        assert_eq!(
            clean_abstract("© 2020 The Authors. Background: eradication failed."),
            "Background: eradication failed."
        );
        assert_eq!(clean_abstract(""), "");
    }

    #[test]
    fn test_clean_abstract_keeps_enumerated_items() {
        let text = "Three arms were compared: (a) triple therapy, (b) quadruple therapy and \
                    (c) 2021 guideline regimen. Resistance was 30%.";
        assert_eq!(clean_abstract(text), text);
        assert_eq!(
            clean_abstract("Resistance was 30%. (c) 2022 Elsevier Ltd."),
            "Resistance was 30%."
        );
    }

    #[test]
    fn test_entry_without_description_or_doi() {
        let entry: ScopusEntry = serde_json::from_str(
            r#"{"eid": "2-s2.0-1", "dc:title": "T", "prism:coverDate": "2022-03-01",
                "dc:creator": "Rojas M.", "author": null}"#,
        )
        .unwrap();
        assert_eq!(entry.eid.as_deref(), Some("2-s2.0-1"));
        assert!(entry.author.is_none());
        assert!(entry.description.is_none());
    }
}
