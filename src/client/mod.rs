pub mod http;
pub mod providers;
pub mod rate_limiter;

pub use http::HttpFetcher;
pub use rate_limiter::RateLimiter;

use crate::Config;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client configuration for the bibliographic APIs
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout duration
    pub timeout: Duration,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("litmine/{} (Literature Mining Tool)", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl From<&Config> for HttpClientConfig {
    fn from(config: &Config) -> Self {
        Self {
            timeout: config.request_timeout(),
            user_agent: config.http.user_agent.clone(),
            ..Self::default()
        }
    }
}

/// Origin adapter of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    PubMed,
    #[serde(rename = "PMC")]
    EuropePmc,
    Scopus,
}

impl Source {
    /// Tag written to the `source` column
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PubMed => "PubMed",
            Self::EuropePmc => "PMC",
            Self::Scopus => "Scopus",
        }
    }

    /// Prefix of generated identifiers for records without a natural one
    #[must_use]
    pub const fn fallback_prefix(self) -> &'static str {
        match self {
            Self::PubMed => "pubmed",
            Self::EuropePmc => "pmc",
            Self::Scopus => "scopus",
        }
    }

    /// Fallback identifier for the record at `index` of this source's collection
    #[must_use]
    pub fn fallback_id(self, index: usize) -> String {
        format!("{}_{index}", self.fallback_prefix())
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

/// One paper as collected from a bibliographic source.
///
/// Field order is the column order of the collection CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// PMID, PMCID, DOI, Scopus EID or a generated `<source>_<n>` id
    pub id: String,
    #[serde(default)]
    pub pmcid: String,
    #[serde(default)]
    pub doi: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub journal: String,
    #[serde(default)]
    pub year: String,
    /// `"; "`-joined display names
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub url_fulltext: String,
    pub source: Source,
}

impl PaperRecord {
    /// Column names of the collection CSV
    pub const COLUMNS: [&'static str; 10] = [
        "id",
        "pmcid",
        "doi",
        "title",
        "abstract",
        "journal",
        "year",
        "authors",
        "url_fulltext",
        "source",
    ];

    /// Create an empty record for `source` with the given identifier
    #[must_use]
    pub fn new(id: impl Into<String>, source: Source) -> Self {
        Self {
            id: id.into(),
            pmcid: String::new(),
            doi: String::new(),
            title: String::new(),
            abstract_text: String::new(),
            journal: String::new(),
            year: String::new(),
            authors: String::new(),
            url_fulltext: String::new(),
            source,
        }
    }

    /// Give the record a generated identifier when it has none
    pub fn ensure_id(&mut self, index: usize) {
        if self.id.trim().is_empty() {
            self.id = self.source.fallback_id(index);
        }
    }
}

/// `https://doi.org/<doi>`
#[must_use]
pub fn doi_url(doi: &str) -> String {
    format!("https://doi.org/{}", doi.trim())
}

/// Join author display names, skipping blanks
#[must_use]
pub fn join_authors<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| name.as_ref().trim().to_string())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_ids() {
        assert_eq!(Source::EuropePmc.fallback_id(3), "pmc_3");
        assert_eq!(Source::Scopus.fallback_id(0), "scopus_0");

        let mut record = PaperRecord::new("", Source::PubMed);
        record.ensure_id(7);
        assert_eq!(record.id, "pubmed_7");

        let mut record = PaperRecord::new("12345", Source::PubMed);
        record.ensure_id(7);
        assert_eq!(record.id, "12345");
    }

    #[test]
    fn test_join_authors_skips_blanks() {
        let joined = join_authors(["Ana Pérez", " ", "John Smith"]);
        assert_eq!(joined, "Ana Pérez; John Smith");
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(Source::EuropePmc.to_string(), "PMC");
        let json = serde_json::to_string(&Source::EuropePmc).unwrap();
        assert_eq!(json, "\"PMC\"");
    }
}
