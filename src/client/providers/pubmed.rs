//! PubMed E-utilities: `esearch` for PMIDs, then `efetch` XML in batches.

use super::traits::{ProviderError, ProviderResult, SourceConfig, SourceProvider, Termination};
use crate::client::{doi_url, join_authors, HttpFetcher, PaperRecord, RateLimiter, Source};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use roxmltree::{Document, Node};
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/";
const TOOL_NAME: &str = "litmine";
/// E-utilities refuse `retmax` above this for esearch
const ESEARCH_PAGE_SIZE: usize = 10_000;
const DEFAULT_RPS: f64 = 3.0;
const API_KEY_RPS: f64 = 10.0;

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    count: Option<String>,
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(rename = "ERROR", default)]
    error: Option<String>,
}

/// PubMed provider
pub struct PubMedProvider {
    fetcher: HttpFetcher,
    config: SourceConfig,
    base_url: String,
}

impl PubMedProvider {
    #[must_use]
    pub fn new(config: SourceConfig, fetcher: HttpFetcher) -> Self {
        Self {
            fetcher,
            config,
            base_url: EUTILS_BASE_URL.to_string(),
        }
    }

    /// Point the provider at another E-utilities host
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    fn endpoint(&self, name: &str) -> Result<Url, ProviderError> {
        Url::parse(&self.base_url)
            .and_then(|base| base.join(name))
            .map_err(|e| ProviderError::InvalidQuery(format!("bad E-utilities URL: {e}")))
    }

    fn requests_per_second(&self) -> f64 {
        if self.config.api_key.is_some() {
            API_KEY_RPS
        } else {
            DEFAULT_RPS
        }
    }

    /// `tool`, `email` and `api_key` sent with every request
    fn identity_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("tool", TOOL_NAME.to_string())];
        if let Some(email) = &self.config.contact_email {
            params.push(("email", email.clone()));
        }
        if let Some(api_key) = &self.config.api_key {
            params.push(("api_key", api_key.clone()));
        }
        params
    }

    async fn esearch(&self, retstart: usize, retmax: usize) -> Result<ESearchResult, ProviderError> {
        let url = self.endpoint("esearch.fcgi")?;
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("term", self.config.query.clone()),
            ("retmode", "json".to_string()),
            ("datetype", "pdat".to_string()),
            ("mindate", self.config.year_start.to_string()),
            ("maxdate", self.config.year_end.to_string()),
            ("retstart", retstart.to_string()),
            ("retmax", retmax.to_string()),
        ];
        params.extend(self.identity_params());

        let response = self
            .fetcher
            .get(url.as_str(), &HeaderMap::new(), &params)
            .await?;
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to read response: {e}")))?;

        let parsed: ESearchResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Parse(format!("Failed to parse esearch JSON: {e}")))?;

        match parsed.esearchresult.error {
            Some(error) if parsed.esearchresult.idlist.is_empty() => {
                Err(ProviderError::InvalidQuery(error))
            }
            _ => Ok(parsed.esearchresult),
        }
    }

    async fn efetch(&self, ids: &[String]) -> Result<String, ProviderError> {
        let url = self.endpoint("efetch.fcgi")?;
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("id", ids.join(",")),
            ("retmode", "xml".to_string()),
            ("rettype", "abstract".to_string()),
        ];
        params.extend(self.identity_params());

        let response = self
            .fetcher
            .get(url.as_str(), &HeaderMap::new(), &params)
            .await?;
        response
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to read response: {e}")))
    }

    /// Page through esearch until every PMID (or the cap) is collected.
    ///
    /// Returns the ids gathered, the count PubMed reported and the error that
    /// cut paging short, if any.
    async fn collect_ids(
        &self,
        limiter: &mut RateLimiter,
    ) -> Result<(Vec<String>, Option<usize>, Option<ProviderError>), ProviderError> {
        let mut ids: Vec<String> = Vec::new();
        let mut total = None;

        loop {
            let retmax = if self.config.max_results > 0 {
                ESEARCH_PAGE_SIZE.min(self.config.max_results - ids.len())
            } else {
                ESEARCH_PAGE_SIZE
            };

            limiter.acquire().await;
            let page = match self.esearch(ids.len(), retmax).await {
                Ok(page) => page,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("PubMed esearch failed at retstart={}: {}", ids.len(), e);
                    return Ok((ids, total, Some(e)));
                }
            };

            if total.is_none() {
                total = page.count.as_deref().and_then(|c| c.trim().parse().ok());
                info!("PubMed reports {} matching articles", total.unwrap_or(0));
            }
            if page.idlist.is_empty() {
                break;
            }
            ids.extend(page.idlist);

            if self.config.limit_reached(ids.len()) || total.is_some_and(|t| ids.len() >= t) {
                break;
            }
        }

        Ok((ids, total, None))
    }
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn path<'a, 'input>(node: Node<'a, 'input>, names: &[&str]) -> Option<Node<'a, 'input>> {
    names.iter().try_fold(node, |current, name| child(current, name))
}

/// Concatenated text of a node, including inline markup such as `<i>`
fn text_of(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<String>()
        .trim()
        .to_string()
}

fn path_text(node: Node<'_, '_>, names: &[&str]) -> String {
    path(node, names).map(text_of).unwrap_or_default()
}

/// Parse one `PubmedArticle` element
fn parse_article(article: Node<'_, '_>) -> Result<PaperRecord, String> {
    let citation = child(article, "MedlineCitation").ok_or("missing MedlineCitation")?;
    let art = child(citation, "Article").ok_or("missing Article")?;

    let pmid = path_text(citation, &["PMID"]);

    let mut doi = art
        .children()
        .filter(|n| n.has_tag_name("ELocationID") && n.attribute("EIdType") == Some("doi"))
        .map(text_of)
        .last()
        .unwrap_or_default();

    let mut pmcid = String::new();
    if let Some(id_list) = path(article, &["PubmedData", "ArticleIdList"]) {
        for id in id_list.children().filter(|n| n.has_tag_name("ArticleId")) {
            match id.attribute("IdType") {
                Some("doi") => doi = text_of(id),
                Some("pmc") => pmcid = text_of(id),
                _ => {}
            }
        }
    }

    let abstract_text = child(art, "Abstract")
        .map(|abs| {
            abs.children()
                .filter(|n| n.has_tag_name("AbstractText"))
                .map(text_of)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    let pub_date = path(art, &["Journal", "JournalIssue", "PubDate"]);
    let year = pub_date
        .map(|date| {
            let year = path_text(date, &["Year"]);
            if year.is_empty() {
                path_text(date, &["MedlineDate"]).chars().take(4).collect()
            } else {
                year
            }
        })
        .unwrap_or_default();

    let authors = child(art, "AuthorList")
        .map(|list| {
            join_authors(
                list.children()
                    .filter(|n| n.has_tag_name("Author"))
                    .filter_map(|author| {
                        let fore = path_text(author, &["ForeName"]);
                        let last = path_text(author, &["LastName"]);
                        (!fore.is_empty() && !last.is_empty()).then(|| format!("{fore} {last}"))
                    }),
            )
        })
        .unwrap_or_default();

    let url_fulltext = if !pmid.is_empty() {
        format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/")
    } else if !doi.is_empty() {
        doi_url(&doi)
    } else {
        String::new()
    };

    Ok(PaperRecord {
        id: pmid,
        pmcid,
        doi,
        title: path_text(art, &["ArticleTitle"]),
        abstract_text,
        journal: path_text(art, &["Journal", "Title"]),
        year,
        authors,
        url_fulltext,
        source: Source::PubMed,
    })
}

/// Parse an efetch `PubmedArticleSet` document.
///
/// Articles that cannot be parsed are logged and skipped; only a malformed
/// document is an error.
pub fn parse_efetch(xml: &str) -> Result<Vec<PaperRecord>, ProviderError> {
    let doc = Document::parse(xml)
        .map_err(|e| ProviderError::Parse(format!("Failed to parse efetch XML: {e}")))?;

    let mut records = Vec::new();
    for article in doc
        .descendants()
        .filter(|n| n.has_tag_name("PubmedArticle"))
    {
        match parse_article(article) {
            Ok(record) => records.push(record),
            Err(reason) => warn!("Skipping PubMed article: {}", reason),
        }
    }
    Ok(records)
}

#[async_trait]
impl SourceProvider for PubMedProvider {
    fn name(&self) -> &str {
        "pubmed"
    }

    fn source(&self) -> Source {
        Source::PubMed
    }

    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn search(&self) -> Result<ProviderResult, ProviderError> {
        let start_time = Instant::now();
        info!(
            "Searching PubMed for: {} ({}-{})",
            self.config.query, self.config.year_start, self.config.year_end
        );

        let mut limiter = RateLimiter::new(self.requests_per_second());
        let (ids, total_available, search_error) = self.collect_ids(&mut limiter).await?;
        let limited = self.config.limit_reached(ids.len());

        let mut records = Vec::with_capacity(ids.len());
        let mut pages_fetched = 0;
        let mut fetch_error = None;

        for batch in ids.chunks(self.config.page_size.max(1)) {
            limiter.acquire().await;
            debug!("PubMed efetch batch of {} ids", batch.len());

            let parsed = match self.efetch(batch).await {
                Ok(xml) => parse_efetch(&xml),
                Err(e) => Err(e),
            };
            let batch_records = match parsed {
                Ok(batch_records) => batch_records,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("PubMed efetch failed: {}", e);
                    fetch_error = Some(e);
                    break;
                }
            };
            pages_fetched += 1;

            for mut record in batch_records {
                record.ensure_id(records.len());
                records.push(record);
            }
        }

        let termination = match fetch_error.or(search_error) {
            Some(e) => Termination::Aborted(e),
            None if limited => Termination::LimitReached,
            None => Termination::Exhausted,
        };

        let search_time = start_time.elapsed();
        info!(
            "PubMed search completed: {} records from {} batches in {:?}",
            records.len(),
            pages_fetched,
            search_time
        );

        Ok(ProviderResult {
            records,
            source: Source::PubMed,
            total_available,
            pages_fetched,
            search_time,
            termination,
        })
    }
}
