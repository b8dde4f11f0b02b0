//! Zero-shot topic classification.
//!
//! [`InferenceApiClassifier`] calls a hosted zero-shot model (Hugging Face
//! inference API request and response shape). [`KeywordClassifier`] scores
//! labels offline and is used when no endpoint is configured.

use crate::client::HttpFetcher;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Candidate topics, in tie-break order
pub const TOPIC_LABELS: [&str; 13] = [
    "antibiotic resistance surveillance",
    "antimicrobial susceptibility",
    "molecular mechanism of resistance",
    "genomic resistance",
    "clinical outcome",
    "treatment failure",
    "hpylori prevalence",
    "culture and isolation methods",
    "review",
    "systematic review",
    "revisión sistemática",
    "meta-analysis",
    "meta análisis",
];

/// Score distribution over candidate labels, highest first
#[derive(Debug, Clone, PartialEq)]
pub struct TopicScores {
    pub labels: Vec<String>,
    pub scores: Vec<f64>,
}

impl TopicScores {
    /// Pair labels with scores and sort descending; equal scores keep input order
    #[must_use]
    pub fn new(labels: Vec<String>, scores: Vec<f64>) -> Self {
        let mut pairs: Vec<(String, f64)> = labels.into_iter().zip(scores).collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        let (labels, scores) = pairs.into_iter().unzip();
        Self { labels, scores }
    }

    #[must_use]
    pub fn top_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    #[must_use]
    pub fn top_score(&self) -> Option<f64> {
        self.scores.first().copied()
    }

    /// `label=score` pairs, `"; "`-joined
    #[must_use]
    pub fn to_column(&self) -> String {
        self.labels
            .iter()
            .zip(&self.scores)
            .map(|(label, score)| format!("{label}={score:.4}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Assigns topic scores to a batch of texts
#[async_trait]
pub trait TopicClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// One [`TopicScores`] per input text, in input order
    async fn classify(&self, texts: &[String], labels: &[&str]) -> Result<Vec<TopicScores>>;
}

#[derive(Debug, Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a [String],
    parameters: ZeroShotParameters<'a>,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [&'a str],
    multi_label: bool,
}

#[derive(Debug, Deserialize)]
struct ZeroShotOutput {
    labels: Vec<String>,
    scores: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Batch(Vec<ZeroShotOutput>),
    Single(ZeroShotOutput),
}

/// Hosted zero-shot classifier
pub struct InferenceApiClassifier {
    fetcher: HttpFetcher,
    endpoint: String,
    api_token: Option<String>,
}

impl InferenceApiClassifier {
    #[must_use]
    pub fn new(fetcher: HttpFetcher, endpoint: impl Into<String>, api_token: Option<String>) -> Self {
        Self {
            fetcher,
            endpoint: endpoint.into(),
            api_token,
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.api_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                Error::InvalidInput {
                    field: "classifier.api_token".to_string(),
                    reason: e.to_string(),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

#[async_trait]
impl TopicClassifier for InferenceApiClassifier {
    fn name(&self) -> &str {
        "inference-api"
    }

    async fn classify(&self, texts: &[String], labels: &[&str]) -> Result<Vec<TopicScores>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = ZeroShotRequest {
            inputs: texts,
            parameters: ZeroShotParameters {
                candidate_labels: labels,
                multi_label: false,
            },
        };
        let response = self
            .fetcher
            .post_json(&self.endpoint, &self.headers()?, &request)
            .await?;
        let body = response.text().await?;

        let outputs = match serde_json::from_str::<ZeroShotResponse>(&body).map_err(|e| {
            Error::Classifier(format!("unexpected zero-shot response: {e}"))
        })? {
            ZeroShotResponse::Batch(outputs) => outputs,
            ZeroShotResponse::Single(output) => vec![output],
        };

        if outputs.len() != texts.len() {
            return Err(Error::Classifier(format!(
                "classifier returned {} results for {} inputs",
                outputs.len(),
                texts.len()
            )));
        }

        debug!("Classified batch of {}", texts.len());
        Ok(outputs
            .into_iter()
            .map(|output| TopicScores::new(output.labels, output.scores))
            .collect())
    }
}

/// Offline classifier scoring labels by keyword hits.
///
/// Hits are normalized to a distribution; a text with no hits gets a uniform
/// distribution, so the first label wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    /// Keywords signalling `label`; unknown labels match themselves
    fn keywords(label: &str) -> Vec<&str> {
        let keywords: &[&str] = match label {
            "antibiotic resistance surveillance" => &[
                "surveillance",
                "resistance rate",
                "prevalence of resistance",
                "trend",
                "monitoring",
            ],
            "antimicrobial susceptibility" => &[
                "susceptibility",
                "susceptible",
                "breakpoint",
                "e-test",
                "etest",
                "agar dilution",
            ],
            "molecular mechanism of resistance" => &[
                "mutation",
                "23s rrna",
                "a2143g",
                "a2142g",
                "gyra",
                "efflux",
                "mechanism",
            ],
            "genomic resistance" => &["genome", "genomic", "whole-genome", "sequencing", "wgs"],
            "clinical outcome" => &["outcome", "eradication rate", "cure rate", "adverse event"],
            "treatment failure" => &[
                "treatment failure",
                "failed",
                "refractory",
                "rescue therapy",
                "retreatment",
            ],
            "hpylori prevalence" => &["prevalence", "seroprevalence", "infection rate"],
            "culture and isolation methods" => &["culture", "isolation", "isolated", "biopsy"],
            _ => return vec![label],
        };
        keywords.to_vec()
    }

    fn score(text: &str, labels: &[&str]) -> TopicScores {
        let lowered = text.to_lowercase();
        let hits: Vec<usize> = labels
            .iter()
            .map(|label| {
                Self::keywords(label)
                    .iter()
                    .map(|keyword| lowered.matches(keyword).count())
                    .sum()
            })
            .collect();
        let total: usize = hits.iter().sum();

        let scores = if total == 0 {
            vec![1.0 / labels.len().max(1) as f64; labels.len()]
        } else {
            hits.iter().map(|&h| h as f64 / total as f64).collect()
        };

        TopicScores::new(labels.iter().map(|l| (*l).to_string()).collect(), scores)
    }
}

#[async_trait]
impl TopicClassifier for KeywordClassifier {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn classify(&self, texts: &[String], labels: &[&str]) -> Result<Vec<TopicScores>> {
        Ok(texts.iter().map(|text| Self::score(text, labels)).collect())
    }
}
