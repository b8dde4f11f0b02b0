//! Stage 2: normalization, filtering and enrichment of collected records,
//! plus the collection driver and CSV output for both stages.

pub mod classify;
pub mod collect;
pub mod country;
pub mod enrich;
pub mod extract;
pub mod filter;
pub mod normalize;
pub mod output;

pub use classify::{InferenceApiClassifier, KeywordClassifier, TopicClassifier, TopicScores, TOPIC_LABELS};
pub use collect::{Collection, Collector, SourceOutcome};
pub use country::{extraer_pais, Gazetteer, WorldGazetteer};
pub use enrich::{Enricher, EnrichmentSummary};
pub use filter::{dedup_by_title, excluir_palabras};
pub use normalize::limpiar;

use crate::client::{PaperRecord, Source};
use serde::{Serialize, Serializer};

fn semicolon_list<S: Serializer>(values: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&values.join("; "))
}

fn topic_distribution<S: Serializer>(scores: &TopicScores, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&scores.to_column())
}

/// A collected record with the signals extracted in stage 2.
///
/// Field order is the column order of the classification CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub id: String,
    pub pmcid: String,
    pub doi: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub journal: String,
    pub year: String,
    pub authors: String,
    pub url_fulltext: String,
    pub source: Source,
    pub title_clean: String,
    pub abstract_clean: String,
    /// `title_clean + " " + abstract_clean`
    pub texto_total: String,
    pub country: String,
    pub topic: String,
    pub topic_score: f64,
    #[serde(serialize_with = "topic_distribution")]
    pub topic_scores: TopicScores,
    pub sample_size: String,
    pub method_used: String,
    #[serde(serialize_with = "semicolon_list")]
    pub antibiotics: Vec<String>,
    #[serde(serialize_with = "semicolon_list")]
    pub pct_values: Vec<String>,
    #[serde(serialize_with = "semicolon_list")]
    pub mic_values: Vec<String>,
}

impl EnrichedRecord {
    /// Column names of the classification CSV
    pub const COLUMNS: [&'static str; 22] = [
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
        "title_clean",
        "abstract_clean",
        "texto_total",
        "country",
        "topic",
        "topic_score",
        "topic_scores",
        "sample_size",
        "method_used",
        "antibiotics",
        "pct_values",
        "mic_values",
    ];

    /// Start an enriched record from a collected one; signals are left empty
    #[must_use]
    pub fn from_paper(record: PaperRecord) -> Self {
        let title_clean = limpiar(&record.title);
        let abstract_clean = limpiar(&record.abstract_text);
        let texto_total = format!("{title_clean} {abstract_clean}");

        Self {
            id: record.id,
            pmcid: record.pmcid,
            doi: record.doi,
            title: record.title,
            abstract_text: record.abstract_text,
            journal: record.journal,
            year: record.year,
            authors: record.authors,
            url_fulltext: record.url_fulltext,
            source: record.source,
            title_clean,
            abstract_clean,
            texto_total,
            country: String::new(),
            topic: String::new(),
            topic_score: 0.0,
            topic_scores: TopicScores::new(Vec::new(), Vec::new()),
            sample_size: String::new(),
            method_used: String::new(),
            antibiotics: Vec::new(),
            pct_values: Vec::new(),
            mic_values: Vec::new(),
        }
    }
}
