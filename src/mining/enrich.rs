//! Stage-2 pipeline: normalize, exclude, deduplicate, then enrich.

use super::classify::{InferenceApiClassifier, KeywordClassifier, TopicClassifier, TOPIC_LABELS};
use super::country::{extraer_pais, Gazetteer, WorldGazetteer};
use super::extract::{
    extract_antibiotics, extract_method, extract_mic_values, extract_pct_values,
    extract_sample_size,
};
use super::filter::{dedup_by_title, excluir_palabras};
use super::normalize::collapse_whitespace;
use super::EnrichedRecord;
use crate::client::{HttpFetcher, PaperRecord};
use crate::{Config, Result};
use tracing::{debug, info};

/// Record counts at each filtering step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    pub input: usize,
    pub excluded: usize,
    pub duplicates: usize,
    pub output: usize,
}

/// Runs the stage-2 pipeline over a collected table
pub struct Enricher {
    classifier: Box<dyn TopicClassifier>,
    gazetteer: Box<dyn Gazetteer>,
    batch_size: usize,
}

impl Enricher {
    #[must_use]
    pub fn new(classifier: Box<dyn TopicClassifier>) -> Self {
        Self {
            classifier,
            gazetteer: Box::new(WorldGazetteer),
            batch_size: 4,
        }
    }

    /// Build the enricher the configuration asks for: the inference API when an
    /// endpoint is set, the keyword classifier otherwise
    pub fn from_config(config: &Config) -> Result<Self> {
        let classifier: Box<dyn TopicClassifier> = match config
            .classifier
            .endpoint
            .as_deref()
            .filter(|endpoint| !endpoint.trim().is_empty())
        {
            Some(endpoint) => {
                let fetcher =
                    HttpFetcher::from_config("classifier", config, config.classifier.max_attempts)?;
                Box::new(InferenceApiClassifier::new(
                    fetcher,
                    endpoint,
                    config.classifier.api_token.clone(),
                ))
            }
            None => {
                info!("No classifier endpoint configured, using keyword classifier");
                Box::new(KeywordClassifier)
            }
        };

        Ok(Self::new(classifier).with_batch_size(config.classifier.batch_size))
    }

    #[must_use]
    pub fn with_gazetteer(mut self, gazetteer: Box<dyn Gazetteer>) -> Self {
        self.gazetteer = gazetteer;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Filter and enrich `records`, keeping their relative order
    pub async fn enrich(
        &self,
        records: Vec<PaperRecord>,
    ) -> Result<(Vec<EnrichedRecord>, EnrichmentSummary)> {
        let mut summary = EnrichmentSummary {
            input: records.len(),
            ..EnrichmentSummary::default()
        };

        let kept: Vec<EnrichedRecord> = records
            .into_iter()
            .map(EnrichedRecord::from_paper)
            .filter(|record| !excluir_palabras(&record.texto_total))
            .collect();
        summary.excluded = summary.input - kept.len();

        let before_dedup = kept.len();
        let mut enriched = dedup_by_title(kept, |record| record.title_clean.as_str());
        summary.duplicates = before_dedup - enriched.len();
        summary.output = enriched.len();

        info!(
            "Kept {} of {} records ({} excluded, {} duplicate titles)",
            summary.output, summary.input, summary.excluded, summary.duplicates
        );

        for record in &mut enriched {
            let raw = collapse_whitespace(&format!("{} {}", record.title, record.abstract_text));
            record.country = extraer_pais(self.gazetteer.as_ref(), &raw);
        }

        self.classify(&mut enriched).await?;

        for record in &mut enriched {
            record.sample_size = extract_sample_size(&record.texto_total);
            record.method_used = extract_method(&record.texto_total);
            record.antibiotics = extract_antibiotics(&record.abstract_clean);
            record.pct_values = extract_pct_values(&record.abstract_clean);
            record.mic_values = extract_mic_values(&record.abstract_clean);
        }

        Ok((enriched, summary))
    }

    async fn classify(&self, records: &mut [EnrichedRecord]) -> Result<()> {
        let total = records.len();
        info!(
            "Classifying {} records with {} classifier (batch size {})",
            total,
            self.classifier.name(),
            self.batch_size
        );

        let mut done = 0;
        for batch in records.chunks_mut(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|r| r.texto_total.clone()).collect();
            let scores = self.classifier.classify(&texts, &TOPIC_LABELS).await?;

            for (record, scores) in batch.iter_mut().zip(scores) {
                record.topic = scores.top_label().unwrap_or_default().to_string();
                record.topic_score = scores.top_score().unwrap_or_default();
                record.topic_scores = scores;
            }

            done += batch.len();
            debug!("Classified {}/{}", done, total);
        }
        Ok(())
    }
}
