mod common;

use common::{fast_fetcher, source_config};
use litmine::client::providers::EuropePmcProvider;
use litmine::mining::output::{read_collection, write_collection, write_enriched};
use litmine::mining::{Collector, Enricher, InferenceApiClassifier, KeywordClassifier};
use litmine::{EnrichedRecord, PaperRecord, Source};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Answers a zero-shot request with one result per input
struct ZeroShotResponder;

impl Respond for ZeroShotResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        let outputs: Vec<_> = body["inputs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|input| {
                json!({
                    "sequence": input,
                    "labels": ["review", "clinical outcome"],
                    "scores": [0.2, 0.8]
                })
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(outputs)
    }
}

fn paper(id: &str, title: &str, abstract_text: &str) -> PaperRecord {
    let mut record = PaperRecord::new(id, Source::Scopus);
    record.title = title.to_string();
    record.abstract_text = abstract_text.to_string();
    record
}

#[tokio::test]
async fn test_empty_collection_writes_header_only_files() {
    let dir = TempDir::new().unwrap();
    let collected = dir.path().join("busqueda_resultados.csv");
    let classified = dir.path().join("clasificacion_automatizada.csv");

    let collection = Collector::new().collect().await;
    write_collection(&collected, &collection.records).unwrap();

    let records = read_collection(&collected).unwrap();
    assert!(records.is_empty());
    assert_eq!(
        std::fs::read_to_string(&collected).unwrap(),
        format!("{}\n", PaperRecord::COLUMNS.join(","))
    );

    let (enriched, _) = Enricher::new(Box::new(KeywordClassifier))
        .enrich(records)
        .await
        .unwrap();
    write_enriched(&classified, &enriched).unwrap();
    assert_eq!(
        std::fs::read_to_string(&classified).unwrap(),
        format!("{}\n", EnrichedRecord::COLUMNS.join(","))
    );
}

#[tokio::test]
async fn test_collect_then_classify_through_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hitCount": 3,
            "nextCursorMark": "*",
            "resultList": {"result": [
                {"pmcid": "PMC1", "title": "Clarithromycin resistance in Chile",
                 "abstractText": "Agar dilution on 64 isolates; 40% resistant to clarithromycin."},
                {"pmcid": "PMC2", "title": "Clarithromycin resistance in Chile",
                 "abstractText": "Same title, later record."},
                {"pmcid": "PMC3", "title": "A meta-analysis of eradication",
                 "abstractText": "Pooled."}
            ]}
        })))
        .mount(&server)
        .await;

    let provider = EuropePmcProvider::new(source_config(0, 1000), fast_fetcher("europe_pmc", 1))
        .with_base_url(server.uri());
    let collection = Collector::new()
        .with_provider(Box::new(provider))
        .collect()
        .await;
    assert_eq!(collection.records.len(), 3);

    let dir = TempDir::new().unwrap();
    let collected = dir.path().join("collected.csv");
    write_collection(&collected, &collection.records).unwrap();
    let records = read_collection(&collected).unwrap();
    assert_eq!(records, collection.records);

    let (enriched, summary) = Enricher::new(Box::new(KeywordClassifier))
        .enrich(records)
        .await
        .unwrap();
    assert_eq!(summary.excluded, 1);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(enriched.len(), 1);

    let record = &enriched[0];
    assert_eq!(record.id, "PMC1");
    assert_eq!(record.country, "Chile");
    assert_eq!(record.method_used, "agar dilution");
    assert_eq!(record.sample_size, "64 isolates");
    assert_eq!(record.antibiotics, vec!["clarithromycin".to_string()]);
    assert_eq!(record.pct_values, vec!["40%".to_string()]);
    assert_eq!(record.source, Source::EuropePmc);

    let classified = dir.path().join("classified.csv");
    write_enriched(&classified, &enriched).unwrap();
    let mut reader = csv::Reader::from_path(&classified).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, EnrichedRecord::COLUMNS);
    assert_eq!(reader.records().count(), 1);
}

#[tokio::test]
async fn test_inference_classifier_batches_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/zero-shot"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ZeroShotResponder)
        .expect(2)
        .mount(&server)
        .await;

    let classifier = InferenceApiClassifier::new(
        fast_fetcher("classifier", 1),
        format!("{}/models/zero-shot", server.uri()),
        Some("secret".to_string()),
    );
    let records = vec![
        paper("1", "Eradication outcome in Brazil", "Cure rates."),
        paper("2", "Treatment in Mexico", "Outcomes."),
        paper("3", "Outcome data from Cuba", "Follow-up."),
    ];

    let (enriched, _) = Enricher::new(Box::new(classifier))
        .with_batch_size(2)
        .enrich(records)
        .await
        .unwrap();

    assert_eq!(enriched.len(), 3);
    for record in &enriched {
        assert_eq!(record.topic, "clinical outcome");
        assert!((record.topic_score - 0.8).abs() < f64::EPSILON);
        assert_eq!(record.topic_scores.labels, vec!["clinical outcome", "review"]);
    }
}

#[tokio::test]
async fn test_inference_classifier_failure_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .mount(&server)
        .await;

    let classifier =
        InferenceApiClassifier::new(fast_fetcher("classifier", 1), server.uri(), None);
    let result = Enricher::new(Box::new(classifier))
        .enrich(vec![paper("1", "Title", "Abstract")])
        .await;
    assert!(result.is_err());
}
