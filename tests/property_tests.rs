use litmine::client::{PaperRecord, Source};
use litmine::mining::extract::{extract_method, METHOD_KEYWORDS};
use litmine::mining::filter::EXCLUSION_TERMS;
use litmine::mining::{dedup_by_title, excluir_palabras, limpiar, Enricher, KeywordClassifier};
use proptest::prelude::*;
use std::collections::HashSet;

mod normalize_props {
    use super::*;

    proptest! {
        #[test]
        fn test_limpiar_is_idempotent(text in r"[a-zA-ZáéíóúñÑ0-9.,;%= \t\n]{0,80}") {
            let once = limpiar(&text);
            prop_assert_eq!(limpiar(&once), once.clone());
            prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
            prop_assert!(!once.contains("  "));
        }
    }
}

mod filter_props {
    use super::*;

    proptest! {
        #[test]
        fn test_dedup_leaves_unique_titles(titles in prop::collection::vec("[abc ]{0,4}", 0..30)) {
            let cleaned: Vec<String> = titles.iter().map(|t| limpiar(t)).collect();
            let kept = dedup_by_title(cleaned.clone(), |t| t.as_str());

            let unique: HashSet<&String> = kept.iter().collect();
            prop_assert_eq!(unique.len(), kept.len());
            let all: HashSet<&String> = cleaned.iter().collect();
            prop_assert_eq!(all.len(), kept.len());
        }

        #[test]
        fn test_any_exclusion_term_excludes(
            prefix in "[a-z ]{0,20}",
            suffix in "[a-z ]{0,20}",
            index in 0..EXCLUSION_TERMS.len(),
        ) {
            let text = format!("{prefix}{}{suffix}", EXCLUSION_TERMS[index].to_uppercase());
            prop_assert!(excluir_palabras(&text));
        }

        #[test]
        fn test_methods_come_from_table(text in "[a-z -]{0,60}") {
            let methods = extract_method(&text);
            for method in methods.split("; ").filter(|m| !m.is_empty()) {
                prop_assert!(METHOD_KEYWORDS.iter().any(|(name, _)| *name == method));
            }
        }
    }
}

mod pipeline_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_enriched_output_has_no_excluded_or_duplicate_titles(
            titles in prop::collection::vec("(resistance|review|children|isolates|chile| )+", 0..12),
        ) {
            let records: Vec<PaperRecord> = titles
                .iter()
                .enumerate()
                .map(|(i, title)| {
                    let mut record = PaperRecord::new(i.to_string(), Source::PubMed);
                    record.title = title.clone();
                    record
                })
                .collect();

            let enricher = Enricher::new(Box::new(KeywordClassifier));
            let (enriched, summary) = tokio_test::block_on(enricher.enrich(records)).unwrap();

            prop_assert_eq!(summary.output, enriched.len());
            let mut seen = HashSet::new();
            for record in &enriched {
                prop_assert!(!excluir_palabras(&record.texto_total));
                prop_assert!(seen.insert(record.title_clean.clone()));
            }
        }
    }
}
