//! Regex and keyword extractors over normalized text.

use regex::Regex;
use std::sync::OnceLock;

/// Laboratory methods and the keywords that reveal them, in output order
pub const METHOD_KEYWORDS: &[(&str, &[&str])] = &[
    ("E-test", &["e-test", "etest"]),
    ("agar dilution", &["agar dilution"]),
    ("agar diffusion", &["disk diffusion", "kirby-bauer", "agar diffusion"]),
    ("broth microdilution", &["broth microdilution", "microdilution"]),
    ("PCR", &["pcr", "polymerase chain reaction"]),
    ("culture", &["culture", "cultivation"]),
];

pub const ANTIBIOTICS: [&str; 6] = [
    "clarithromycin",
    "amoxicillin",
    "metronidazole",
    "levofloxacin",
    "tetracycline",
    "rifabutin",
];

fn sample_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(n\s*=?\s*\d{1,5}|\d{1,5}\s+patients|\d{1,5}\s+samples|\d{1,5}\s+isolates)\b")
            .expect("valid sample size pattern")
    })
}

fn pct_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{1,3}\s?%").expect("valid percentage pattern"))
}

fn mic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)mic\s?\d+(\.\d+)?").expect("valid MIC pattern"))
}

fn all_matches(re: &Regex, text: &str) -> Vec<String> {
    re.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Sample-size mentions (`n = 120`, `85 patients`), `"; "`-joined
#[must_use]
pub fn extract_sample_size(text: &str) -> String {
    all_matches(sample_re(), text).join("; ")
}

/// Laboratory methods mentioned in `text`, `"; "`-joined in table order
#[must_use]
pub fn extract_method(text: &str) -> String {
    let lowered = text.to_lowercase();
    METHOD_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(method, _)| *method)
        .collect::<Vec<_>>()
        .join("; ")
}

#[must_use]
pub fn extract_antibiotics(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    ANTIBIOTICS
        .iter()
        .filter(|name| lowered.contains(*name))
        .map(|name| (*name).to_string())
        .collect()
}

/// Percentages such as `35%` or `12 %`
#[must_use]
pub fn extract_pct_values(text: &str) -> Vec<String> {
    all_matches(pct_re(), text)
}

/// MIC mentions such as `mic 0.5`, whole match
#[must_use]
pub fn extract_mic_values(text: &str) -> Vec<String> {
    all_matches(mic_re(), text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_size() {
        assert_eq!(
            extract_sample_size("we enrolled 85 patients and cultured 120 isolates (n = 85)"),
            "85 patients; 120 isolates; n = 85"
        );
        assert_eq!(extract_sample_size("no numbers"), "");
    }

    #[test]
    fn test_method_table_order() {
        assert_eq!(extract_method("Susceptibility tested by E-test and PCR"), "E-test; PCR");
        assert_eq!(
            extract_method("gastric biopsy culture then broth microdilution"),
            "broth microdilution; culture"
        );
        assert_eq!(extract_method("questionnaire study"), "");
    }

    #[test]
    fn test_antibiotics_in_list_order() {
        assert_eq!(
            extract_antibiotics("levofloxacin and clarithromycin resistance"),
            vec!["clarithromycin".to_string(), "levofloxacin".to_string()]
        );
    }

    #[test]
    fn test_pct_and_mic() {
        assert_eq!(
            extract_pct_values("resistance was 35% for clarithromycin and 12 % for amoxicillin"),
            vec!["35%".to_string(), "12 %".to_string()]
        );
        assert_eq!(
            extract_mic_values("mic 0.5 mg/l and MIC8 for metronidazole"),
            vec!["mic 0.5".to_string(), "MIC8".to_string()]
        );
    }
}
