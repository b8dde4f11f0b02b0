//! # Configuration
//!
//! Layered configuration for both pipeline stages: built-in defaults, an
//! optional TOML file and `LITMINE__SECTION__KEY` environment variables, in
//! increasing order of precedence.

use crate::client::providers::SourceConfig;
use crate::{Error, Result};
use chrono::Datelike;
use config::{Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const ENV_PREFIX: &str = "LITMINE";

/// Root configuration object handed to every stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub search: SearchConfig,
    pub http: HttpConfig,
    pub pubmed: PubMedConfig,
    pub europe_pmc: EuropePmcConfig,
    pub scopus: ScopusConfig,
    pub classifier: ClassifierConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Publication year window shared by all sources (inclusive)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub year_start: u16,
    pub year_end: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Initial delay before retrying a 429 response
    pub rate_limit_delay_ms: u64,
    /// Attempts allowed for a request that keeps answering 429
    pub rate_limit_max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubMedConfig {
    pub enabled: bool,
    pub query: String,
    /// Contact email sent with every E-utilities request
    pub email: String,
    pub api_key: Option<String>,
    pub max_results: usize,
    /// Identifiers per efetch request
    pub batch_size: usize,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EuropePmcConfig {
    pub enabled: bool,
    pub query: String,
    pub page_size: usize,
    /// 0 collects every page the cursor yields
    pub max_results: usize,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopusConfig {
    pub enabled: bool,
    pub query: String,
    pub api_key: Option<String>,
    pub max_results: usize,
    pub page_size: usize,
    pub max_attempts: u32,
    /// Pause between result pages
    pub page_delay_ms: u64,
    pub abstract_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Zero-shot inference endpoint; the keyword classifier is used when unset
    pub endpoint: Option<String>,
    pub api_token: Option<String>,
    pub batch_size: usize,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub collection_path: PathBuf,
    pub classification_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            http: HttpConfig::default(),
            pubmed: PubMedConfig::default(),
            europe_pmc: EuropePmcConfig::default(),
            scopus: ScopusConfig::default(),
            classifier: ClassifierConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        let current_year = u16::try_from(chrono::Utc::now().year()).unwrap_or(2025);
        Self {
            year_start: 2020,
            year_end: current_year,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("litmine/{} (Literature Mining Tool)", env!("CARGO_PKG_VERSION")),
            rate_limit_delay_ms: 5_000,
            rate_limit_max_attempts: 6,
        }
    }
}

impl Default for PubMedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            query: "\"Helicobacter pylori\" AND (\"Drug Resistance\" OR \"Drug Resistance, Multiple, Bacterial\" \
                    OR \"susceptibility test\" OR \"Drug Resistance, Microbial\" OR \"Microbial Sensitivity Tests\")"
                .to_string(),
            email: String::new(),
            api_key: None,
            max_results: 10_000,
            batch_size: 200,
            max_attempts: 4,
        }
    }
}

impl Default for EuropePmcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            query: "\"Helicobacter pylori\" AND susceptibility test OR drug resistance".to_string(),
            page_size: 1000,
            max_results: 0,
            max_attempts: 1,
        }
    }
}

impl Default for ScopusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            query: "\"Helicobacter pylori\" AND (\"susceptibility test\" OR \"drug resistance\")"
                .to_string(),
            api_key: None,
            max_results: 1000,
            page_size: 25,
            max_attempts: 4,
            page_delay_ms: 300,
            abstract_timeout_secs: 20,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_token: None,
            batch_size: 4,
            max_attempts: 3,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            collection_path: PathBuf::from("busqueda_resultados.csv"),
            classification_path: PathBuf::from("clasificacion_automatizada.csv"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Default location of the user configuration file
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("litmine").join("config.toml"))
    }

    /// Load configuration, layering defaults, the file and the environment.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        match path {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    debug!("Looking for configuration at {}", default_path.display());
                    builder = builder.add_source(File::from(default_path).required(false));
                }
            }
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file without consulting the environment
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.search.year_start > self.search.year_end {
            return Err(invalid(
                "search.year_start",
                format!(
                    "{} is after year_end {}",
                    self.search.year_start, self.search.year_end
                ),
            ));
        }

        if self.http.timeout_secs == 0 {
            return Err(invalid("http.timeout_secs", "must be greater than 0"));
        }
        if self.http.rate_limit_max_attempts == 0 {
            return Err(invalid("http.rate_limit_max_attempts", "must be at least 1"));
        }

        if self.pubmed.batch_size == 0 {
            return Err(invalid("pubmed.batch_size", "must be greater than 0"));
        }
        if self.europe_pmc.page_size == 0 || self.europe_pmc.page_size > 1000 {
            return Err(invalid("europe_pmc.page_size", "must be between 1 and 1000"));
        }
        if self.scopus.page_size == 0 || self.scopus.page_size > 200 {
            return Err(invalid("scopus.page_size", "must be between 1 and 200"));
        }

        for (field, attempts) in [
            ("pubmed.max_attempts", self.pubmed.max_attempts),
            ("europe_pmc.max_attempts", self.europe_pmc.max_attempts),
            ("scopus.max_attempts", self.scopus.max_attempts),
            ("classifier.max_attempts", self.classifier.max_attempts),
        ] {
            if attempts == 0 {
                return Err(invalid(field, "must be at least 1"));
            }
        }

        if self.classifier.batch_size == 0 {
            return Err(invalid("classifier.batch_size", "must be greater than 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(invalid(
                "logging.level",
                format!("expected one of {valid_levels:?}"),
            ));
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(invalid("logging.format", "expected `text` or `json`"));
        }

        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Parse {
            context: "configuration".to_string(),
            message: e.to_string(),
        })
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    #[must_use]
    pub fn pubmed_source(&self) -> SourceConfig {
        SourceConfig {
            query: self.pubmed.query.clone(),
            year_start: self.search.year_start,
            year_end: self.search.year_end,
            api_key: self.pubmed.api_key.clone().filter(|k| !k.is_empty()),
            contact_email: Some(self.pubmed.email.clone()).filter(|e| !e.is_empty()),
            max_results: self.pubmed.max_results,
            page_size: self.pubmed.batch_size,
        }
    }

    #[must_use]
    pub fn europe_pmc_source(&self) -> SourceConfig {
        SourceConfig {
            query: self.europe_pmc.query.clone(),
            year_start: self.search.year_start,
            year_end: self.search.year_end,
            api_key: None,
            contact_email: None,
            max_results: self.europe_pmc.max_results,
            page_size: self.europe_pmc.page_size,
        }
    }

    #[must_use]
    pub fn scopus_source(&self) -> SourceConfig {
        SourceConfig {
            query: self.scopus.query.clone(),
            year_start: self.search.year_start,
            year_end: self.search.year_end,
            api_key: self.scopus.api_key.clone().filter(|k| !k.is_empty()),
            contact_email: None,
            max_results: self.scopus.max_results,
            page_size: self.scopus.page_size,
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> Error {
    Error::InvalidInput {
        field: field.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scopus.page_size, 25);
        assert_eq!(config.scopus.max_results, 1000);
        assert_eq!(config.europe_pmc.page_size, 1000);
        assert_eq!(config.classifier.batch_size, 4);
    }

    #[test]
    fn test_year_window_validation() {
        let mut config = Config::default();
        config.search.year_start = 2025;
        config.search.year_end = 2020;
        assert!(matches!(config.validate(), Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn test_page_size_validation() {
        let mut config = Config::default();
        config.europe_pmc.page_size = 5000;
        assert!(matches!(config.validate(), Err(Error::InvalidInput { .. })));

        let mut config = Config::default();
        config.scopus.page_size = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
[search]
year_start = 2018
year_end = 2022

[scopus]
api_key = "abc123"
max_results = 50
"#
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.search.year_start, 2018);
        assert_eq!(config.scopus.max_results, 50);
        // untouched keys keep their defaults
        assert_eq!(config.scopus.page_size, 25);
        assert_eq!(config.pubmed.batch_size, 200);

        let source = config.scopus_source();
        assert_eq!(source.api_key.as_deref(), Some("abc123"));
        assert_eq!(source.year_end, 2022);
    }

    #[test]
    fn test_empty_credentials_are_dropped() {
        let mut config = Config::default();
        config.pubmed.email = String::new();
        config.pubmed.api_key = Some(String::new());
        let source = config.pubmed_source();
        assert!(source.contact_email.is_none());
        assert!(source.api_key.is_none());
    }

    #[test]
    fn test_renders_toml() {
        let rendered = Config::default().to_toml().unwrap();
        assert!(rendered.contains("[scopus]"));
        assert!(rendered.contains("page_size = 25"));
    }
}
