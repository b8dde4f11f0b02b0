#![allow(dead_code)]

use litmine::client::providers::SourceConfig;
use litmine::client::{HttpClientConfig, HttpFetcher};
use litmine::{RetryConfig, RetryPolicy};
use std::time::Duration;

/// Fetcher with millisecond backoff so retry paths stay fast.
///
/// A single attempt disables rate-limit retries too, as `from_config` does.
pub fn fast_fetcher(service: &str, max_attempts: u32) -> HttpFetcher {
    let policy = if max_attempts <= 1 {
        RetryPolicy::no_retry()
    } else {
        let transient = RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            multiplier: 2.0,
            jitter: 0.0,
        };
        RetryPolicy::new(transient, RetryConfig::rate_limited(Duration::from_millis(5), 2))
    };
    HttpFetcher::new(
        service,
        &HttpClientConfig::default(),
        policy,
        Duration::from_millis(5),
    )
    .expect("client builds")
}

pub fn source_config(max_results: usize, page_size: usize) -> SourceConfig {
    SourceConfig {
        query: "\"Helicobacter pylori\" AND resistance".to_string(),
        year_start: 2020,
        year_end: 2024,
        api_key: None,
        contact_email: None,
        max_results,
        page_size,
    }
}
