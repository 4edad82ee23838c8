use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Video metadata scraped from the catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Canonical catalog code; names the output directory
    pub code: String,
    pub title: String,
    pub release_date: String,
    pub duration: String,
    pub maker: String,
    pub series: String,
    pub rating: String,
    pub categories: Vec<String>,
    pub actors: Vec<String>,
    pub cover_url: String,
}

/// How strictly a search hit's code must match the requested code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrictness {
    /// Hit code equals the query (case-insensitive, whitespace ignored)
    #[default]
    Exact,
    /// Hit code starts with the query
    Prefix,
}

/// Catalog client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub cookie_file: Option<PathBuf>,
    pub timeout_ms: u64,
    /// Cover downloads are larger than pages and get their own timeout
    pub image_timeout_ms: u64,
    pub retry: u32,
    pub retry_delay_ms: u64,
    pub match_strictness: MatchStrictness,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://javdb.com".to_string(),
            cookie_file: Some(PathBuf::from("config/cookie.txt")),
            timeout_ms: 10_000,
            image_timeout_ms: 30_000,
            retry: 3,
            retry_delay_ms: 1_000,
            match_strictness: MatchStrictness::Exact,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
        }
    }
}

impl ApiConfig {
    /// Host part of the base URL, used to filter cookies
    pub fn host(&self) -> &str {
        let without_scheme = self
            .base_url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.base_url);
        without_scheme.split('/').next().unwrap_or(without_scheme)
    }
}

/// Errors that can occur when talking to the catalog
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Video code must not be empty")]
    EmptyCode,

    #[error("No catalog entry matches {0}")]
    NotFound(String),

    #[error("Rate limited by catalog")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Catalog returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Missing {field} for {code}")]
    IncompleteData { code: String, field: String },
}

impl ApiError {
    /// Transient failures worth another request
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::RateLimited | ApiError::NetworkError(_) | ApiError::Timeout
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::NetworkError(err.to_string())
        }
    }
}
