// src/error.rs
// =============================================================================
// Error types for the crawler library.
//
// The crawl treats failures very differently depending on where they come from:
// - Auth: the credential was rejected, the whole run stops
// - ProviderUnavailable: one batch is lost, the run carries on
// - MalformedUnit: one family unit (or relative) is skipped
// - Catalog: the reference project catalog could not be loaded
//
// The binary uses anyhow on top of these, the library keeps them typed so the
// worker can match on the variant.
// =============================================================================

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScoutError>;

#[derive(Debug, Error)]
pub enum ScoutError {
    /// The relationship provider rejected the access token
    #[error("Invalid access token")]
    Auth,

    /// Network failure or non-success response from the provider
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A provider response was missing fields we need
    #[error("Malformed family unit: {0}")]
    MalformedUnit(String),

    /// The reference catalog could not be read or parsed
    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl ScoutError {
    /// Only a rejected credential ends the run; everything else is per-batch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScoutError::Auth)
    }
}

impl From<reqwest::Error> for ScoutError {
    fn from(err: reqwest::Error) -> Self {
        // Timeouts and refused connections get short, stable messages
        let message = if err.is_timeout() {
            "Request timed out".to_string()
        } else if err.is_connect() {
            "Connection failed".to_string()
        } else if err.is_decode() {
            format!("Could not decode response: {}", err)
        } else {
            err.to_string()
        };
        ScoutError::ProviderUnavailable(message)
    }
}

impl From<serde_json::Error> for ScoutError {
    fn from(err: serde_json::Error) -> Self {
        ScoutError::MalformedUnit(err.to_string())
    }
}

impl From<url::ParseError> for ScoutError {
    fn from(err: url::ParseError) -> Self {
        ScoutError::ProviderUnavailable(format!("Invalid provider URL: {}", err))
    }
}
