#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The LLM Gateway.
//!
//! Exposes a single capability — `invoke(messages, model_spec, options) ->
//! text` — with caller-supplied deadlines, fixed-backoff retry on
//! transient errors, and transparent fallback to a secondary
//! provider/model after a run of consecutive primary failures. Every
//! other component in this workspace that talks to an LLM goes through
//! [`gateway::Gateway::invoke`] rather than a raw [`providers::LlmProvider`].

pub mod gateway;
pub mod providers;

use thiserror::Error;

/// Errors a provider implementation can report. The gateway classifies
/// these into a retry-relevant taxonomy (Timeout/Transient/Fatal) — a
/// provider itself makes no retry decisions.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (timeout, connection reset, DNS, etc.).
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx HTTP response from the provider.
    #[error("HTTP {status}: {message}")]
    Status {
        /// Status code.
        status: u16,
        /// Body/description.
        message: String,
    },

    /// Response body failed to parse.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific failure not covered above.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// Missing or invalid configuration (API key, model id).
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

impl ProviderError {
    /// 429/5xx/network are transient; 4xx other than 429 is permanent
    /// (surfaced as fatal once retries have nothing left to try).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Json(_) | Self::Provider { .. } => true,
            Self::Config { .. } => false,
        }
    }
}
