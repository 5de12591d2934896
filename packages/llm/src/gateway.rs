//! Retry, timeout, and fallback orchestration around a raw
//! [`LlmProvider`](crate::providers::LlmProvider).
//!
//! Transient-classification and a `tokio::time::sleep` backoff loop drive
//! retries on the primary provider/model with a fixed ≈60s back-off, then
//! swap to a configured fallback provider/model after `fail_threshold`
//! consecutive failures.

use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;

use crate::ProviderError;
use crate::providers::{LlmProvider, LlmResponse, Message};

/// Back-off between primary-provider retry attempts.
const RETRY_BACKOFF: Duration = Duration::from_secs(60);

/// Default per-call timeout.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Default retry/fallback policy.
pub const DEFAULT_FAIL_THRESHOLD: u32 = 3;
/// See [`DEFAULT_FAIL_THRESHOLD`].
pub const DEFAULT_FALLBACK_RETRIES: u32 = 3;

/// Per-call options.
#[derive(Debug, Clone)]
pub struct InvokeOptions {
    /// Sampling temperature, if the provider supports it (currently
    /// unused by the providers in this workspace but threaded through
    /// for forward compatibility).
    pub temperature: Option<f32>,
    /// Nucleus-sampling `top_p`.
    pub top_p: Option<f32>,
    /// Attempts against the primary provider before the fallback
    /// mechanism engages (resets after a success).
    pub attempts: u32,
    /// Consecutive failures before switching to the fallback provider.
    pub fail_threshold: u32,
    /// Additional attempts allowed against the fallback provider.
    pub fallback_retries: u32,
    /// Per-attempt wall-clock deadline.
    pub timeout: Duration,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            temperature: None,
            top_p: None,
            attempts: DEFAULT_FAIL_THRESHOLD,
            fail_threshold: DEFAULT_FAIL_THRESHOLD,
            fallback_retries: DEFAULT_FALLBACK_RETRIES,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Route metadata returned alongside the text.
#[derive(Debug, Clone)]
pub struct RouteInfo {
    /// Name of the provider that actually produced the result.
    pub provider: String,
    /// Model id that actually produced the result.
    pub model: String,
    /// Whether the fallback provider/model ended up servicing the call.
    pub used_fallback: bool,
}

/// Successful gateway result.
#[derive(Debug, Clone)]
pub struct GatewayOutcome {
    /// The provider's raw response (text and/or tool-use blocks).
    pub response: LlmResponse,
    /// Which route produced it.
    pub route: RouteInfo,
}

/// Errors the gateway surfaces to callers.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A single attempt's deadline elapsed.
    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),

    /// A transient provider error survived all retries but a fallback is
    /// still in play — callers should not normally see this, it is an
    /// internal signal consumed by [`Gateway::invoke`].
    #[error("transient provider error: {0}")]
    Transient(ProviderError),

    /// Non-retryable provider failure.
    #[error("fatal provider error: {0}")]
    Fatal(ProviderError),

    /// Every attempt against every configured route was exhausted.
    #[error("all retries failed on {last_provider}/{last_model}: {cause}")]
    AllRetriesFailed {
        /// The underlying cause of the final attempt.
        cause: ProviderError,
        /// Provider of the final attempt.
        last_provider: String,
        /// Model of the final attempt.
        last_model: String,
    },
}

/// The LLM Gateway.
///
/// Owns a primary provider and an optional fallback provider. Call
/// [`Gateway::invoke`] for every LLM interaction in this workspace —
/// nothing should call a raw [`LlmProvider`] directly outside tests.
pub struct Gateway {
    primary: Box<dyn LlmProvider>,
    fallback: Option<Box<dyn LlmProvider>>,
}

impl Gateway {
    /// Builds a gateway from an already-constructed primary and optional
    /// fallback provider.
    #[must_use]
    pub fn new(primary: Box<dyn LlmProvider>, fallback: Option<Box<dyn LlmProvider>>) -> Self {
        Self { primary, fallback }
    }

    /// The primary provider's `(name, model)`, used by callers that must
    /// construct a summary-table key before invoking the gateway (the key
    /// addresses the row the primary route would write to; fallback
    /// reconciliation in `paperwright_summaries::coordinator` handles the
    /// case where the actual response came from the fallback instead).
    #[must_use]
    pub fn primary_route(&self) -> (&str, &str) {
        (self.primary.name(), self.primary.model())
    }

    /// Builds a gateway from environment variables
    /// (`AI_PROVIDER`/`ANTHROPIC_API_KEY`/`OPENAI_API_KEY`/`AI_MODEL`,
    /// `PAPERWRIGHT_FALLBACK_PROVIDER`/`PAPERWRIGHT_FALLBACK_MODEL`).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] if the primary provider's
    /// credentials are missing.
    pub fn from_env() -> Result<Self, ProviderError> {
        let primary = crate::providers::create_provider_from_env()?;
        let fallback = crate::providers::create_fallback_provider_from_env()?;
        Ok(Self::new(primary, fallback))
    }

    /// Invokes the gateway.
    ///
    /// Retries the primary up to `options.attempts` times on transient
    /// errors with a fixed back-off; after `options.fail_threshold`
    /// consecutive failures it switches to the fallback provider (if
    /// configured) for up to `options.fallback_retries` further attempts.
    /// Structured-output schema validation is the caller's
    /// responsibility: pass a `validate` closure that returns `Err` to
    /// have a schema-invalid response treated as transient and retried.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AllRetriesFailed`] once every configured
    /// route is exhausted.
    pub async fn invoke(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[serde_json::Value],
        options: &InvokeOptions,
        validate: impl Fn(&LlmResponse) -> Result<(), String>,
    ) -> Result<GatewayOutcome, GatewayError> {
        let mut consecutive_failures = 0u32;
        let mut last_error: Option<ProviderError> = None;
        let mut last_route = (self.primary.name().to_string(), self.primary.model().to_string());

        for attempt in 0..options.attempts {
            if attempt > 0 {
                log::warn!(
                    "gateway: retry {attempt}/{} on {}/{} in {:?}",
                    options.attempts,
                    self.primary.name(),
                    self.primary.model(),
                    RETRY_BACKOFF,
                );
                tokio::time::sleep(RETRY_BACKOFF).await;
            }

            match self.attempt(self.primary.as_ref(), system_prompt, messages, tools, options.timeout, &validate).await
            {
                Ok(response) => {
                    return Ok(GatewayOutcome {
                        response,
                        route: RouteInfo {
                            provider: self.primary.name().to_string(),
                            model: self.primary.model().to_string(),
                            used_fallback: false,
                        },
                    });
                }
                Err(AttemptError::Timeout) => {
                    consecutive_failures += 1;
                    last_error = Some(ProviderError::Provider {
                        message: format!("timed out after {:?}", options.timeout),
                    });
                }
                Err(AttemptError::Provider(e)) => {
                    consecutive_failures += 1;
                    let transient = e.is_transient();
                    last_error = Some(e);
                    if !transient {
                        break;
                    }
                }
            }

            if consecutive_failures >= options.fail_threshold {
                break;
            }
        }

        let Some(fallback) = self.fallback.as_ref() else {
            return Err(GatewayError::AllRetriesFailed {
                cause: last_error.unwrap_or_else(|| ProviderError::Provider {
                    message: "no attempts were made".to_string(),
                }),
                last_provider: last_route.0,
                last_model: last_route.1,
            });
        };

        log::warn!(
            "gateway: {} consecutive failures on {}/{}, switching to fallback {}/{}",
            consecutive_failures,
            self.primary.name(),
            self.primary.model(),
            fallback.name(),
            fallback.model(),
        );
        last_route = (fallback.name().to_string(), fallback.model().to_string());

        for attempt in 0..options.fallback_retries {
            if attempt > 0 {
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
            match self.attempt(fallback.as_ref(), system_prompt, messages, tools, options.timeout, &validate).await {
                Ok(response) => {
                    return Ok(GatewayOutcome {
                        response,
                        route: RouteInfo {
                            provider: fallback.name().to_string(),
                            model: fallback.model().to_string(),
                            used_fallback: true,
                        },
                    });
                }
                Err(AttemptError::Timeout) => {
                    last_error = Some(ProviderError::Provider {
                        message: format!("fallback timed out after {:?}", options.timeout),
                    });
                }
                Err(AttemptError::Provider(e)) => {
                    let transient = e.is_transient();
                    last_error = Some(e);
                    if !transient {
                        break;
                    }
                }
            }
        }

        Err(GatewayError::AllRetriesFailed {
            cause: last_error.unwrap_or_else(|| ProviderError::Provider {
                message: "fallback exhausted with no recorded cause".to_string(),
            }),
            last_provider: last_route.0,
            last_model: last_route.1,
        })
    }

    async fn attempt(
        &self,
        provider: &dyn LlmProvider,
        system_prompt: &str,
        messages: &[Message],
        tools: &[serde_json::Value],
        call_timeout: Duration,
        validate: &impl Fn(&LlmResponse) -> Result<(), String>,
    ) -> Result<LlmResponse, AttemptError> {
        let fut = provider.chat(system_prompt, messages, tools);
        match timeout(call_timeout, fut).await {
            Err(_) => Err(AttemptError::Timeout),
            Ok(Err(e)) => Err(AttemptError::Provider(e)),
            Ok(Ok(response)) => match validate(&response) {
                Ok(()) => Ok(response),
                Err(message) => Err(AttemptError::Provider(ProviderError::Provider { message })),
            },
        }
    }
}

enum AttemptError {
    Timeout,
    Provider(ProviderError),
}
