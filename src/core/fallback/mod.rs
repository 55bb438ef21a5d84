#![allow(clippy::result_large_err)]

//! Generative fallback for nodes and expressions the static tables cannot translate.
//!
//! The engine only sees [`GenerativeFallback`]. Every failure surfaces as a
//! [`FallbackError`] that the engine turns into a warning; nothing here can fail a
//! translation.

use crate::core::config::FallbackConfig;
use crate::core::error::AppError;
use crate::core::expression::ExpressionContext;
use crate::core::graph::GraphNode;
use crate::core::platform::Platform;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub mod http;
pub mod prompt;

pub use http::HttpCompletionFallback;

#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("generative fallback unavailable: {0}")]
    Unavailable(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion service returned HTTP {status}")]
    Server { status: u16 },

    #[error("invalid completion response: {0}")]
    InvalidResponse(String),

    #[error("request cancelled")]
    Cancelled,
}

impl FallbackError {
    /// Failures worth a retry: network, timeout, 429 and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            FallbackError::Network(_) | FallbackError::Timeout(_) => true,
            FallbackError::Server { status } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<FallbackError> for AppError {
    fn from(err: FallbackError) -> Self {
        let category = match err {
            FallbackError::Timeout(_) => ErrorCategory::TimeoutError,
            _ => ErrorCategory::FallbackError,
        };
        AppError::new(category, err.to_string()).with_code("FLOW-FALLBACK-001")
    }
}

/// Surroundings of a node handed to the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackContext {
    pub source_platform: Platform,
    pub target_platform: Platform,
    pub workflow_name: String,
    pub upstream_types: Vec<String>,
    pub downstream_types: Vec<String>,
}

/// A node produced by the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedNode {
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackHealth {
    pub adapter: String,
    pub configured: bool,
    pub reachable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[async_trait]
pub trait GenerativeFallback: Send + Sync {
    fn name(&self) -> &'static str;

    async fn synthesize(
        &self,
        node: &GraphNode,
        context: &FallbackContext,
        cancel: &CancellationToken,
    ) -> Result<SynthesizedNode, FallbackError>;

    async fn translate_expression(
        &self,
        expression: &str,
        source: Platform,
        target: Platform,
        context: &ExpressionContext,
        cancel: &CancellationToken,
    ) -> Result<String, FallbackError>;

    async fn health(&self) -> FallbackHealth;
}

/// Used when no completion endpoint is configured.
#[derive(Debug, Clone, Default)]
pub struct DisabledFallback;

#[async_trait]
impl GenerativeFallback for DisabledFallback {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn synthesize(
        &self,
        _node: &GraphNode,
        _context: &FallbackContext,
        _cancel: &CancellationToken,
    ) -> Result<SynthesizedNode, FallbackError> {
        Err(FallbackError::Unavailable("no completion endpoint configured".to_string()))
    }

    async fn translate_expression(
        &self,
        _expression: &str,
        _source: Platform,
        _target: Platform,
        _context: &ExpressionContext,
        _cancel: &CancellationToken,
    ) -> Result<String, FallbackError> {
        Err(FallbackError::Unavailable("no completion endpoint configured".to_string()))
    }

    async fn health(&self) -> FallbackHealth {
        FallbackHealth {
            adapter: self.name().to_string(),
            configured: false,
            reachable: false,
            detail: Some("set fallback.endpoint or FLOWBRIDGE_FALLBACK_ENDPOINT to enable".to_string()),
        }
    }
}

/// Timeout and retry budget shared by every fallback call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            max_retries: 1,
        }
    }
}

/// Run `call` under the policy: each attempt is bounded by the timeout, transient
/// failures are retried up to `max_retries` times and cancellation wins over both.
pub async fn with_retry<T, F, Fut>(
    policy: &FallbackPolicy,
    cancel: &CancellationToken,
    mut call: F,
) -> Result<T, FallbackError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FallbackError>>,
{
    let mut attempt = 0u32;
    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FallbackError::Cancelled),
            result = tokio::time::timeout(policy.timeout, call()) => match result {
                Ok(result) => result,
                Err(_) => Err(FallbackError::Timeout(policy.timeout)),
            },
        };
        match outcome {
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                tracing::warn!(attempt, error = %err, "retrying generative fallback call");
            }
            other => return other,
        }
    }
}

/// Build the fallback described by the `[fallback]` config section.
pub fn from_config(config: &FallbackConfig) -> Result<Arc<dyn GenerativeFallback>, AppError> {
    if !config.is_enabled() {
        tracing::debug!("generative fallback disabled");
        return Ok(Arc::new(DisabledFallback));
    }
    Ok(Arc::new(HttpCompletionFallback::from_config(config)?))
}
