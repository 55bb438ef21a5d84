#![allow(clippy::result_large_err)]

use super::prompt;
use super::{
    with_retry, FallbackContext, FallbackError, FallbackHealth, FallbackPolicy, GenerativeFallback,
    SynthesizedNode,
};
use crate::core::config::FallbackConfig;
use crate::core::error::AppError;
use crate::core::expression::ExpressionContext;
use crate::core::graph::GraphNode;
use crate::core::platform::Platform;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

const NODE_MAX_TOKENS: u32 = 1024;
const EXPRESSION_MAX_TOKENS: u32 = 256;
const HEALTH_PROBE_PROMPT: &str = "Reply with the single word ok.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    max_tokens: u32,
}

/// Completion service reached over HTTP.
///
/// POSTs `{model, system, prompt, maxTokens}` and reads the answer from `completion`
/// or `text` in the JSON reply.
pub struct HttpCompletionFallback {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
    api_key: Option<String>,
    policy: FallbackPolicy,
}

impl HttpCompletionFallback {
    pub fn new(endpoint: Url, model: impl Into<String>, api_key: Option<String>, policy: FallbackPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            model: model.into(),
            api_key,
            policy,
        }
    }

    pub fn from_config(config: &FallbackConfig) -> Result<Self, AppError> {
        let raw = config.endpoint.as_deref().unwrap_or_default();
        let endpoint = Url::parse(raw).map_err(|err| {
            AppError::new(
                ErrorCategory::ConfigurationError,
                format!("fallback endpoint '{}' is not a valid URL: {}", raw, err),
            )
            .with_code("FLOW-CONFIG-001")
        })?;
        let timeout = config.timeout_duration().map_err(|err| {
            AppError::new(
                ErrorCategory::ConfigurationError,
                format!("fallback timeout '{}' is invalid: {}", config.timeout, err),
            )
            .with_code("FLOW-CONFIG-001")
        })?;
        let policy = FallbackPolicy {
            timeout,
            max_retries: config.max_retries,
        };
        Ok(Self::new(endpoint, config.model.clone(), config.api_key(), policy))
    }

    pub fn policy(&self) -> &FallbackPolicy {
        &self.policy
    }

    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
        cancel: &CancellationToken,
    ) -> Result<String, FallbackError> {
        let request = CompletionRequest {
            model: &self.model,
            system,
            prompt,
            max_tokens,
        };
        with_retry(&self.policy, cancel, || self.send(&request)).await
    }

    async fn send(&self, request: &CompletionRequest<'_>) -> Result<String, FallbackError> {
        let mut builder = self.client.post(self.endpoint.clone()).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await.map_err(|err| self.transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FallbackError::Server {
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| FallbackError::InvalidResponse(err.to_string()))?;
        body.get("completion")
            .or_else(|| body.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| FallbackError::InvalidResponse("reply has no completion or text field".to_string()))
    }

    fn transport_error(&self, err: reqwest::Error) -> FallbackError {
        if err.is_timeout() {
            FallbackError::Timeout(self.policy.timeout)
        } else {
            FallbackError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl GenerativeFallback for HttpCompletionFallback {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn synthesize(
        &self,
        node: &GraphNode,
        context: &FallbackContext,
        cancel: &CancellationToken,
    ) -> Result<SynthesizedNode, FallbackError> {
        let prompt = prompt::node_prompt(node, context);
        tracing::debug!(node = %node.name, endpoint = %self.endpoint, "requesting node synthesis");
        let completion = self
            .complete(prompt::NODE_SYSTEM_PROMPT, &prompt, NODE_MAX_TOKENS, cancel)
            .await?;
        prompt::parse_node(&completion)
    }

    async fn translate_expression(
        &self,
        expression: &str,
        source: Platform,
        target: Platform,
        _context: &ExpressionContext,
        cancel: &CancellationToken,
    ) -> Result<String, FallbackError> {
        let prompt = prompt::expression_prompt(expression, source, target);
        let completion = self
            .complete(prompt::EXPRESSION_SYSTEM_PROMPT, &prompt, EXPRESSION_MAX_TOKENS, cancel)
            .await?;
        prompt::parse_expression(&completion)
    }

    async fn health(&self) -> FallbackHealth {
        let request = CompletionRequest {
            model: &self.model,
            system: HEALTH_PROBE_PROMPT,
            prompt: "ping",
            max_tokens: 1,
        };
        let probe = tokio::time::timeout(self.policy.timeout, self.send(&request)).await;
        let (reachable, detail) = match probe {
            Ok(Ok(_)) => (true, None),
            Ok(Err(err)) => (false, Some(err.to_string())),
            Err(_) => (false, Some(FallbackError::Timeout(self.policy.timeout).to_string())),
        };
        FallbackHealth {
            adapter: self.name().to_string(),
            configured: true,
            reachable,
            detail,
        }
    }
}
