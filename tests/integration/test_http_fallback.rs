use flowbridge::core::config::FallbackConfig;
use flowbridge::core::engine::{EngineSettings, TranslationEngine, TranslationRequest};
use flowbridge::core::expression::ExpressionContext;
use flowbridge::core::fallback::{
    FallbackContext, FallbackError, FallbackPolicy, GenerativeFallback, HttpCompletionFallback,
};
use flowbridge::core::graph::{GraphNode, NodeRole};
use flowbridge::core::knowledge::PlatformKnowledge;
use flowbridge::core::platform::Platform;
use flowbridge::core::platforms::PlatformWorkflow;
use serde_json::{json, Map};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fallback(server: &MockServer, max_retries: u32) -> HttpCompletionFallback {
    let endpoint = Url::parse(&format!("{}/v1/complete", server.uri())).expect("url");
    HttpCompletionFallback::new(
        endpoint,
        "workflow-model",
        Some("secret-key".to_string()),
        FallbackPolicy {
            timeout: Duration::from_secs(2),
            max_retries,
        },
    )
}

fn code_node() -> GraphNode {
    let mut parameters = Map::new();
    parameters.insert("jsCode".to_string(), json!("return items.filter(i => i.json.ok);"));
    GraphNode::new("Filter Items", "Filter Items", "n8n-nodes-base.code", parameters, NodeRole::Action)
}

fn context() -> FallbackContext {
    FallbackContext {
        source_platform: Platform::N8n,
        target_platform: Platform::Make,
        workflow_name: "orders".to_string(),
        upstream_types: vec!["n8n-nodes-base.webhook".to_string()],
        downstream_types: Vec::new(),
    }
}

#[tokio::test]
async fn test_synthesize_sends_model_and_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/complete"))
        .and(header("authorization", "Bearer secret-key"))
        .and(body_partial_json(json!({"model": "workflow-model", "maxTokens": 1024})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "completion": "```json\n{\"type\": \"code:ExecuteCode\", \"parameters\": {\"code\": \"return input;\"}}\n```"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let node = fallback(&server, 0)
        .synthesize(&code_node(), &context(), &CancellationToken::new())
        .await
        .expect("synthesized");
    assert_eq!(node.type_id, "code:ExecuteCode");
    assert_eq!(node.parameters["code"], json!("return input;"));
}

#[tokio::test]
async fn test_text_field_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "`{{1.total}}`"})))
        .mount(&server)
        .await;

    let expression = fallback(&server, 0)
        .translate_expression(
            "={{ $json.total }}",
            Platform::N8n,
            Platform::Make,
            &ExpressionContext::default(),
            &CancellationToken::new(),
        )
        .await
        .expect("translated");
    assert_eq!(expression, "{{1.total}}");
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"completion": "{{2__total}}"})))
        .expect(1)
        .mount(&server)
        .await;

    let expression = fallback(&server, 1)
        .translate_expression(
            "{{2.total}}",
            Platform::Make,
            Platform::Zapier,
            &ExpressionContext::default(),
            &CancellationToken::new(),
        )
        .await
        .expect("second attempt succeeds");
    assert_eq!(expression, "{{2__total}}");
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let err = fallback(&server, 3)
        .synthesize(&code_node(), &context(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FallbackError::Server { status: 400 }));
}

#[tokio::test]
async fn test_reply_without_completion_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = fallback(&server, 1)
        .synthesize(&code_node(), &context(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FallbackError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_health_reports_reachability() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"completion": "ok"})))
        .mount(&server)
        .await;
    let health = fallback(&server, 0).health().await;
    assert!(health.configured);
    assert!(health.reachable);
    assert_eq!(health.adapter, "http");

    let down = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&down)
        .await;
    let health = fallback(&down, 0).health().await;
    assert!(!health.reachable);
    assert!(health.detail.unwrap_or_default().contains("500"));
}

#[tokio::test]
async fn test_engine_uses_the_endpoint_for_unmapped_nodes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "completion": "{\"type\": \"code:ExecuteCode\", \"parameters\": {\"code\": \"return input;\"}}"
        })))
        .mount(&server)
        .await;

    let knowledge = Arc::new(PlatformKnowledge::builtin().expect("knowledge"));
    let engine = TranslationEngine::new(knowledge, Arc::new(fallback(&server, 0)), EngineSettings::default());
    let workflow = json!({
        "name": "script",
        "nodes": [{"id": "1", "name": "Run Script", "type": "n8n-nodes-base.code", "position": [0, 0],
                   "parameters": {"jsCode": "return items;"}}],
        "connections": {}
    });
    let result = engine
        .translate(
            TranslationRequest::new(workflow, Platform::N8n, Platform::Make),
            &CancellationToken::new(),
        )
        .await;
    assert!(result.success);
    assert_eq!(result.metadata.fallback_nodes, 1);
    let Some(PlatformWorkflow::Make(scenario)) = result.workflow else {
        panic!("expected a Make scenario");
    };
    assert_eq!(scenario.flow[0].module, "code:ExecuteCode");
}

#[test]
fn test_from_config_rejects_bad_endpoint() {
    let config = FallbackConfig {
        endpoint: Some("not a url".to_string()),
        ..Default::default()
    };
    let err = HttpCompletionFallback::from_config(&config).err().expect("invalid endpoint");
    assert_eq!(err.code, "FLOW-CONFIG-001");
}

#[test]
fn test_from_config_reads_policy() {
    let config = FallbackConfig {
        endpoint: Some("http://localhost:9/complete".to_string()),
        timeout: "3s".to_string(),
        max_retries: 2,
        ..Default::default()
    };
    let fallback = HttpCompletionFallback::from_config(&config).expect("valid config");
    assert_eq!(fallback.policy().timeout, Duration::from_secs(3));
    assert_eq!(fallback.policy().max_retries, 2);
}
