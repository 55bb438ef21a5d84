use async_trait::async_trait;
use flowbridge::core::engine::{EngineSettings, TranslationEngine, TranslationOptions, TranslationRequest};
use flowbridge::core::expression::ExpressionContext;
use flowbridge::core::fallback::{
    DisabledFallback, FallbackContext, FallbackError, FallbackHealth, GenerativeFallback, SynthesizedNode,
};
use flowbridge::core::graph::GraphNode;
use flowbridge::core::knowledge::PlatformKnowledge;
use flowbridge::core::platform::Platform;
use flowbridge::core::platforms::{PlatformWorkflow, ZapierStepType};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Answers every node with a fixed Make code module.
struct ScriptedFallback;

#[async_trait]
impl GenerativeFallback for ScriptedFallback {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn synthesize(
        &self,
        _node: &GraphNode,
        _context: &FallbackContext,
        _cancel: &CancellationToken,
    ) -> Result<SynthesizedNode, FallbackError> {
        let mut parameters = Map::new();
        parameters.insert("code".to_string(), json!("return input;"));
        Ok(SynthesizedNode {
            type_id: "code:ExecuteCode".to_string(),
            parameters,
            name: Some("Script".to_string()),
        })
    }

    async fn translate_expression(
        &self,
        _expression: &str,
        _source: Platform,
        _target: Platform,
        _context: &ExpressionContext,
        _cancel: &CancellationToken,
    ) -> Result<String, FallbackError> {
        Ok("{{1.total}}".to_string())
    }

    async fn health(&self) -> FallbackHealth {
        FallbackHealth {
            adapter: "scripted".to_string(),
            configured: true,
            reachable: true,
            detail: None,
        }
    }
}

fn engine_with(fallback: Arc<dyn GenerativeFallback>) -> TranslationEngine {
    let knowledge = Arc::new(PlatformKnowledge::builtin().expect("knowledge"));
    TranslationEngine::new(knowledge, fallback, EngineSettings::default())
}

fn engine() -> TranslationEngine {
    engine_with(Arc::new(DisabledFallback))
}

async fn translate(engine: &TranslationEngine, workflow: Value, source: Platform, target: Platform) -> flowbridge::core::engine::TranslationResult {
    engine
        .translate(TranslationRequest::new(workflow, source, target), &CancellationToken::new())
        .await
}

fn code_only_workflow() -> Value {
    json!({
        "name": "script",
        "nodes": [{
            "id": "1", "name": "Run Script", "type": "n8n-nodes-base.code",
            "position": [0, 0], "parameters": {"jsCode": "return items;"}
        }],
        "connections": {}
    })
}

fn order_workflow() -> Value {
    json!({
        "name": "Orders",
        "nodes": [
            {"id": "a", "name": "Webhook", "type": "n8n-nodes-base.webhook", "position": [0, 0], "parameters": {"path": "orders"}},
            {"id": "b", "name": "Notify", "type": "n8n-nodes-base.slack", "position": [200, 0],
             "parameters": {"channel": "#sales", "text": "=New order from {{ $json.email }}"}}
        ],
        "connections": {"Webhook": {"main": [[{"node": "Notify", "type": "main", "index": 0}]]}}
    })
}

#[tokio::test]
async fn test_http_call_to_known_service_becomes_native_node() {
    let zap = json!({
        "title": "post",
        "steps": [
            {"id": 1, "type": "trigger", "app": "webhook", "event": "catch_hook", "parameters": {}},
            {"id": 2, "type": "action", "app": "webhook", "event": "custom_request",
             "parameters": {"url": "https://slack.com/api/chat.postMessage", "method": "post"}}
        ]
    });
    let result = translate(&engine(), zap, Platform::Zapier, Platform::N8n).await;
    assert!(result.success, "{:?}", result.errors);

    let Some(PlatformWorkflow::N8n(workflow)) = result.workflow else {
        panic!("expected an n8n workflow");
    };
    let types: Vec<&str> = workflow.nodes.iter().map(|node| node.node_type.as_str()).collect();
    assert_eq!(types, vec!["n8n-nodes-base.webhook", "n8n-nodes-base.slack"]);
    assert_eq!(workflow.nodes[0].parameters["httpMethod"], json!("POST"));
    assert!(result
        .metadata
        .optimizations_applied
        .contains(&"native_node_substitution".to_string()));
}

#[tokio::test]
async fn test_without_optimize_the_http_node_stays() {
    let zap = json!({
        "title": "post",
        "steps": [
            {"id": 1, "type": "trigger", "app": "webhook", "event": "catch_hook", "parameters": {}},
            {"id": 2, "type": "action", "app": "webhook", "event": "custom_request",
             "parameters": {"url": "https://slack.com/api/chat.postMessage", "method": "post"}}
        ]
    });
    let request = TranslationRequest::new(zap, Platform::Zapier, Platform::N8n).with_options(TranslationOptions {
        optimize: false,
        ..Default::default()
    });
    let result = engine().translate(request, &CancellationToken::new()).await;
    let Some(PlatformWorkflow::N8n(workflow)) = result.workflow else {
        panic!("expected an n8n workflow");
    };
    assert_eq!(workflow.nodes[1].node_type, "n8n-nodes-base.httpRequest");
    assert_eq!(workflow.nodes[1].parameters["method"], json!("POST"));
    assert!(result.metadata.optimizations_applied.is_empty());
}

#[tokio::test]
async fn test_empty_workflow_fails() {
    let result = translate(&engine(), json!({"nodes": []}), Platform::N8n, Platform::Make).await;
    assert!(!result.success);
    assert!(result.workflow.is_none());
    assert_eq!(result.errors, vec!["workflow has no nodes to translate".to_string()]);
}

#[tokio::test]
async fn test_malformed_document_fails_with_platform_name() {
    let result = translate(&engine(), json!({"steps": "nope"}), Platform::Zapier, Platform::Make).await;
    assert!(!result.success);
    assert!(result.errors[0].contains("Zapier"));
}

#[tokio::test]
async fn test_unmappable_node_is_skipped_with_warning() {
    let result = translate(&engine(), code_only_workflow(), Platform::N8n, Platform::Make).await;
    assert!(result.success);
    assert_eq!(result.metadata.skipped_nodes, 1);
    assert_eq!(result.metadata.translated_nodes, 0);
    assert!(result.warnings.iter().any(|w| w.contains("'Run Script'")));
    assert_eq!(result.metadata.accuracy_score, 85.0);
}

#[tokio::test]
async fn test_fallback_synthesizes_unmappable_node() {
    let result = translate(
        &engine_with(Arc::new(ScriptedFallback)),
        code_only_workflow(),
        Platform::N8n,
        Platform::Make,
    )
    .await;
    assert!(result.success);
    assert_eq!(result.metadata.skipped_nodes, 0);
    assert_eq!(result.metadata.fallback_nodes, 1);
    assert!(result.warnings.iter().any(|w| w.contains("synthesized")));

    let Some(PlatformWorkflow::Make(scenario)) = result.workflow else {
        panic!("expected a Make scenario");
    };
    assert_eq!(scenario.flow.len(), 1);
    assert_eq!(scenario.flow[0].module, "code:ExecuteCode");
}

#[tokio::test]
async fn test_expressions_follow_the_target_dialect() {
    let result = translate(&engine(), order_workflow(), Platform::N8n, Platform::Make).await;
    assert!(result.success, "{:?}", result.errors);
    let Some(PlatformWorkflow::Make(scenario)) = result.workflow else {
        panic!("expected a Make scenario");
    };
    assert_eq!(scenario.flow[0].module, "webhook:webhook");
    assert_eq!(scenario.flow[1].module, "slack:createMessage");
    let mapper = scenario.flow[1].mapper.as_ref().expect("templated values go to the mapper");
    assert_eq!(mapper["text"], json!("New order from {{1.email}}"));
}

#[tokio::test]
async fn test_translation_does_not_touch_the_input() {
    let input = order_workflow();
    let request = TranslationRequest::new(input.clone(), Platform::N8n, Platform::Zapier);
    let _ = engine().translate(request.clone(), &CancellationToken::new()).await;
    assert_eq!(request.workflow, input);
}

#[tokio::test]
async fn test_same_platform_copies_with_warning() {
    let result = translate(&engine(), order_workflow(), Platform::N8n, Platform::N8n).await;
    assert!(result.success);
    assert!(result.warnings.iter().any(|w| w.contains("copied unchanged")));
    let Some(PlatformWorkflow::N8n(workflow)) = result.workflow else {
        panic!("expected an n8n workflow");
    };
    let names: Vec<&str> = workflow.nodes.iter().map(|node| node.name.as_str()).collect();
    assert_eq!(names, vec!["Webhook", "Notify"]);
    assert_eq!(workflow.nodes[1].parameters["text"], json!("=New order from {{ $json.email }}"));
}

#[tokio::test]
async fn test_make_copy_keeps_module_ids_so_references_resolve() {
    let scenario = json!({
        "name": "Leads",
        "flow": [
            {"id": 10, "module": "webhook:webhook", "parameters": {}},
            {"id": 20, "module": "slack:createMessage", "parameters": {"channel": "C1"}, "mapper": {"text": "{{10.email}}"}}
        ]
    });
    let result = translate(&engine(), scenario, Platform::Make, Platform::Make).await;
    assert!(result.success, "{:?}", result.errors);
    assert!(result.warnings.iter().any(|w| w.contains("copied unchanged")));
    assert!(!result.warnings.iter().any(|w| w.contains("renumbered")));

    let Some(PlatformWorkflow::Make(scenario)) = result.workflow else {
        panic!("expected a make scenario");
    };
    let ids: Vec<u64> = scenario.flow.iter().map(|module| module.id).collect();
    assert_eq!(ids, vec![10, 20]);
    let mapper = scenario.flow[1].mapper.as_ref().expect("mapper");
    assert_eq!(mapper["text"], json!("{{10.email}}"));
}

#[tokio::test]
async fn test_zapier_copy_keeps_step_ids_so_references_resolve() {
    let zap = json!({
        "title": "Leads",
        "steps": [
            {"id": "a1", "type": "trigger", "app": "webhook", "event": "catch_hook", "parameters": {}},
            {"id": "b2", "type": "action", "app": "slack", "event": "send_channel_message",
             "parameters": {"channel": "#leads", "text": "{{a1__email}}"}}
        ]
    });
    let result = translate(&engine(), zap, Platform::Zapier, Platform::Zapier).await;
    assert!(result.success, "{:?}", result.errors);

    let Some(PlatformWorkflow::Zapier(zap)) = result.workflow else {
        panic!("expected a zap");
    };
    let ids: Vec<&str> = zap.steps.iter().map(|step| step.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "b2"]);
    assert_eq!(zap.steps[1].parameters["text"], json!("{{a1__email}}"));
}

#[tokio::test]
async fn test_zapier_copy_leaves_plain_condition_parameter_alone() {
    let zap = json!({
        "title": "Support",
        "steps": [
            {"id": 1, "type": "trigger", "app": "webhook", "event": "catch_hook", "parameters": {}},
            {"id": 2, "type": "action", "app": "slack", "event": "send_channel_message",
             "parameters": {"channel": "#support", "condition": "urgent"}}
        ]
    });
    let result = translate(&engine(), zap, Platform::Zapier, Platform::Zapier).await;
    assert!(result.success, "{:?}", result.errors);

    let Some(PlatformWorkflow::Zapier(zap)) = result.workflow else {
        panic!("expected a zap");
    };
    assert_eq!(zap.steps.len(), 2);
    assert!(zap.steps.iter().all(|step| step.app != "filter"));
    assert_eq!(zap.steps[1].parameters["condition"], json!("urgent"));
}

#[tokio::test]
async fn test_n8n_copy_keeps_sticky_notes() {
    let mut workflow = order_workflow();
    workflow["nodes"].as_array_mut().expect("nodes").push(json!({
        "id": "c", "name": "Readme", "type": "n8n-nodes-base.stickyNote",
        "position": [0, 300], "parameters": {"content": "Posts new orders to Slack"}
    }));
    let result = translate(&engine(), workflow, Platform::N8n, Platform::N8n).await;
    assert!(result.success, "{:?}", result.errors);
    assert!(!result.warnings.iter().any(|w| w.contains("not translated")));

    let Some(PlatformWorkflow::N8n(workflow)) = result.workflow else {
        panic!("expected an n8n workflow");
    };
    let readme = workflow
        .nodes
        .iter()
        .find(|node| node.name == "Readme")
        .expect("note kept");
    assert_eq!(readme.node_type, "n8n-nodes-base.stickyNote");
    assert_eq!(readme.parameters["content"], json!("Posts new orders to Slack"));
}

#[tokio::test]
async fn test_branches_are_linearized_for_zapier() {
    let workflow = json!({
        "name": "branch",
        "nodes": [
            {"id": "1", "name": "Webhook", "type": "n8n-nodes-base.webhook", "position": [0, 0], "parameters": {}},
            {"id": "2", "name": "IF", "type": "n8n-nodes-base.if", "position": [200, 0], "parameters": {}},
            {"id": "3", "name": "Slack", "type": "n8n-nodes-base.slack", "position": [400, 0], "parameters": {}},
            {"id": "4", "name": "Gmail", "type": "n8n-nodes-base.gmail", "position": [400, 200], "parameters": {}}
        ],
        "connections": {
            "Webhook": {"main": [[{"node": "IF", "type": "main", "index": 0}]]},
            "IF": {"main": [
                [{"node": "Slack", "type": "main", "index": 0}],
                [{"node": "Gmail", "type": "main", "index": 0}]
            ]}
        }
    });
    let result = translate(&engine(), workflow, Platform::N8n, Platform::Zapier).await;
    assert!(result.success);
    assert!(result.warnings.iter().any(|w| w.contains("branches into 2 paths")));
    assert_eq!(result.metadata.feasibility_score, 80.0);

    let Some(PlatformWorkflow::Zapier(zap)) = result.workflow else {
        panic!("expected a zap");
    };
    assert_eq!(zap.status, "draft");
    assert_eq!(zap.steps[0].step_type, ZapierStepType::Trigger);
    assert!(zap.steps[1..]
        .iter()
        .all(|step| step.step_type == ZapierStepType::Action));
    let apps: Vec<&str> = zap.steps.iter().map(|step| step.app.as_str()).collect();
    assert_eq!(apps, vec!["webhook", "filter", "slack", "gmail"]);

    let graph = flowbridge::core::platforms::adapter_for(Platform::Zapier)
        .decode(&serde_json::to_value(&zap).unwrap())
        .unwrap();
    assert!(graph.max_out_degree() <= 1);
}

#[tokio::test]
async fn test_strict_mode_reports_dropped_parameters() {
    let zap = json!({
        "title": "hook",
        "steps": [{"id": 1, "type": "trigger", "app": "webhook", "event": "catch_hook",
                   "parameters": {"path": "in", "method": "PUT"}}]
    });
    let request = TranslationRequest::new(zap, Platform::Zapier, Platform::N8n).with_options(TranslationOptions {
        strict_mode: true,
        ..Default::default()
    });
    let result = engine().translate(request, &CancellationToken::new()).await;
    assert!(result.success);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("parameters not carried over: method")));
}
