use flowbridge::core::expression::{
    self, count_expressions, ExpressionContext, Reference, ReferenceTarget, RewriteOutcome, Segment,
};
use flowbridge::core::platform::Platform;
use serde_json::json;
use std::collections::HashMap;

fn context(pairs: &[(&str, &str)], upstream: Option<&str>) -> ExpressionContext {
    ExpressionContext {
        upstream: upstream.map(str::to_string),
        nodes: pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>(),
        passthrough_unknown_keys: false,
    }
}

#[test]
fn test_parse_n8n_segments() {
    let segments = expression::parse("=Hello {{ $json.user.name }}!", Platform::N8n);
    assert_eq!(
        segments,
        vec![
            Segment::Literal("Hello ".to_string()),
            Segment::Reference(Reference {
                target: ReferenceTarget::Current,
                path: vec!["user".to_string(), "name".to_string()],
            }),
            Segment::Literal("!".to_string()),
        ]
    );
}

#[test]
fn test_parse_legacy_node_syntax() {
    let segments = expression::parse("={{ $node[\"Get Order\"].json.total }}", Platform::N8n);
    assert_eq!(
        segments,
        vec![Segment::Reference(Reference {
            target: ReferenceTarget::Node("Get Order".to_string()),
            path: vec!["total".to_string()],
        })]
    );
}

#[test]
fn test_parse_keeps_complex_bodies_verbatim() {
    let segments = expression::parse("{{formatDate(now; \"YYYY\")}}", Platform::Make);
    assert_eq!(segments, vec![Segment::Complex("{{formatDate(now; \"YYYY\")}}".to_string())]);
}

#[test]
fn test_zapier_to_make() {
    let ctx = context(&[("1", "1"), ("2", "2")], Some("2"));
    let outcome = expression::rewrite("Total: {{2__order__total}}", Platform::Zapier, Platform::Make, &ctx);
    insta::assert_debug_snapshot!(outcome, @r###"
    Rewritten(
        "Total: {{2.order.total}}",
    )
    "###);
}

#[test]
fn test_make_to_zapier_renumbers_modules() {
    let ctx = context(&[("7", "2")], Some("2"));
    let outcome = expression::rewrite("{{7.email}}", Platform::Make, Platform::Zapier, &ctx);
    assert_eq!(outcome, RewriteOutcome::Rewritten("{{2__email}}".to_string()));
}

#[test]
fn test_current_item_uses_upstream_id() {
    let ctx = context(&[], Some("3"));
    let outcome = expression::rewrite(
        "={{ $input.item.json.id }}",
        Platform::N8n,
        Platform::Zapier,
        &ctx,
    );
    assert_eq!(outcome, RewriteOutcome::Rewritten("{{3__id}}".to_string()));
}

#[test]
fn test_current_item_without_upstream_needs_fallback() {
    let ctx = context(&[], None);
    let outcome = expression::rewrite("={{ $json.id }}", Platform::N8n, Platform::Make, &ctx);
    assert!(matches!(outcome, RewriteOutcome::NeedsFallback { .. }));
}

#[test]
fn test_partial_rewrite_keeps_what_it_can() {
    let ctx = context(&[("1", "Trigger")], None);
    let outcome = expression::rewrite(
        "{{1.name}} ordered {{sum(1.items)}}",
        Platform::Make,
        Platform::N8n,
        &ctx,
    );
    match outcome {
        RewriteOutcome::NeedsFallback { partial, reason } => {
            assert_eq!(partial, "={{ $('Trigger').item.json.name }} ordered {{sum(1.items)}}");
            assert!(reason.contains("sum(1.items)"));
        }
        other => panic!("expected fallback, got {other:?}"),
    }
}

#[test]
fn test_quotes_in_node_names_are_escaped() {
    let ctx = context(&[("1", "Bob's Form")], None);
    let outcome = expression::rewrite("{{1__email}}", Platform::Zapier, Platform::N8n, &ctx);
    assert_eq!(
        outcome,
        RewriteOutcome::Rewritten("={{ $('Bob\\'s Form').item.json.email }}".to_string())
    );
}

#[test]
fn test_numeric_path_parts_render_as_indexes() {
    let ctx = context(&[("1", "Sheet")], None);
    let outcome = expression::rewrite("{{1.rows.0.total}}", Platform::Make, Platform::N8n, &ctx);
    assert_eq!(
        outcome,
        RewriteOutcome::Rewritten("={{ $('Sheet').item.json.rows[0].total }}".to_string())
    );
}

#[test]
fn test_standalone_context_passes_unknown_keys() {
    let ctx = ExpressionContext::standalone(Platform::Make);
    let outcome = expression::rewrite("={{ $json.email }}", Platform::N8n, Platform::Make, &ctx);
    assert_eq!(outcome, RewriteOutcome::Rewritten("{{1.email}}".to_string()));
}

#[test]
fn test_rewrite_value_reports_pending() {
    let ctx = context(&[("1", "1")], Some("1"));
    let mut value = json!({
        "text": "={{ $json.name }}",
        "nested": {"list": ["plain", "={{ $json.items.length * 2 }}"]}
    });
    let summary = expression::rewrite_value(&mut value, Platform::N8n, Platform::Zapier, &ctx);
    assert_eq!(summary.rewritten, 1);
    assert_eq!(summary.pending.len(), 1);
    assert_eq!(value["text"], "{{1__name}}");
    assert_eq!(value["nested"]["list"][0], "plain");
    assert_eq!(count_expressions(&value), 2);
}

#[test]
fn test_context_deserializes_from_camel_case() {
    let ctx: ExpressionContext = serde_json::from_value(json!({
        "upstream": "2",
        "nodes": {"Webhook": "1"},
        "passthroughUnknownKeys": true
    }))
    .unwrap();
    assert_eq!(ctx.upstream.as_deref(), Some("2"));
    assert_eq!(ctx.nodes.get("Webhook").map(String::as_str), Some("1"));
    assert!(ctx.passthrough_unknown_keys);
}
