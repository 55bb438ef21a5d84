use flowbridge::core::analysis::{
    analyze_workflow_complexity, suggest_best_platform, translation_complexity, BudgetLevel, ComplexityLevel,
    PlatformRequirements, TechnicalLevel,
};
use flowbridge::core::knowledge::{Difficulty, PlatformKnowledge};
use flowbridge::core::platform::Platform;
use serde_json::json;

fn knowledge() -> PlatformKnowledge {
    PlatformKnowledge::builtin().expect("knowledge")
}

#[test]
fn test_known_paths_come_from_the_table() {
    let knowledge = knowledge();
    let hard = translation_complexity(&knowledge, Platform::N8n, Platform::Zapier);
    assert_eq!(hard.difficulty, Difficulty::Hard);
    assert_eq!(hard.success_rate, 0.6);
    assert_eq!(hard.translation_path, "n8n → zapier");

    let easy = translation_complexity(&knowledge, Platform::Zapier, Platform::Make);
    assert_eq!(easy.difficulty, Difficulty::Easy);
    assert_eq!(easy.success_rate, 0.95);
}

#[test]
fn test_every_pair_has_a_complexity() {
    let knowledge = knowledge();
    for source in Platform::ALL {
        for target in Platform::ALL {
            let complexity = translation_complexity(&knowledge, source, target);
            assert!((0.0..=1.0).contains(&complexity.success_rate));
            if source == target {
                assert_eq!(complexity.difficulty, Difficulty::Trivial);
                assert!(complexity.common_issues.is_empty());
            }
        }
    }
}

#[test]
fn test_default_requirements_favor_make() {
    let recommendation = suggest_best_platform(&knowledge(), &PlatformRequirements::default());
    assert_eq!(recommendation.recommended_platform, Platform::Make);
    assert_eq!(recommendation.scores[0].score, 65.0);
    assert!(recommendation
        .reasoning
        .starts_with("Make (Integromat) scores highest (65/100)"));
}

#[test]
fn test_loops_outweigh_the_beginner_bonus() {
    let requirements = PlatformRequirements {
        needs_loops: true,
        team_technical_level: TechnicalLevel::Beginner,
        budget_level: BudgetLevel::High,
        ..Default::default()
    };
    let recommendation = suggest_best_platform(&knowledge(), &requirements);
    assert_eq!(recommendation.recommended_platform, Platform::Make);
    let zapier = recommendation
        .scores
        .iter()
        .find(|score| score.platform == Platform::Zapier)
        .expect("zapier scored");
    assert_eq!(zapier.score, 60.0);
}

#[test]
fn test_self_hosting_picks_n8n() {
    let requirements = PlatformRequirements {
        self_hosting_preferred: true,
        ..Default::default()
    };
    let recommendation = suggest_best_platform(&knowledge(), &requirements);
    assert_eq!(recommendation.recommended_platform, Platform::N8n);
    assert!(recommendation.scores[0]
        .reasons
        .contains(&"can be self-hosted".to_string()));
    let ordered: Vec<f64> = recommendation.scores.iter().map(|score| score.score).collect();
    assert!(ordered.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[test]
fn test_requirements_deserialize_from_camel_case() {
    let requirements: PlatformRequirements = serde_json::from_value(json!({
        "needsCustomCode": true,
        "teamTechnicalLevel": "advanced"
    }))
    .unwrap();
    assert!(requirements.needs_custom_code);
    assert_eq!(requirements.team_technical_level, TechnicalLevel::Advanced);
    assert_eq!(requirements.budget_level, BudgetLevel::Medium);
}

#[test]
fn test_code_and_loops_raise_complexity() {
    let workflow = json!({
        "name": "process",
        "nodes": [
            {"id": "1", "name": "Webhook", "type": "n8n-nodes-base.webhook", "position": [0, 0], "parameters": {}},
            {"id": "2", "name": "Batches", "type": "n8n-nodes-base.splitInBatches", "position": [0, 0], "parameters": {}},
            {"id": "3", "name": "Run Script", "type": "n8n-nodes-base.code", "position": [0, 0], "parameters": {"jsCode": "return items;"}},
            {"id": "4", "name": "Slack", "type": "n8n-nodes-base.slack", "position": [0, 0], "parameters": {}}
        ],
        "connections": {
            "Webhook": {"main": [[{"node": "Batches", "type": "main", "index": 0}]]},
            "Batches": {"main": [[{"node": "Run Script", "type": "main", "index": 0}]]},
            "Run Script": {"main": [[{"node": "Slack", "type": "main", "index": 0}]]}
        }
    });
    let analysis = analyze_workflow_complexity(&knowledge(), &workflow, Platform::N8n).unwrap();
    assert_eq!(analysis.metrics.node_count, 4);
    assert_eq!(analysis.metrics.depth, 4);
    assert_eq!(analysis.metrics.connection_count, 3);
    assert_eq!(analysis.complexity_score, 40.0);
    assert_eq!(analysis.level, ComplexityLevel::Medium);
    assert!(analysis.potential_issues.is_empty());
    assert!(analysis
        .suggestions
        .iter()
        .any(|suggestion| suggestion.contains("Run Script")));
}

#[test]
fn test_short_make_scenario_is_low() {
    let scenario = json!({
        "name": "loose",
        "flow": [
            {"id": 1, "module": "webhook:webhook"},
            {"id": 2, "module": "slack:createMessage"}
        ]
    });
    let analysis = analyze_workflow_complexity(&knowledge(), &scenario, Platform::Make).unwrap();
    assert_eq!(analysis.metrics.components, 1);
    assert_eq!(analysis.level, ComplexityLevel::Low);
    assert_eq!(
        analysis.suggestions,
        vec!["workflow is straightforward; no changes needed".to_string()]
    );
}

#[test]
fn test_zap_without_trigger_is_flagged() {
    let zap = json!({
        "title": "no trigger",
        "steps": [{"id": 1, "type": "action", "app": "slack", "event": "send_channel_message"}]
    });
    let analysis = analyze_workflow_complexity(&knowledge(), &zap, Platform::Zapier).unwrap();
    assert!(analysis
        .potential_issues
        .contains(&"no trigger step found".to_string()));
}

#[test]
fn test_malformed_document_is_an_error() {
    let error = analyze_workflow_complexity(&knowledge(), &json!([1, 2]), Platform::N8n).unwrap_err();
    assert_eq!(error.code, "FLOW-INPUT-002");
}
