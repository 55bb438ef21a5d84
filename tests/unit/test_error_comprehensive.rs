use flowbridge::core::error::AppError;
use flowbridge::core::fallback::FallbackError;
use flowbridge::core::knowledge::{KnowledgeError, PlatformKnowledge};
use flowbridge::core::platform::Platform;
use flowbridge::core::types::{ErrorCategory, ErrorSeverity};
use std::time::Duration;

#[test]
fn test_error_creation_all_categories() {
    let categories = vec![
        ErrorCategory::ValidationError,
        ErrorCategory::PlatformError,
        ErrorCategory::ConfigurationError,
        ErrorCategory::KnowledgeError,
        ErrorCategory::FallbackError,
        ErrorCategory::TimeoutError,
        ErrorCategory::SerializationError,
        ErrorCategory::IoError,
        ErrorCategory::InternalError,
        ErrorCategory::Unknown,
    ];

    for category in categories {
        let error = AppError::new(category, "test message");
        assert_eq!(error.category, category);
        assert_eq!(error.message, "test message");
        assert!(error.context.is_empty());
        assert!(error.recovery_suggestions.is_empty());
        assert!(error.occurred_at <= chrono::Utc::now());
        assert!(error.source.is_none());
        assert!(error.code.starts_with("ERR-"));
    }
}

#[test]
fn test_error_severity_mapping() {
    let test_cases = vec![
        (ErrorCategory::ValidationError, ErrorSeverity::Error),
        (ErrorCategory::PlatformError, ErrorSeverity::Error),
        (ErrorCategory::ConfigurationError, ErrorSeverity::Error),
        (ErrorCategory::KnowledgeError, ErrorSeverity::Error),
        (ErrorCategory::TimeoutError, ErrorSeverity::Error),
        (ErrorCategory::FallbackError, ErrorSeverity::Warning),
        (ErrorCategory::Unknown, ErrorSeverity::Info),
    ];

    for (category, expected_severity) in test_cases {
        let error = AppError::new(category, "test");
        assert_eq!(error.severity(), expected_severity);
    }
}

#[test]
fn test_error_display_includes_code_and_context() {
    let mut error = AppError::new(ErrorCategory::ValidationError, "workflow has no steps")
        .with_code("FLOW-INPUT-001");
    error.add_context("tool", "translate_workflow");

    let rendered = error.to_string();
    assert!(rendered.starts_with("[FLOW-INPUT-001] ValidationError: workflow has no steps"));
    assert!(rendered.contains("translate_workflow"));
}

#[test]
fn test_unknown_platform_error() {
    let error = Platform::parse("airflow").unwrap_err();
    assert_eq!(error.code, "FLOW-PLATFORM-001");
    assert_eq!(error.category, ErrorCategory::PlatformError);
    assert!(error.message.contains("airflow"));
    assert_eq!(error.recovery_suggestions.len(), 1);
}

#[test]
fn test_fallback_error_conversion() {
    let error: AppError = FallbackError::Server { status: 503 }.into();
    assert_eq!(error.code, "FLOW-FALLBACK-001");
    assert_eq!(error.category, ErrorCategory::FallbackError);
    assert_eq!(error.severity(), ErrorSeverity::Warning);

    let timeout: AppError = FallbackError::Timeout(Duration::from_secs(20)).into();
    assert_eq!(timeout.category, ErrorCategory::TimeoutError);
}

#[test]
fn test_knowledge_error_conversion() {
    let err = PlatformKnowledge::from_json("{ not json", "{}").unwrap_err();
    assert!(matches!(err, KnowledgeError::Parse { .. }));

    let error: AppError = err.into();
    assert_eq!(error.code, "FLOW-KNOWLEDGE-001");
    assert_eq!(error.category, ErrorCategory::KnowledgeError);
    assert!(error.source.is_some());
    assert!(!error.recovery_suggestions.is_empty());
}

#[test]
fn test_serde_json_error_conversion() {
    let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: AppError = err.into();
    assert_eq!(error.category, ErrorCategory::SerializationError);
    assert_eq!(error.code, "FLOW-JSON-001");
}

#[test]
fn test_io_error_conversion() {
    let err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
    let error: AppError = err.into();
    assert_eq!(error.category, ErrorCategory::IoError);
    assert!(error.message.contains("missing.json"));
}

#[test]
fn test_anyhow_error_conversion() {
    let error: AppError = anyhow::anyhow!("boom").into();
    assert_eq!(error.category, ErrorCategory::InternalError);
    assert_eq!(error.message, "boom");
}

#[test]
fn test_malformed_workflow_error() {
    let error = flowbridge::core::platforms::PlatformWorkflow::from_value(
        Platform::Zapier,
        &serde_json::json!({"steps": "nope"}),
    )
    .unwrap_err();
    assert_eq!(error.code, "FLOW-INPUT-002");
    assert!(error.message.contains("Zapier"));
}
