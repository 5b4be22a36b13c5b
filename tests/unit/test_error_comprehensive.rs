use formrelay::core::dispatch::DeliveryError;
use formrelay::core::error::AppError;
use formrelay::core::extraction::ExtractionError;
use formrelay::core::transform::TransformError;
use formrelay::core::types::{ErrorCategory, ErrorSeverity, RunPhase, RunStatus};

#[test]
fn test_new_error_defaults() {
    let error = AppError::new(ErrorCategory::ConfigurationError, "missing endpoints");
    assert_eq!(error.category, ErrorCategory::ConfigurationError);
    assert_eq!(error.severity(), ErrorSeverity::Error);
    assert!(error.code.starts_with("ERR-"));
    assert!(error.context.is_empty());
    assert!(error.source.is_none());
}

#[test]
fn test_unknown_category_is_informational() {
    let error = AppError::new(ErrorCategory::Unknown, "odd");
    assert_eq!(error.severity(), ErrorSeverity::Info);
}

#[test]
fn test_context_is_rendered_in_display() {
    let error = AppError::new(ErrorCategory::DeliveryError, "POST failed")
        .with_code("FR-DELIVERY-001")
        .with_context("endpoint", "AuditLogService")
        .with_context("customer_id", "CUST789");
    let rendered = error.to_string();
    assert!(rendered.starts_with("[FR-DELIVERY-001] DeliveryError: POST failed"));
    assert!(rendered.contains("AuditLogService"));
    assert!(rendered.contains("CUST789"));
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let error: AppError = io.into();
    assert_eq!(error.category, ErrorCategory::IoError);
    assert_eq!(error.code, "FR-IO-001");
    assert!(error.to_string().contains("Caused by: gone"));
}

#[test]
fn test_json_error_conversion() {
    let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let error: AppError = err.into();
    assert_eq!(error.category, ErrorCategory::SerializationError);
    assert_eq!(error.code, "FR-SERDE-001");
}

#[test]
fn test_transform_error_becomes_app_error_with_field_context() {
    let err = TransformError::Malformed {
        step: "dob-MMDDYYYY".to_string(),
        field: "dateOfBirth".to_string(),
        message: "invalid date format: 'soon'".to_string(),
    };
    let error: AppError = err.into();
    assert_eq!(error.category, ErrorCategory::TransformError);
    assert_eq!(error.code, "FR-TRANSFORM-001");
    assert_eq!(error.context.get("field").map(String::as_str), Some("dateOfBirth"));
}

#[test]
fn test_extraction_failure_keeps_extraction_code() {
    let err = TransformError::Extraction {
        field: "personalName".to_string(),
        source: ExtractionError::Status {
            status: 429,
            body: "slow down".to_string(),
        },
    };
    let error: AppError = err.into();
    assert_eq!(error.category, ErrorCategory::ExtractionError);
    assert_eq!(error.code, "FR-EXTRACT-003");
    assert!(error.message.contains("429"));
}

#[test]
fn test_delivery_error_codes() {
    let timeout = DeliveryError::Timeout {
        url: "https://example.com".to_string(),
        timeout_ms: 10,
    };
    assert_eq!(timeout.code(), "FR-DELIVERY-002");
    assert!(timeout.to_string().contains("timed out after 10 ms"));
    assert_eq!(DeliveryError::Other("nope".to_string()).code(), "FR-DELIVERY-003");
}

#[test]
fn test_run_phase_transitions() {
    assert!(RunPhase::Idle.can_transition_to(RunPhase::Validating));
    assert!(RunPhase::Validating.can_transition_to(RunPhase::Aborted));
    assert!(RunPhase::Validating.can_transition_to(RunPhase::Dispatching));
    assert!(RunPhase::Dispatching.can_transition_to(RunPhase::Completed));
    assert!(!RunPhase::Idle.can_transition_to(RunPhase::Dispatching));
    assert!(!RunPhase::Aborted.can_transition_to(RunPhase::Dispatching));
    assert!(RunPhase::Aborted.is_terminal());
    assert!(RunPhase::Completed.is_terminal());
    assert!(!RunPhase::Dispatching.is_terminal());
    assert_eq!(RunPhase::from(RunStatus::Aborted), RunPhase::Aborted);
}
