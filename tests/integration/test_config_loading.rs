use formrelay::core::config::{ConfigLoader, CustomerConfig, TransformSpec};
use formrelay::core::expression::ExpressionEngine;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn clear_formrelay_env() {
    for var in &[
        "FORMRELAY_DELIVERY_TIMEOUT_MS",
        "FORMRELAY_RETRY_RETRIES",
        "FORMRELAY_RETRY_DELAY_MS",
        "FORMRELAY_RETRY_BACKOFF_FACTOR",
        "FORMRELAY_EXTRACTION_ENABLED",
        "FORMRELAY_EXTRACTION_BASE_URL",
        "FORMRELAY_EXTRACTION_MODEL",
    ] {
        env::remove_var(var);
    }
}

#[test]
fn test_demo_customer_config_loads_and_validates() {
    let engine = ExpressionEngine::default();
    let config = ConfigLoader::load_customer(&demo("customer.yaml"), &engine).unwrap();

    assert_eq!(config.customer_id, "CUST789");
    assert_eq!(config.endpoints.len(), 15);
    assert_eq!(config.enabled_endpoints().count(), 15);

    let profile = &config.endpoints[0];
    assert_eq!(profile.name, "CustomerProfileAPI");
    assert_eq!(
        profile.transformations.get("personalName"),
        Some(&TransformSpec::Single("splitName".to_string()))
    );
    assert!(profile.include_if.contains_key("emailAddress"));

    let credit = config
        .endpoints
        .iter()
        .find(|endpoint| endpoint.name == "CreditCheckSystem")
        .unwrap();
    let policy = credit.retry_policy(&Default::default());
    assert_eq!(policy.max_retries, 5);
    assert_eq!(policy.base_delay, Duration::from_millis(250));
    assert_eq!(policy.backoff_factor, 1.5);
    assert_eq!(policy.jitter, Duration::from_millis(100));

    assert_eq!(config.defaults.get("agentID"), Some(&serde_json::json!("AGT456")));
    assert_eq!(config.validation_rules.len(), 3);
}

#[test]
fn test_json_customer_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("customer.json");
    std::fs::write(
        &path,
        r#"{
            "customer_id": "CUST1",
            "endpoints": [{
                "name": "Consent",
                "url": "http://localhost:9000/consent",
                "fields": ["customerID", "consentGiven"],
                "transformations": {"consentGiven": ["llm", "boolStr"]},
                "enabled": false
            }]
        }"#,
    )
    .unwrap();

    let config = ConfigLoader::load_customer(&path, &ExpressionEngine::default()).unwrap();
    let endpoint = &config.endpoints[0];
    assert!(!endpoint.enabled);
    assert_eq!(
        endpoint.transformations["consentGiven"].identifiers(),
        vec!["llm", "boolStr"]
    );
    assert_eq!(config.enabled_endpoints().count(), 0);
}

#[test]
fn test_invalid_customer_configs_are_rejected() {
    let engine = ExpressionEngine::default();
    let cases = [
        ("customer_id: ''\nendpoints: []\n", "FR-CONFIG-002"),
        ("customer_id: C1\nendpoints: []\n", "FR-CONFIG-002"),
        (
            "customer_id: C1\nendpoints:\n  - {name: A, url: 'ftp://x.test', fields: [customerID]}\n",
            "FR-CONFIG-004",
        ),
        (
            "customer_id: C1\nendpoints:\n  - {name: A, url: 'https://x.test', fields: []}\n",
            "FR-CONFIG-005",
        ),
        (
            "customer_id: C1\nendpoints:\n  - {name: A, url: 'https://x.test', fields: [shoeSize]}\n",
            "FR-CONFIG-006",
        ),
        (
            "customer_id: C1\nendpoints:\n  - {name: A, url: 'https://x.test', fields: [customerID], transformations: {customerID: []}}\n",
            "FR-CONFIG-007",
        ),
        (
            "customer_id: C1\nendpoints:\n  - {name: A, url: 'https://x.test', fields: [customerID], include_if: {customerID: {$expr: 'form.('}}}\n",
            "FR-EXPR-001",
        ),
        (
            "customer_id: C1\nendpoints:\n  - {name: A, url: 'https://x.test', fields: [customerID], headers: {'Bad Header': x}}\n",
            "FR-CONFIG-011",
        ),
        (
            "customer_id: C1\nendpoints:\n  - {name: A, url: 'https://x.test', fields: [customerID], headers: {X-Token: \"line\\nbreak\"}}\n",
            "FR-CONFIG-011",
        ),
        (
            "customer_id: C1\nendpoints:\n  - {name: A, url: 'https://x.test', fields: [customerID], headers: {Content-Type: text/plain}}\n",
            "FR-CONFIG-011",
        ),
    ];

    for (yaml, code) in cases {
        let config: CustomerConfig = serde_yaml::from_str(yaml).unwrap();
        let err = config.validate(&engine).unwrap_err();
        assert_eq!(err.code, code, "config: {}", yaml);
    }
}

#[test]
fn test_unparseable_customer_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("customer.yaml");
    std::fs::write(&path, "customer_id: [unterminated").unwrap();

    let err = CustomerConfig::load(&path).unwrap_err();
    assert_eq!(err.code, "FR-CONFIG-001");
}

#[test]
#[serial]
fn test_demo_settings_file() {
    clear_formrelay_env();
    let settings = ConfigLoader::load_settings(Some(&demo("formrelay.toml"))).unwrap();
    assert!(!settings.extraction.enabled);
    assert!(settings.delivery.timeout_ms > 0);
}

#[test]
#[serial]
fn test_env_overrides_take_precedence_over_file() {
    clear_formrelay_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("formrelay.toml");
    std::fs::write(&path, "[retry]\nretries = 1\ndelay_ms = 50\n").unwrap();

    env::set_var("FORMRELAY_RETRY_RETRIES", "7");
    env::set_var("FORMRELAY_DELIVERY_TIMEOUT_MS", "1500");
    let settings = ConfigLoader::load_settings(Some(&path));
    clear_formrelay_env();

    let settings = settings.unwrap();
    assert_eq!(settings.retry.retries, 7);
    assert_eq!(settings.retry.delay_ms, 50);
    assert_eq!(settings.delivery.timeout_ms, 1500);
}

#[test]
#[serial]
fn test_invalid_env_override_fails_validation() {
    clear_formrelay_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("formrelay.toml");
    std::fs::write(&path, "").unwrap();

    env::set_var("FORMRELAY_RETRY_BACKOFF_FACTOR", "0.5");
    let result = ConfigLoader::load_settings(Some(&path));
    clear_formrelay_env();

    assert_eq!(result.unwrap_err().code, "FR-CONFIG-010");
}
