use chrono::NaiveDate;
use formrelay::core::config::Condition;
use formrelay::core::expression::ExpressionEngine;
use formrelay::core::validation::{validate_submission_on, IntrinsicCheck};
use formrelay::core::Submission;
use indexmap::IndexMap;
use serde_json::{json, Value};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn valid_form() -> Submission {
    Submission::from_value(json!({
        "personalName": "Alice Johnson",
        "customerID": "CUST789",
        "emailAddress": "alice@trusted.com",
        "phoneNumber": "555-987-6543",
        "dateOfBirth": "1990-05-12",
        "creditScore": 720,
        "consentGiven": true,
        "ipAddress": "192.168.1.15"
    }))
    .unwrap()
}

fn validate(submission: &Submission, rules: &IndexMap<String, Condition>) -> Vec<String> {
    validate_submission_on(submission, rules, &ExpressionEngine::default(), today())
}

#[test]
fn test_valid_submission_has_no_violations() {
    assert!(validate(&valid_form(), &IndexMap::new()).is_empty());
}

#[test]
fn test_missing_customer_id_and_non_boolean_consent() {
    let mut fields: IndexMap<String, Value> = valid_form()
        .fields()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    fields.shift_remove("customerID");
    fields.insert("consentGiven".to_string(), json!("yes"));
    let submission = Submission::new(fields);

    let violations = validate(&submission, &IndexMap::new());
    assert_eq!(
        violations,
        vec![
            "customerID is required.".to_string(),
            "consentGiven must be true or false.".to_string(),
        ]
    );
}

#[test]
fn test_empty_submission_reports_every_intrinsic_check() {
    let violations = validate(&Submission::default(), &IndexMap::new());
    let expected: Vec<String> = IntrinsicCheck::ALL
        .iter()
        .map(|check| check.message().to_string())
        .collect();
    assert_eq!(violations, expected);
}

#[test]
fn test_intrinsic_check_boundaries() {
    let cases = [
        (IntrinsicCheck::FullName, json!("Cher"), false),
        (IntrinsicCheck::FullName, json!("Mary Ann Smith"), true),
        (IntrinsicCheck::DateOfBirth, json!("2006-06-01"), true),
        (IntrinsicCheck::DateOfBirth, json!("2006-06-02"), false),
        (IntrinsicCheck::DateOfBirth, json!("not a date"), false),
        (IntrinsicCheck::Email, json!("user@example"), false),
        (IntrinsicCheck::Email, json!("user@example.com"), true),
        (IntrinsicCheck::Phone, json!("12345"), false),
        (IntrinsicCheck::Phone, json!("+1 (555) 987-6543"), true),
        (IntrinsicCheck::CreditScore, json!(299), false),
        (IntrinsicCheck::CreditScore, json!(300), true),
        (IntrinsicCheck::CreditScore, json!(850), true),
        (IntrinsicCheck::CreditScore, json!(851), false),
        (IntrinsicCheck::CreditScore, json!("720"), false),
        (IntrinsicCheck::CustomerId, json!(""), false),
        (IntrinsicCheck::Consent, json!(false), true),
        (IntrinsicCheck::Consent, json!(1), false),
        (IntrinsicCheck::IpAddress, json!("10.0.0.1"), true),
        (IntrinsicCheck::IpAddress, json!("10.0.0"), false),
        (IntrinsicCheck::IpAddress, json!("300.0.0.1"), false),
    ];
    for (check, value, expected) in cases {
        assert_eq!(
            check.passes(Some(&value), today()),
            expected,
            "{:?} on {}",
            check,
            value
        );
    }
}

#[test]
fn test_null_counts_as_missing() {
    let submission = valid_form().with_field("emailAddress", Value::Null);
    assert_eq!(
        validate(&submission, &IndexMap::new()),
        vec!["Invalid emailAddress.".to_string()]
    );
}

#[test]
fn test_custom_rules_append_after_intrinsic_checks() {
    let mut rules = IndexMap::new();
    rules.insert("creditScore".to_string(), Condition::expr("value >= 750"));
    rules.insert(
        "emailAddress".to_string(),
        Condition::expr(r#"value.ends_with("@trusted.com")"#),
    );
    rules.insert("agentID".to_string(), Condition::Bool(true));

    let violations = validate(&valid_form(), &rules);
    assert_eq!(
        violations,
        vec!["Custom validation failed for creditScore".to_string()]
    );
}

#[test]
fn test_rule_evaluation_error_counts_as_failure() {
    let mut rules = IndexMap::new();
    rules.insert("agentID".to_string(), Condition::expr("value.len() > 2"));

    let violations = validate(&valid_form(), &rules);
    assert_eq!(
        violations,
        vec!["Custom validation failed for agentID".to_string()]
    );
}

#[test]
fn test_rules_see_the_whole_form() {
    let mut rules = IndexMap::new();
    rules.insert(
        "personalName".to_string(),
        Condition::expr(r#"form.customerID.starts_with("CUST")"#),
    );
    assert!(validate(&valid_form(), &rules).is_empty());
}
