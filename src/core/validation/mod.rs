//! The validation gate: intrinsic field checks plus customer predicate rules.
//!
//! Every check runs on every submission so the caller always receives the
//! complete violation list. Violations are data, never errors.

use crate::core::config::Condition;
use crate::core::dates::{age_on, parse_instant};
use crate::core::expression::ExpressionEngine;
use crate::core::submission::Submission;
use chrono::{NaiveDate, Utc};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Minimum age implied by the date of birth.
pub const MINIMUM_AGE: i32 = 18;

const MIN_CREDIT_SCORE: f64 = 300.0;
const MAX_CREDIT_SCORE: f64 = 850.0;

/// The fixed battery of field checks applied to every submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrinsicCheck {
    FullName,
    DateOfBirth,
    Email,
    Phone,
    CreditScore,
    CustomerId,
    Consent,
    IpAddress,
}

impl IntrinsicCheck {
    pub const ALL: [IntrinsicCheck; 8] = [
        IntrinsicCheck::FullName,
        IntrinsicCheck::DateOfBirth,
        IntrinsicCheck::Email,
        IntrinsicCheck::Phone,
        IntrinsicCheck::CreditScore,
        IntrinsicCheck::CustomerId,
        IntrinsicCheck::Consent,
        IntrinsicCheck::IpAddress,
    ];

    pub fn field(&self) -> &'static str {
        match self {
            IntrinsicCheck::FullName => "personalName",
            IntrinsicCheck::DateOfBirth => "dateOfBirth",
            IntrinsicCheck::Email => "emailAddress",
            IntrinsicCheck::Phone => "phoneNumber",
            IntrinsicCheck::CreditScore => "creditScore",
            IntrinsicCheck::CustomerId => "customerID",
            IntrinsicCheck::Consent => "consentGiven",
            IntrinsicCheck::IpAddress => "ipAddress",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            IntrinsicCheck::FullName => {
                "Invalid personalName. Must include at least first and last name."
            }
            IntrinsicCheck::DateOfBirth => "Invalid dateOfBirth or user is under 18.",
            IntrinsicCheck::Email => "Invalid emailAddress.",
            IntrinsicCheck::Phone => "Invalid phoneNumber.",
            IntrinsicCheck::CreditScore => "creditScore must be between 300 and 850.",
            IntrinsicCheck::CustomerId => "customerID is required.",
            IntrinsicCheck::Consent => "consentGiven must be true or false.",
            IntrinsicCheck::IpAddress => "Invalid ipAddress format.",
        }
    }

    /// Whether `value` (the submission's value for [`Self::field`]) passes this check.
    pub fn passes(&self, value: Option<&Value>, today: NaiveDate) -> bool {
        match self {
            IntrinsicCheck::FullName => as_str(value).map(is_full_name).unwrap_or(false),
            IntrinsicCheck::DateOfBirth => as_str(value)
                .map(|dob| is_adult_on(dob, today))
                .unwrap_or(false),
            IntrinsicCheck::Email => as_str(value)
                .map(|email| email_regex().is_match(email))
                .unwrap_or(false),
            IntrinsicCheck::Phone => as_str(value)
                .map(|phone| phone_regex().is_match(phone))
                .unwrap_or(false),
            IntrinsicCheck::CreditScore => value
                .and_then(Value::as_f64)
                .map(|score| (MIN_CREDIT_SCORE..=MAX_CREDIT_SCORE).contains(&score))
                .unwrap_or(false),
            IntrinsicCheck::CustomerId => as_str(value)
                .map(|id| !id.trim().is_empty())
                .unwrap_or(false),
            IntrinsicCheck::Consent => matches!(value, Some(Value::Bool(_))),
            IntrinsicCheck::IpAddress => as_str(value)
                .map(|ip| ip_regex().is_match(ip))
                .unwrap_or(false),
        }
    }
}

fn as_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str)
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^[0-9\-+\s()]{7,20}$").unwrap())
}

fn ip_regex() -> &'static Regex {
    static IP: OnceLock<Regex> = OnceLock::new();
    IP.get_or_init(|| {
        Regex::new(r"^(25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)(\.(25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)){3}$").unwrap()
    })
}

/// At least a first and a last name separated by a space.
pub fn is_full_name(name: &str) -> bool {
    name.trim().split(' ').count() >= 2
}

/// True when `dob` parses and the person is at least [`MINIMUM_AGE`] on `today`.
pub fn is_adult_on(dob: &str, today: NaiveDate) -> bool {
    match parse_instant(dob) {
        Ok(instant) => age_on(instant.date_naive(), today) >= MINIMUM_AGE,
        Err(_) => false,
    }
}

/// Validate a submission against the intrinsic checks and `rules`, using today's UTC date.
pub fn validate_submission(
    submission: &Submission,
    rules: &IndexMap<String, Condition>,
    engine: &ExpressionEngine,
) -> Vec<String> {
    validate_submission_on(submission, rules, engine, Utc::now().date_naive())
}

/// Same as [`validate_submission`] with an explicit reference date.
pub fn validate_submission_on(
    submission: &Submission,
    rules: &IndexMap<String, Condition>,
    engine: &ExpressionEngine,
    today: NaiveDate,
) -> Vec<String> {
    let mut violations: Vec<String> = IntrinsicCheck::ALL
        .iter()
        .filter(|check| !check.passes(submission.get(check.field()), today))
        .map(|check| check.message().to_string())
        .collect();

    if rules.is_empty() {
        return violations;
    }

    let form = submission.to_value();
    for (field, rule) in rules {
        let passed = match engine.check(rule, &form, submission.get(field)) {
            Ok(passed) => passed,
            Err(err) => {
                tracing::warn!(field = %field, error = %err, "custom validation rule failed to evaluate");
                false
            }
        };
        if !passed {
            violations.push(format!("Custom validation failed for {}", field));
        }
    }

    violations
}
