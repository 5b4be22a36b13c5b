#![allow(clippy::result_large_err)] // Loader returns AppError so callers keep file context.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Field carrying the customer identifier on every submission.
pub const CUSTOMER_ID_FIELD: &str = "customerID";

/// Every field name a submission may legally carry.
pub const KNOWN_FIELDS: &[&str] = &[
    "personalName",
    "customerID",
    "emailAddress",
    "phoneNumber",
    "dateOfBirth",
    "currentAddress",
    "mailingAddress",
    "employmentStatus",
    "incomeRange",
    "creditScore",
    "productCategory",
    "requestDate",
    "priorityLevel",
    "preferredContactMethod",
    "accountType",
    "documentType",
    "documentID",
    "approvalStatus",
    "processingNotes",
    "consentGiven",
    "marketingOptIn",
    "lastUpdated",
    "agentID",
    "deviceType",
    "ipAddress",
];

pub fn is_known_field(name: &str) -> bool {
    KNOWN_FIELDS.contains(&name)
}

/// One customer's form answers. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Submission {
    fields: IndexMap<String, Value>,
}

impl Submission {
    pub fn new(fields: IndexMap<String, Value>) -> Self {
        Self { fields }
    }

    /// Builder-style insert used while assembling a submission.
    pub fn with_field<K: Into<String>>(mut self, field: K, value: Value) -> Self {
        self.fields.insert(field.into(), value);
        self
    }

    /// Build a submission from a JSON object.
    pub fn from_value(value: Value) -> Result<Self, AppError> {
        match value {
            Value::Object(map) => Ok(Self {
                fields: map.into_iter().collect(),
            }),
            other => Err(AppError::new(
                ErrorCategory::ValidationError,
                format!("submission must be a JSON object, got {}", json_kind(&other)),
            )
            .with_code("FR-SUBMISSION-001")),
        }
    }

    /// Read a submission from a JSON file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path).map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!("failed to read submission {}: {}", path.display(), err),
            )
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|err| {
            AppError::new(
                ErrorCategory::SerializationError,
                format!("failed to parse submission {}: {}", path.display(), err),
            )
            .with_code("FR-SUBMISSION-002")
        })?;
        Self::from_value(value)
    }

    /// Value of `field`, treating an explicit `null` the same as an absent field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|value| !value.is_null())
    }

    pub fn customer_id(&self) -> &str {
        self.get(CUSTOMER_ID_FIELD)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The whole submission as a JSON object, as seen by predicates.
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Value::Object(map)
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
