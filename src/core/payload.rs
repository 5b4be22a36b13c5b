#![allow(clippy::result_large_err)]

use crate::core::config::EndpointConfig;
use crate::core::error::AppError;
use crate::core::expression::ExpressionEngine;
use crate::core::submission::Submission;
use crate::core::transform::TransformChain;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Flat field mapping sent to one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload {
    fields: IndexMap<String, Value>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, returning the value it replaced.
    pub fn insert<K: Into<String>>(&mut self, key: K, value: Value) -> Option<Value> {
        self.fields.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }
}

/// Derives one endpoint's payload from a submission.
#[derive(Clone)]
pub struct PayloadBuilder {
    chain: TransformChain,
    engine: Arc<ExpressionEngine>,
}

impl PayloadBuilder {
    pub fn new(chain: TransformChain, engine: Arc<ExpressionEngine>) -> Self {
        Self { chain, engine }
    }

    /// Build the payload for `endpoint`.
    ///
    /// Fields are processed in declaration order. Excluded fields contribute
    /// nothing, absent fields without a default are omitted, and composite
    /// transform results are flattened into the payload. When two fields write
    /// the same output key the later field wins.
    pub async fn build(
        &self,
        submission: &Submission,
        endpoint: &EndpointConfig,
        defaults: &IndexMap<String, Value>,
    ) -> Result<Payload, AppError> {
        let form = submission.to_value();
        let mut payload = Payload::new();
        let mut owners: IndexMap<String, String> = IndexMap::new();

        for field in &endpoint.fields {
            let raw = submission
                .get(field)
                .or_else(|| defaults.get(field).filter(|value| !value.is_null()));

            if let Some(condition) = endpoint.include_if.get(field) {
                let included = self.engine.check(condition, &form, raw).map_err(|err| {
                    AppError::new(
                        err.category,
                        format!("include_if for {} could not be evaluated: {}", field, err.message),
                    )
                    .with_code("FR-PAYLOAD-001")
                    .with_context("endpoint", endpoint.name.clone())
                    .with_context("field", field.clone())
                })?;
                if !included {
                    tracing::debug!(endpoint = %endpoint.name, field = %field, "field excluded by include_if");
                    continue;
                }
            }

            let Some(raw) = raw else {
                tracing::debug!(endpoint = %endpoint.name, field = %field, "field absent with no default, omitted");
                continue;
            };

            let value = match endpoint.transformations.get(field) {
                Some(spec) => self
                    .chain
                    .apply(field, raw.clone(), &spec.steps())
                    .await
                    .map_err(|err| {
                        AppError::from(err).with_context("endpoint", endpoint.name.clone())
                    })?,
                None => raw.clone(),
            };

            match value {
                Value::Object(composite) => {
                    for (key, part) in composite {
                        merge(&mut payload, &mut owners, &endpoint.name, field, key, part);
                    }
                }
                other => merge(&mut payload, &mut owners, &endpoint.name, field, field.clone(), other),
            }
        }

        Ok(payload)
    }
}

fn merge(
    payload: &mut Payload,
    owners: &mut IndexMap<String, String>,
    endpoint: &str,
    field: &str,
    key: String,
    value: Value,
) {
    if let Some(previous) = owners.insert(key.clone(), field.to_string()) {
        tracing::warn!(
            endpoint,
            key = %key,
            previous_field = %previous,
            field,
            "payload key written by more than one field, keeping the later value"
        );
    }
    payload.insert(key, value);
}
