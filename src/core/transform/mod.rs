//! Transform steps and the chain evaluator.
//!
//! Steps form a closed catalog. Pure steps never suspend; `llm` is the only
//! asynchronous step and delegates to an [`Extractor`].

pub mod catalog;

use crate::core::dates::DateLayout;
use crate::core::error::AppError;
use crate::core::extraction::{ExtractionError, Extractor};
use crate::core::types::ErrorCategory;
use serde_json::Value;
use std::convert::Infallible;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("step {step} failed for {field}: {message}")]
    Malformed {
        step: String,
        field: String,
        message: String,
    },

    #[error("llm step failed for {field}: {source}")]
    Extraction {
        field: String,
        #[source]
        source: ExtractionError,
    },
}

impl TransformError {
    pub fn code(&self) -> &'static str {
        match self {
            TransformError::Malformed { .. } => "FR-TRANSFORM-001",
            TransformError::Extraction { source, .. } => source.code(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            TransformError::Malformed { field, .. } | TransformError::Extraction { field, .. } => {
                field
            }
        }
    }
}

impl From<TransformError> for AppError {
    fn from(err: TransformError) -> Self {
        let category = match err {
            TransformError::Malformed { .. } => ErrorCategory::TransformError,
            TransformError::Extraction { .. } => ErrorCategory::ExtractionError,
        };
        let code = err.code();
        let field = err.field().to_string();
        AppError::new(category, err.to_string())
            .with_code(code)
            .with_context("field", field)
    }
}

/// A named step in a transform chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformStep {
    SplitName,
    DobMonthDayYear,
    DobYearMonthDay,
    DobIso,
    Timestamp,
    EmploymentCode,
    IncomeNumber,
    PriorityNumber,
    ApprovalNumber,
    ContactCode,
    AccountCode,
    DocumentCode,
    DeviceCode,
    ProductCode,
    CreditCategory,
    BoolYesNo,
    BoolString,
    Llm,
    /// Unrecognized identifier; passes values through unchanged.
    Unknown(String),
}

impl TransformStep {
    pub fn from_identifier(identifier: &str) -> Self {
        match identifier {
            "splitName" => TransformStep::SplitName,
            "dob-MMDDYYYY" => TransformStep::DobMonthDayYear,
            "dob-YYYYMMDD" => TransformStep::DobYearMonthDay,
            "dob-ISO" => TransformStep::DobIso,
            "timestamp" => TransformStep::Timestamp,
            "employmentCode" => TransformStep::EmploymentCode,
            "incomeNumber" => TransformStep::IncomeNumber,
            "priorityNumber" => TransformStep::PriorityNumber,
            "approvalNumber" => TransformStep::ApprovalNumber,
            "contactCode" => TransformStep::ContactCode,
            "accountCode" => TransformStep::AccountCode,
            "documentCode" => TransformStep::DocumentCode,
            "deviceCode" => TransformStep::DeviceCode,
            "productCode" => TransformStep::ProductCode,
            "creditCategory" => TransformStep::CreditCategory,
            "boolYN" => TransformStep::BoolYesNo,
            "boolStr" => TransformStep::BoolString,
            "llm" => TransformStep::Llm,
            other => TransformStep::Unknown(other.to_string()),
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            TransformStep::SplitName => "splitName",
            TransformStep::DobMonthDayYear => "dob-MMDDYYYY",
            TransformStep::DobYearMonthDay => "dob-YYYYMMDD",
            TransformStep::DobIso => "dob-ISO",
            TransformStep::Timestamp => "timestamp",
            TransformStep::EmploymentCode => "employmentCode",
            TransformStep::IncomeNumber => "incomeNumber",
            TransformStep::PriorityNumber => "priorityNumber",
            TransformStep::ApprovalNumber => "approvalNumber",
            TransformStep::ContactCode => "contactCode",
            TransformStep::AccountCode => "accountCode",
            TransformStep::DocumentCode => "documentCode",
            TransformStep::DeviceCode => "deviceCode",
            TransformStep::ProductCode => "productCode",
            TransformStep::CreditCategory => "creditCategory",
            TransformStep::BoolYesNo => "boolYN",
            TransformStep::BoolString => "boolStr",
            TransformStep::Llm => "llm",
            TransformStep::Unknown(identifier) => identifier,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, TransformStep::Llm)
    }

    /// Run a pure step. `llm` and unknown steps return the value unchanged.
    pub fn apply_pure(&self, field: &str, value: Value) -> Result<Value, TransformError> {
        use catalog::*;

        let result = match self {
            TransformStep::SplitName => split_name(&value),
            TransformStep::DobMonthDayYear => reformat(&value, DateLayout::MonthDayYear),
            TransformStep::DobYearMonthDay => reformat(&value, DateLayout::YearMonthDay),
            TransformStep::DobIso => to_iso8601(&value),
            TransformStep::Timestamp => to_timestamp(&value),
            TransformStep::EmploymentCode => Ok(lookup_code(EMPLOYMENT_CODES, &value, "UE")),
            TransformStep::IncomeNumber => Ok(lookup_code(INCOME_NUMBERS, &value, 0)),
            TransformStep::PriorityNumber => Ok(lookup_code(PRIORITY_NUMBERS, &value, 1)),
            TransformStep::ApprovalNumber => Ok(lookup_code(APPROVAL_NUMBERS, &value, 0)),
            TransformStep::ContactCode => Ok(lookup_code(CONTACT_CODES, &value, "E")),
            TransformStep::AccountCode => Ok(lookup_code(ACCOUNT_CODES, &value, 1)),
            TransformStep::DocumentCode => Ok(lookup_code(DOCUMENT_CODES, &value, "A")),
            TransformStep::DeviceCode => Ok(lookup_code(DEVICE_CODES, &value, "O")),
            TransformStep::ProductCode => Ok(lookup_code(PRODUCT_CODES, &value, "LN")),
            TransformStep::CreditCategory => credit_category(&value),
            TransformStep::BoolYesNo => Ok(Value::from(if coerce_bool(&value) { "Y" } else { "N" })),
            TransformStep::BoolString => Ok(Value::from(if coerce_bool(&value) {
                "true"
            } else {
                "false"
            })),
            TransformStep::Llm => Ok(value),
            TransformStep::Unknown(identifier) => {
                tracing::debug!(field, step = %identifier, "unknown transform step, passing value through");
                Ok(value)
            }
        };

        result.map_err(|message| TransformError::Malformed {
            step: self.identifier().to_string(),
            field: field.to_string(),
            message,
        })
    }
}

impl FromStr for TransformStep {
    type Err = Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(TransformStep::from_identifier(value))
    }
}

impl std::fmt::Display for TransformStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// Evaluates ordered transform steps for one field value.
#[derive(Clone)]
pub struct TransformChain {
    extractor: Arc<dyn Extractor>,
}

impl TransformChain {
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        Self { extractor }
    }

    /// Feed `raw` through `steps` left to right; the first failure aborts the chain.
    pub async fn apply(
        &self,
        field: &str,
        raw: Value,
        steps: &[TransformStep],
    ) -> Result<Value, TransformError> {
        let mut current = raw;
        for step in steps {
            current = if step.is_external() {
                self.extractor
                    .extract(field, &current)
                    .await
                    .map_err(|source| TransformError::Extraction {
                        field: field.to_string(),
                        source,
                    })?
            } else {
                step.apply_pure(field, current)?
            };
        }
        Ok(current)
    }

    /// Parse identifiers and apply them.
    pub async fn apply_identifiers(
        &self,
        field: &str,
        raw: Value,
        identifiers: &[&str],
    ) -> Result<Value, TransformError> {
        let steps: Vec<TransformStep> = identifiers
            .iter()
            .map(|identifier| TransformStep::from_identifier(identifier))
            .collect();
        self.apply(field, raw, &steps).await
    }
}
