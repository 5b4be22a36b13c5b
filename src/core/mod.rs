pub mod config;
pub mod dates;
pub mod dispatch;
pub mod error;
pub mod expression;
pub mod extraction;
pub mod metrics;
pub mod orchestrator;
pub mod payload;
pub mod submission;
pub mod transform;
pub mod types;
pub mod validation;

pub use config::{ConfigLoader, CustomerConfig, EndpointConfig, Settings};
pub use error::AppError;
pub use metrics::{MetricsSnapshot, RunMetrics};
pub use orchestrator::{EndpointOutcome, Orchestrator, RunReport};
pub use payload::{Payload, PayloadBuilder};
pub use submission::Submission;
pub use types::*;
