pub mod customer;
pub mod loader;

pub use customer::{Condition, CustomerConfig, EndpointConfig, RetryOptions, TransformSpec};
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};

/// Runtime settings loaded from formrelay.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// HTTP delivery configuration
    #[serde(default)]
    pub delivery: DeliverySettings,

    /// Retry defaults for endpoints without their own retry block
    #[serde(default)]
    pub retry: RetrySettings,

    /// Natural-language extraction service configuration
    #[serde(default)]
    pub extraction: ExtractionSettings,
}

/// Delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliverySettings {
    /// Per-request timeout in milliseconds
    #[serde(default = "default_delivery_timeout_ms")]
    pub timeout_ms: u64,

    /// User agent sent with every delivery
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Retry defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrySettings {
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

/// Extraction service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionSettings {
    /// When false every `llm` step fails with a configuration error
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_extraction_base_url")]
    pub base_url: String,

    #[serde(default = "default_extraction_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_extraction_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

// Default functions
fn default_delivery_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    format!("formrelay/{}", crate::VERSION)
}

fn default_retries() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    500
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_extraction_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_extraction_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_extraction_timeout_ms() -> u64 {
    30_000
}

fn default_temperature() -> f32 {
    0.2
}

impl Default for DeliverySettings {
    fn default() -> Self {
        DeliverySettings {
            timeout_ms: default_delivery_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            retries: default_retries(),
            delay_ms: default_delay_ms(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        ExtractionSettings {
            enabled: false,
            base_url: default_extraction_base_url(),
            model: default_extraction_model(),
            api_key_env: default_api_key_env(),
            timeout_ms: default_extraction_timeout_ms(),
            temperature: default_temperature(),
        }
    }
}
