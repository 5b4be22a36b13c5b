use clap::Args;
use std::path::PathBuf;

/// Options shared by commands that run the full pipeline.
#[derive(Args, Clone, Debug)]
pub struct RunOptions {
    /// Customer configuration (YAML or JSON)
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: PathBuf,

    /// Runtime settings file (default: ./formrelay.toml when present)
    #[arg(long, value_name = "FILE", help_heading = "Configuration")]
    pub settings: Option<PathBuf>,

    /// Emit either terminal-friendly text or machine-readable JSON
    #[arg(long, value_enum, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,
}

#[derive(Args, Clone, Debug)]
pub struct SubmitArgs {
    /// Submission JSON file
    #[arg(value_name = "FORM")]
    pub form: PathBuf,

    #[command(flatten)]
    pub run: RunOptions,
}

#[derive(Args, Clone, Debug)]
pub struct BatchArgs {
    /// Directory of submission JSON files, processed in file name order
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    #[command(flatten)]
    pub run: RunOptions,
}

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Submission JSON file
    #[arg(value_name = "FORM")]
    pub form: PathBuf,

    /// Customer configuration supplying custom validation rules
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit either terminal-friendly text or machine-readable JSON
    #[arg(long, value_enum, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,
}

#[derive(Args, Clone, Debug)]
pub struct CheckArgs {
    /// Customer configuration to check
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

#[derive(Args, Clone, Debug)]
pub struct TransformArgs {
    /// Form field the value belongs to
    #[arg(long, value_name = "FIELD")]
    pub field: String,

    /// Raw value; parsed as JSON, falling back to a plain string
    #[arg(long, value_name = "VALUE")]
    pub value: String,

    /// Comma-separated step identifiers, applied left to right
    #[arg(long, value_name = "STEPS", value_delimiter = ',', required = true)]
    pub steps: Vec<String>,

    /// Runtime settings file, used to configure the llm step
    #[arg(long, value_name = "FILE", help_heading = "Configuration")]
    pub settings: Option<PathBuf>,
}

#[derive(Clone, Copy, clap::ValueEnum, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// JSON suitable for downstream tooling
    Json,
}
