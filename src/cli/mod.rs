pub mod args;
pub mod commands;

pub use args::{
    BatchArgs, CheckArgs, OutputFormat, RunOptions, SubmitArgs, TransformArgs, ValidateArgs,
};
use clap::{Parser, Subcommand};

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
PIPELINE COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "formrelay")]
#[command(version = crate::VERSION)]
#[command(about = "Validate form submissions and relay derived payloads to downstream endpoints")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: check a customer config, validate a submission, then submit it."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Run one submission through the pipeline",
        long_about = "Submit validates the form, builds a payload per enabled endpoint, and delivers each one with retry and backoff. Exits non-zero when validation rejects the submission.",
        after_help = "Example:\n    formrelay submit form.json --config customer.yaml"
    )]
    Submit(SubmitArgs),
    #[command(
        about = "Run every submission in a directory",
        long_about = "Batch processes each *.json file in the directory in turn, sharing one set of run metrics, and prints the aggregate summary.",
        after_help = "Example:\n    formrelay batch ./inbox --config customer.yaml --format json"
    )]
    Batch(BatchArgs),
    #[command(
        about = "Check a submission without delivering it",
        long_about = "Validate runs the intrinsic field checks plus any custom rules from the customer configuration and lists every violation.",
        after_help = "Example:\n    formrelay validate form.json --config customer.yaml"
    )]
    Validate(ValidateArgs),
    #[command(
        about = "Check a customer configuration",
        long_about = "Check loads a customer configuration and verifies endpoint urls, field names, retry tuning, and expressions.",
        after_help = "Example:\n    formrelay check customer.yaml"
    )]
    Check(CheckArgs),
    #[command(
        about = "Evaluate a transform chain",
        long_about = "Transform applies the given steps to one value and prints the JSON result.",
        after_help = "Example:\n    formrelay transform --field dateOfBirth --value 2000-01-15 --steps dob-MMDDYYYY"
    )]
    Transform(TransformArgs),
}

pub async fn run(args: Args) -> crate::Result<()> {
    match args.command {
        Command::Submit(submit_args) => commands::submit(submit_args).await,
        Command::Batch(batch_args) => commands::batch(batch_args).await,
        Command::Validate(validate_args) => commands::validate(validate_args).await,
        Command::Check(check_args) => commands::check(check_args).await,
        Command::Transform(transform_args) => commands::transform(transform_args).await,
    }
}
