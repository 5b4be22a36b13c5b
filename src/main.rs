use clap::Parser;
use formrelay::cli::{self, Args};
use formrelay::logging;

#[tokio::main]
async fn main() -> formrelay::Result<()> {
    let args = Args::parse();
    let _guard = logging::init(&args.command)?;
    cli::run(args).await
}
