use crate::{
    cli::args::{BatchArgs, CheckArgs, OutputFormat, RunOptions, SubmitArgs, TransformArgs, ValidateArgs},
    core::{
        config::{ConfigLoader, CustomerConfig},
        expression::ExpressionEngine,
        extraction,
        metrics::RunMetrics,
        orchestrator::{Orchestrator, RunReport},
        submission::Submission,
        transform::TransformChain,
        validation::validate_submission,
    },
    Result,
};
use anyhow::{anyhow, Context};
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Load settings and customer config, then wire an orchestrator around `metrics`.
fn prepare(options: &RunOptions, metrics: Arc<RunMetrics>) -> Result<(CustomerConfig, Orchestrator)> {
    let settings = ConfigLoader::load_settings(options.settings.as_deref())?;
    let orchestrator = Orchestrator::from_settings(&settings, metrics)?;
    let config = ConfigLoader::load_customer(&options.config, orchestrator.engine())
        .with_context(|| format!("invalid customer config {}", options.config.display()))?;
    tracing::debug!(
        customer_id = %config.customer_id,
        endpoints = config.endpoints.len(),
        "loaded customer config"
    );
    Ok((config, orchestrator))
}

pub async fn submit(args: SubmitArgs) -> Result<()> {
    let (config, orchestrator) = prepare(&args.run, Arc::new(RunMetrics::new()))?;
    let submission = Submission::load(&args.form)?;

    let report = orchestrator.process(&submission, &config).await;
    match args.run.format {
        OutputFormat::Text => println!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if let Some(err) = report.abort_error() {
        return Err(err.into());
    }
    Ok(())
}

pub async fn batch(args: BatchArgs) -> Result<()> {
    let files = submission_files(&args.dir)?;
    if files.is_empty() {
        return Err(anyhow!(
            "no *.json submissions found in {}",
            args.dir.display()
        ));
    }

    let metrics = Arc::new(RunMetrics::new());
    let (config, orchestrator) = prepare(&args.run, Arc::clone(&metrics))?;

    let mut reports: Vec<RunReport> = Vec::with_capacity(files.len());
    let mut unreadable: Vec<String> = Vec::new();
    for path in &files {
        let submission = match Submission::load(path) {
            Ok(submission) => submission,
            Err(err) => {
                tracing::error!(file = %path.display(), error = %err, "skipping unreadable submission");
                unreadable.push(format!("{}: {}", path.display(), err.message));
                continue;
            }
        };
        tracing::info!(file = %path.display(), "processing submission file");
        reports.push(orchestrator.process(&submission, &config).await);
    }

    let snapshot = metrics.snapshot();
    match args.run.format {
        OutputFormat::Text => {
            for report in &reports {
                println!("{}", report.render_text());
            }
            for skipped in &unreadable {
                println!("skipped {}", skipped);
            }
            println!("{}", snapshot.summary());
        }
        OutputFormat::Json => {
            let output = json!({
                "reports": reports,
                "skipped": unreadable,
                "metrics": snapshot,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

pub async fn validate(args: ValidateArgs) -> Result<()> {
    let engine = ExpressionEngine::default();
    let submission = Submission::load(&args.form)?;
    let rules = match &args.config {
        Some(path) => ConfigLoader::load_customer(path, &engine)?.validation_rules,
        None => IndexMap::new(),
    };

    let violations = validate_submission(&submission, &rules, &engine);
    match args.format {
        OutputFormat::Text => {
            if violations.is_empty() {
                println!("{} is valid", args.form.display());
            } else {
                for violation in &violations {
                    println!(" - {}", violation);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "valid": violations.is_empty(),
                "violations": violations,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    if !violations.is_empty() {
        return Err(anyhow!(
            "{} validation violation(s) in {}",
            violations.len(),
            args.form.display()
        ));
    }
    Ok(())
}

pub async fn check(args: CheckArgs) -> Result<()> {
    let engine = ExpressionEngine::default();
    let config = ConfigLoader::load_customer(&args.config, &engine)?;
    println!(
        "{}: customer {} with {} endpoint(s), {} enabled",
        args.config.display(),
        config.customer_id,
        config.endpoints.len(),
        config.enabled_endpoints().count()
    );
    Ok(())
}

pub async fn transform(args: TransformArgs) -> Result<()> {
    let settings = ConfigLoader::load_settings(args.settings.as_deref())?;
    let extractor = extraction::from_settings(&settings.extraction)?;
    let chain = TransformChain::new(extractor);

    let raw = parse_raw_value(&args.value);
    let identifiers: Vec<&str> = args.steps.iter().map(|step| step.trim()).collect();
    let result = chain
        .apply_identifiers(&args.field, raw, &identifiers)
        .await?;
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

/// JSON when it parses, otherwise the literal text.
fn parse_raw_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn submission_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read submission directory {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if path.is_file() && is_json {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
