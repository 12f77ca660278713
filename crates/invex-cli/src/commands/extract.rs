//! Extract command - turn one invoice PDF into a composite JSON record.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

use invex_core::{
    ExtractionOrchestrator, InvexConfig, InvoicePipeline, TaskCatalog, TextAcquirer,
};
use invex_llm::GeminiClient;

use super::{load_config, write_output};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input PDF
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// API key for the Generative Language API
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Send the four task requests concurrently
    #[arg(long)]
    parallel: bool,

    /// Keep the records of successful tasks when others fail
    #[arg(long)]
    partial: bool,

    /// Wrap the result with source, models and timing
    #[arg(long, conflicts_with = "partial")]
    report: bool,

    /// Report schema fields missing from the result
    #[arg(long)]
    validate: bool,

    /// Print JSON on a single line
    #[arg(long)]
    compact: bool,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let api_key = resolve_api_key(args.api_key.as_deref(), &config)?;

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("Extracting invoice data...");

    let catalog = TaskCatalog::standard(&config.tasks);
    let client = GeminiClient::new(config.llm.gemini_config(api_key))?;
    let orchestrator = ExtractionOrchestrator::new(client, catalog.clone())
        .with_parallel(args.parallel || config.llm.parallel);
    let pipeline = InvoicePipeline::new(TextAcquirer::from_config(&config)?, orchestrator);

    let output = if args.partial {
        let partial = pipeline.extract_partial(&args.input).await;
        pb.finish_and_clear();
        let partial = partial?;

        for kind in &partial.failed {
            eprintln!(
                "{} Task {} failed: {}",
                style("✗").red(),
                kind,
                partial.records[kind.result_key()]["error"].as_str().unwrap_or("unknown error")
            );
        }
        if args.validate {
            print_missing_fields(&catalog, |kind| {
                if partial.failed.contains(&kind) {
                    None
                } else {
                    partial.records.get(kind.result_key())
                }
            });
        }
        to_json(&partial.records, args.compact)?
    } else {
        let report = pipeline.extract(&args.input).await;
        pb.finish_and_clear();
        let report = report?;

        if args.validate {
            print_missing_fields(&catalog, |kind| report.result.get(kind));
        }
        if args.report {
            to_json(&report, args.compact)?
        } else {
            to_json(&report.result, args.compact)?
        }
    };

    write_output(&output, args.output.as_deref())?;

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}

/// API key from the command line or environment, else from the config file.
fn resolve_api_key(flag: Option<&str>, config: &InvexConfig) -> anyhow::Result<String> {
    flag.or(config.llm.api_key.as_deref())
        .filter(|key| !key.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            anyhow::anyhow!("No API key: pass --api-key, set GOOGLE_API_KEY, or set llm.api_key in the config")
        })
}

fn print_missing_fields<'a>(
    catalog: &TaskCatalog,
    record: impl Fn(invex_core::TaskKind) -> Option<&'a serde_json::Value>,
) {
    let mut clean = true;
    for task in catalog.iter() {
        let Some(value) = record(task.kind()) else {
            continue;
        };
        let missing = task.missing_fields(value);
        if !missing.is_empty() {
            if clean {
                eprintln!("{}", style("Validation issues:").yellow());
                clean = false;
            }
            for field in missing {
                eprintln!("  - {}: missing {}", task.kind().result_key(), field);
            }
        }
    }
}

fn to_json<T: Serialize>(value: &T, compact: bool) -> anyhow::Result<String> {
    Ok(if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_api_key_prefers_flag() {
        let mut config = InvexConfig::default();
        config.llm.api_key = Some("from-config".to_string());

        assert_eq!(resolve_api_key(Some("from-flag"), &config).unwrap(), "from-flag");
        assert_eq!(resolve_api_key(None, &config).unwrap(), "from-config");
    }

    #[test]
    fn test_resolve_api_key_missing() {
        let config = InvexConfig::default();
        assert!(resolve_api_key(None, &config).is_err());
        assert!(resolve_api_key(Some("  "), &config).is_err());
    }
}
