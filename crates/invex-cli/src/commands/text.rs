//! Text command - show the document text the extraction tasks would see.

use std::path::PathBuf;

use clap::Args;
use console::style;

use invex_core::TextAcquirer;

use super::{load_config, write_output};

/// Arguments for the text command.
#[derive(Args)]
pub struct TextArgs {
    /// Input PDF
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// OCR language passed to the recognizer
    #[arg(short, long)]
    language: Option<String>,
}

pub fn run(args: TextArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let mut acquirer = TextAcquirer::from_config(&config)?;
    if let Some(language) = args.language {
        acquirer = acquirer.with_language(language);
    }

    let document = acquirer.acquire(&args.input)?;

    eprintln!(
        "{} {} pages via {}",
        style("ℹ").blue(),
        document.page_count,
        serde_json::to_value(document.mode)?.as_str().unwrap_or("unknown")
    );

    write_output(&document.text, args.output.as_deref())
}
