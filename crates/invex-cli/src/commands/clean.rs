//! Clean command - sanitize a saved model response and check it parses.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use clap::Args;

use invex_core::sanitize_bytes;

/// Arguments for the clean command.
#[derive(Args)]
pub struct CleanArgs {
    /// Response file, or `-` for stdin
    #[arg(required = true)]
    input: PathBuf,

    /// Print the cleaned text even if it is not valid JSON
    #[arg(long)]
    raw: bool,
}

pub fn run(args: CleanArgs) -> anyhow::Result<()> {
    let bytes = if args.input.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        fs::read(&args.input)?
    };

    let cleaned = sanitize_bytes(&bytes)?;

    if args.raw {
        println!("{}", cleaned);
        return Ok(());
    }

    let value: serde_json::Value = serde_json::from_str(&cleaned)
        .map_err(|e| anyhow::anyhow!("Cleaned response is not valid JSON: {}", e))?;
    println!("{}", serde_json::to_string_pretty(&value)?);

    Ok(())
}
