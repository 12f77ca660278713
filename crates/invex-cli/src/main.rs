//! CLI application for LLM-assisted invoice extraction.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{clean, config, extract, tasks, text};

/// Invoice extraction - Turn invoice PDFs into structured JSON with a language model
#[derive(Parser)]
#[command(name = "invex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract structured data from an invoice PDF
    Extract(extract::ExtractArgs),

    /// Print the text acquired from a PDF
    Text(text::TextArgs),

    /// List extraction tasks and their prompts
    Tasks(tasks::TasksArgs),

    /// Clean a saved model response into JSON
    Clean(clean::CleanArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Extract(args) => extract::run(args, cli.config.as_deref()).await,
        Commands::Text(args) => text::run(args, cli.config.as_deref()),
        Commands::Tasks(args) => tasks::run(args, cli.config.as_deref()),
        Commands::Clean(args) => clean::run(args),
        Commands::Config(args) => config::run(args, cli.config.as_deref()),
    }
}
