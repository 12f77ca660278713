//! CLI subcommands.

pub mod clean;
pub mod config;
pub mod extract;
pub mod tasks;
pub mod text;

use std::fs;
use std::path::{Path, PathBuf};

use console::style;

use invex_core::InvexConfig;

/// Location of the user configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("invex")
        .join("config.json")
}

/// Config file selected by `--config`, or the default location.
pub fn config_path(config_path: Option<&str>) -> PathBuf {
    config_path.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load the configuration.
///
/// An explicit `--config` file must exist; the default file is optional.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<InvexConfig> {
    match config_path {
        Some(path) => InvexConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path, e)),
        None => {
            let path = default_config_path();
            if path.exists() {
                Ok(InvexConfig::from_file(&path)?)
            } else {
                Ok(InvexConfig::default())
            }
        }
    }
}

/// Write command output to a file or stdout.
pub fn write_output(output: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            fs::write(path, output)?;
            eprintln!("{} Output written to {}", style("✓").green(), path.display());
        }
        None => println!("{}", output),
    }
    Ok(())
}
