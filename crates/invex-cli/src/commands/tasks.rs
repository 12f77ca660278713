//! Tasks command - inspect the extraction task catalog.

use clap::Args;
use console::style;

use invex_core::{TaskCatalog, TaskKind};

use super::load_config;

/// Arguments for the tasks command.
#[derive(Args)]
pub struct TasksArgs {
    /// Print the prompt template of one task (general, supplier_customer, item, total)
    #[arg(long, value_name = "TASK")]
    prompt: Option<String>,
}

pub fn run(args: TasksArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let catalog = TaskCatalog::standard(&config.tasks);

    if let Some(name) = args.prompt {
        let kind = TaskKind::ALL
            .into_iter()
            .find(|k| k.name() == name)
            .ok_or_else(|| anyhow::anyhow!("Unknown task: {}", name))?;

        if let Some(task) = catalog.get(kind) {
            print!("{}", task.template());
        }
        return Ok(());
    }

    println!("{}", style("Extraction tasks:").bold());
    println!();
    for task in catalog.iter() {
        println!(
            "  {:<20} {:<26} {} ({} fields)",
            style(task.kind().name()).cyan(),
            task.kind().result_key(),
            task.model(),
            task.fields().len()
        );
    }

    Ok(())
}
