use aggmirror::PersistenceConfig;
use aggmirror::repository::{CollectingEventPublisher, PersistenceEvent};
use aggmirror::sample::{OrderLine, SampleSchema, SampleStack, sample_order};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mirror-tool")]
#[command(about = "Developer tooling for the aggmirror persistence engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Insert, update and delete the sample aggregate and print the events.
    Demo {
        /// Extra order lines added before the update.
        #[arg(long, default_value_t = 1)]
        lines: usize,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate a persistence config file.
    CheckConfig {
        #[arg(long)]
        config: PathBuf,
    },
    /// Print the sample schema as JSON.
    Schema,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Demo {
            lines,
            json,
            config,
        } => demo(lines, json, config.as_deref()),
        Command::CheckConfig { config } => check_config(&config),
        Command::Schema => {
            let tables = SampleSchema::new().tables();
            let defs: Vec<_> = tables.iter().map(|t| t.as_ref()).collect();
            println!("{}", serde_json::to_string_pretty(&defs)?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PersistenceConfig> {
    match path {
        Some(path) => PersistenceConfig::from_file(path)
            .with_context(|| format!("Failed to load config '{}'", path.display())),
        None => Ok(PersistenceConfig::default()),
    }
}

fn check_config(path: &Path) -> Result<()> {
    let config = load_config(Some(path))?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    println!("Config OK");
    Ok(())
}

fn demo(extra_lines: usize, json: bool, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let events = Arc::new(CollectingEventPublisher::new());
    let stack = SampleStack::with_publisher(config, events.clone(), events.clone())
        .context("Failed to set up the sample persistence stack")?;

    let inserted = stack.repository.insert(sample_order())?;
    print_events("insert", &events.take(), json)?;

    let mut changed = inserted.clone();
    changed.remove_line("gadget");
    for i in 0..extra_lines {
        changed
            .lines
            .push(Arc::new(OrderLine::new(&format!("part-{}", i + 1), 1)));
    }
    let updated = stack.repository.update(changed)?;
    print_events("update", &events.take(), json)?;

    let id = updated
        .id
        .clone()
        .ok_or_else(|| anyhow!("Updated order has no identity"))?;
    stack
        .repository
        .delete_by_id(&id)?
        .ok_or_else(|| anyhow!("Order {} vanished before delete", id))?;
    print_events("delete", &events.take(), json)?;

    let stats = stack.store.stats();
    println!(
        "store writes: {} inserts, {} updates, {} deletes, {} version bumps",
        stats.inserts, stats.updates, stats.deletes, stats.version_increments
    );
    Ok(())
}

fn print_events(step: &str, events: &[PersistenceEvent], json: bool) -> Result<()> {
    println!("== {} ({} events)", step, events.len());
    for event in events {
        if json {
            println!("{}", serde_json::to_string(&event.summary())?);
        } else {
            let keys: Vec<String> = event.primary_key().iter().map(ToString::to_string).collect();
            println!(
                "  {:<8} {:<16} {}[{}]",
                event.event_type().to_string(),
                event.instance().type_name(),
                event.record_type(),
                keys.join(",")
            );
        }
    }
    Ok(())
}
