mod config;
mod console;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use grid_engine::{GridEngine, HeadlessHost, LayoutPersistence};
use storage::Storage;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{
    config::{load_catalog, load_settings, normalize_database_url, Settings, DEFAULT_CONFIG_FILE},
    console::{read_line, render_grid, spawn_feedback_printer, StdinPrompt},
};

#[derive(Parser, Debug)]
#[command(name = "gridctl", about = "Drive the surgical display grid from the terminal")]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Overrides the configured database url.
    #[arg(long)]
    database_url: Option<String>,
    /// Apply commands without the highlight delay.
    #[arg(long)]
    immediate: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run each argument as one command, then print the grid.
    Run {
        #[arg(required = true)]
        commands: Vec<String>,
    },
    /// Read commands line by line.
    Repl,
    Layouts {
        #[command(subcommand)]
        action: LayoutsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum LayoutsCommand {
    List,
    Show { name: String },
    Delete { name: String },
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(&cli.config)?;
    if let Some(database_url) = &cli.database_url {
        settings.database_url = database_url.clone();
    }
    if cli.immediate {
        settings.action_delay_ms = 0;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(%database_url, %error, "failed to open layout storage");
        error
    })?;
    storage.health_check().await?;
    info!(%database_url, "layout storage connected");
    let storage = Arc::new(storage);

    match cli.command {
        Command::Run { commands } => {
            let engine = build_engine(&settings, Arc::clone(&storage))?;
            run_commands(&engine, &commands).await
        }
        Command::Repl => {
            let engine = build_engine(&settings, Arc::clone(&storage))?;
            repl(&engine).await
        }
        Command::Layouts { action } => manage_layouts(storage, action).await,
    }
}

fn build_engine(settings: &Settings, storage: Arc<Storage>) -> Result<Arc<GridEngine>> {
    let catalog = load_catalog(settings.catalog_path.as_deref())?;
    Ok(GridEngine::new_with_dependencies(
        settings.engine_config(),
        Arc::new(catalog),
        storage,
        Arc::new(HeadlessHost),
        None,
        Some(StdinPrompt::shared()),
    ))
}

async fn run_commands(engine: &Arc<GridEngine>, commands: &[String]) -> Result<()> {
    let printer = spawn_feedback_printer(engine);
    let mut failures = 0usize;
    for text in commands {
        let outcome = engine.process_command(text).await;
        if !outcome.matched {
            eprintln!("not a grid command: {text}");
            failures += 1;
        } else if !outcome.success {
            failures += 1;
        }
    }
    engine.flush().await;
    tokio::task::yield_now().await;
    print!("{}", render_grid(&engine.snapshot().await));
    printer.abort();

    if failures > 0 {
        bail!("{failures} of {} commands failed", commands.len());
    }
    Ok(())
}

async fn repl(engine: &Arc<GridEngine>) -> Result<()> {
    let printer = spawn_feedback_printer(engine);
    println!("type a command, 'grid' to show the grid, 'quit' to leave");
    while let Some(line) = read_line("grid> ").context("failed to read stdin")? {
        match line.to_ascii_lowercase().as_str() {
            "" => continue,
            "quit" | "exit" => break,
            "grid" | "show" => {
                engine.flush().await;
                print!("{}", render_grid(&engine.snapshot().await));
            }
            _ => {
                let outcome = engine.process_command(&line).await;
                if !outcome.matched {
                    println!("not a grid command");
                }
            }
        }
    }
    engine.flush().await;
    printer.abort();
    Ok(())
}

async fn manage_layouts(storage: Arc<Storage>, action: LayoutsCommand) -> Result<()> {
    let persistence = LayoutPersistence::new(storage);
    match action {
        LayoutsCommand::List => {
            let layouts = persistence.list().await?;
            if layouts.is_empty() {
                println!("no saved layouts");
            }
            for layout in layouts {
                println!(
                    "{:<24} {}  {} cells",
                    layout.name,
                    layout.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    layout.occupied_cells
                );
            }
        }
        LayoutsCommand::Show { name } => {
            let layout = persistence.fetch(&name).await?;
            println!("{} (saved {})", layout.name, layout.timestamp.to_rfc3339());
            print!("{}", render_grid(&layout.cells));
        }
        LayoutsCommand::Delete { name } => {
            persistence.delete(&name).await?;
            println!("deleted layout {name}");
        }
        LayoutsCommand::Reset => {
            persistence.reset().await?;
            println!("all layouts deleted");
        }
    }
    Ok(())
}
