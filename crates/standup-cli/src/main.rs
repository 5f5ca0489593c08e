use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use standup_core::config::{
    config_path, load_config, resolve_db_path, resolve_standup_home_dir, standup_home,
    StandupConfig,
};
use standup_core::task::count_pending;
use standup_core::{Task, TaskRepository};
use standup_render::{listing_filter, render_standup, render_table, render_today};

#[derive(Parser)]
#[command(name = "standup", version, about = "Personal task tracker with standup reports")]
struct Cli {
    /// Task database file (default: ~/.standup/todos.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Never colour the task table
    #[arg(long, global = true)]
    no_color: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Add a task; reads one line from stdin when no words are given
    Add { words: Vec<String> },
    /// Mark a task as completed
    Complete { id: i64 },
    /// Delete a task
    #[command(alias = "rm")]
    Delete { id: i64 },
    /// Show tasks: pending plus completed today, or everything with --all
    Ls {
        #[arg(long)]
        all: bool,
        #[arg(long)]
        json: bool,
    },
    /// Tasks completed on the previous working day
    Standup {
        #[arg(long)]
        json: bool,
    },
    /// Pending tasks
    Today {
        #[arg(long)]
        json: bool,
    },
    /// Import tasks from a JSON snapshot (.todos.json)
    Import { file: PathBuf },
    /// Export all tasks to a JSON snapshot
    Export { file: PathBuf },
    /// Print the config and database locations
    ConfigPath,
    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let home = resolve_standup_home_dir();
    let config = home.as_deref().and_then(load_config);
    init_logging(cli.verbose, config.as_ref());

    let command = match cli.command {
        Some(Command::Version) => {
            println!("standup {}", standup_core::version());
            return Ok(());
        }
        Some(command) => command,
        None => {
            Cli::command().print_help()?;
            println!();
            return Ok(());
        }
    };

    if let Command::ConfigPath = command {
        match home.as_deref() {
            Some(home) => {
                println!("config: {}", config_path(home).display());
                let db_path = resolve_db_path(home, config.as_ref(), cli.db.as_deref());
                println!("database: {}", db_path.display());
            }
            None => {
                println!("config: (no home directory)");
                match cli.db.as_deref() {
                    Some(path) => println!("database: {}", path.display()),
                    None => println!("database: (no home directory)"),
                }
            }
        }
        return Ok(());
    }

    let db_path = match cli.db.as_deref() {
        Some(path) => path.to_path_buf(),
        None => resolve_db_path(&standup_home()?, config.as_ref(), None),
    };
    debug!(path = %db_path.display(), "using task database");

    let repo = TaskRepository::open(&db_path)
        .with_context(|| format!("failed to open task database {}", db_path.display()))?;
    let color = !cli.no_color
        && std::env::var_os("NO_COLOR").is_none()
        && io::stdout().is_terminal();

    match command {
        Command::Add { words } => {
            let description = read_description(&words)?;
            let id = repo.add(&description)?;
            println!("Added task {id}");
        }
        Command::Complete { id } => repo.complete(id)?,
        Command::Delete { id } => repo.delete(id)?,
        Command::Ls { all, json } => {
            let tasks = repo.list_all()?;
            let show_all = all || config.as_ref().and_then(|c| c.list_all).unwrap_or(false);
            let visible: Vec<&Task> = if show_all {
                tasks.iter().collect()
            } else {
                listing_filter(&tasks, &Local::now())
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&visible)?);
            } else {
                print!("{}", render_table(&visible, count_pending(&tasks), &Local, color));
            }
        }
        Command::Standup { json } => {
            let (tasks, lookback) = repo.standup_report(&Local::now())?;
            if json {
                let body = json!({ "lookback": lookback.to_rfc3339(), "tasks": tasks });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                print!("{}", render_standup(&tasks, &lookback));
            }
        }
        Command::Today { json } => {
            let (tasks, now) = repo.today_report(&Local::now())?;
            if json {
                let body = json!({ "date": now.to_rfc3339(), "tasks": tasks });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                print!("{}", render_today(&tasks, &now));
            }
        }
        Command::Import { file } => {
            let ids = repo
                .import_snapshot(&file, Utc::now())
                .with_context(|| format!("failed to import {}", file.display()))?;
            println!("Imported {} tasks", ids.len());
        }
        Command::Export { file } => {
            let count = repo
                .export_snapshot(&file)
                .with_context(|| format!("failed to export to {}", file.display()))?;
            println!("Exported {count} tasks to {}", file.display());
        }
        Command::ConfigPath | Command::Version => {}
    }
    Ok(())
}

fn init_logging(verbose: bool, config: Option<&StandupConfig>) {
    let filter = if verbose {
        EnvFilter::new("standup=debug,standup_core=debug")
    } else {
        EnvFilter::try_from_env("STANDUP_LOG").unwrap_or_else(|_| {
            EnvFilter::new(
                config
                    .and_then(|config| config.log_filter.as_deref())
                    .unwrap_or("warn"),
            )
        })
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn read_description(words: &[String]) -> Result<String> {
    if !words.is_empty() {
        return Ok(words.join(" "));
    }
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read task from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
