//! Tagmage CLI - a personal file-tagging catalog.

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::ops::ControlFlow;
use std::path::PathBuf;
use tagmage::{Library, config, is_valid_tag};

mod cli;

use cli::{Cli, Command};

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tagmage")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("tagmage.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let home = config::resolve_home(cli.home.as_deref())?;
    let mut library = Library::open(&home).context("Failed to open library")?;

    match cli.command {
        Command::Add { tags, files } => {
            for path in files {
                let file = library
                    .add_file(&path, tags.as_slice())
                    .with_context(|| format!("Failed to add {}", path.display()))?;
                println!("{} {} {}", "✓".green(), file.id.to_string().cyan(), file.title);
            }
        }

        Command::Edit { id, title } => {
            library
                .store_mut()
                .edit_title(id, &title)
                .context("Failed to edit title")?;
            println!("{} {} {}", "✓".green(), id.to_string().cyan(), title);
        }

        Command::List { json, filters } => {
            let mut count = 0;
            let mut failure = None;
            library
                .list(filters.as_slice(), |file| {
                    count += 1;
                    if json {
                        match serde_json::to_string(file) {
                            Ok(line) => println!("{}", line),
                            Err(e) => {
                                failure = Some(e);
                                return ControlFlow::Break(());
                            }
                        }
                    } else {
                        println!("{} {}", file.id.to_string().cyan(), file.title);
                    }
                    ControlFlow::Continue(())
                })
                .context("Failed to list files")?;

            if let Some(e) = failure {
                return Err(e).context("Failed to serialize file");
            }
            if count == 0 && !json {
                println!("{}", "No files found".dimmed());
            }
        }

        Command::Tag { id, tags } => {
            for tag in &tags {
                if !is_valid_tag(tag, true) {
                    eprintln!("{} Invalid tag '{}'", "✗".red(), tag);
                    continue;
                }
                let added = library
                    .store_mut()
                    .add_tag(id, tag)
                    .with_context(|| format!("Failed to tag {} with '{}'", id, tag))?;
                if added {
                    println!("{} {} +{}", "✓".green(), id.to_string().cyan(), tag);
                }
            }
        }

        Command::Untag { id, tags } => {
            for tag in &tags {
                let removed = library
                    .store_mut()
                    .remove_tag(id, tag)
                    .with_context(|| format!("Failed to untag {} from '{}'", id, tag))?;
                if removed {
                    println!("{} {} -{}", "✓".green(), id.to_string().cyan(), tag);
                }
            }
        }

        Command::Tags { id } => {
            let print = |tag: &str| {
                println!("{}", tag);
                ControlFlow::Continue(())
            };
            let listed = match id {
                Some(id) => library.store().list_tags_for_file(id, print),
                None => library.store().list_tags(print),
            };
            listed.context("Failed to list tags")?;
        }

        Command::Path { ids } => {
            if ids.is_empty() {
                println!("{}", library.home().display());
            }
            for id in ids {
                println!("{}", library.file_path(id)?.display());
            }
        }

        Command::Rm { ids } => {
            for id in ids {
                let file = library
                    .remove_file(id)
                    .with_context(|| format!("Failed to remove {}", id))?;
                println!("{} Removed: {} {}", "✓".green(), file.id.to_string().cyan(), file.title);
            }
        }
    }

    library.close()
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    info!("Command: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
