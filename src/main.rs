/*
 * luet-pm - Terminal front-end for the luet package manager.
 * Copyright (C) 2025  luet-pm contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use anyhow::Result;
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, Instrument};

mod about;
mod config;
mod error;
mod filter;
mod logging;
mod luet;
mod ops;
mod runner;
mod tui;

use config::Config;
use error::{ErrorContext, LuetError, LuetResult};
use luet::{split_full_name, PackageAction, PackageEntry, SearchMode};
use ops::{cache, checker, details, packages, repo, search, sync_info, upgrade, Backend, Completion, OpEvent, OpSink};
use runner::{CommandRunner, Elevation};

#[derive(Parser)]
#[command(name = "luet-pm")]
#[command(author = "luet-pm contributors")]
#[command(version = about::VERSION)]
#[command(long_version = about::LONG_VERSION)]
#[command(about = "Terminal front-end for the luet package manager.")]
struct Cli {
    #[arg(short = 'y', long, global = true, help = "Bypass any confirmation prompts")]
    yes: bool,
    #[arg(short, long, global = true, value_name = "FILE", help = "Read configuration from FILE")]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "LEVEL", help = "Log level (error, warn, info, debug, trace)")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the interactive interface (default)
    Tui,
    /// Search packages by name, or by label with --label
    Search {
        query: String,
        #[arg(long, help = "Treat QUERY as a label regular expression")]
        label: bool,
        #[arg(long, help = "Print results as JSON")]
        json: bool,
    },
    /// Install a package given as category/name
    Install { package: String },
    /// Uninstall a package given as category/name
    Uninstall { package: String },
    /// Update repositories and upgrade all packages
    Upgrade,
    /// Update repositories
    RepoUpdate,
    /// Check for missing files and reinstall affected packages
    Check,
    /// Clear the luet package cache
    Cleanup,
    /// Show the package cache size
    Cache,
    /// Show package details
    Info { package: String },
    /// List files owned by a package
    Files { package: String },
    /// List installed packages requiring a package
    RequiredBy { package: String },
    /// Show when repositories were last synced
    SyncInfo,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {}", style("error:").red().bold(), e);
        let code = e
            .downcast_ref::<LuetError>()
            .map(LuetError::exit_code)
            .filter(|code| *code > 0)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let level = cli.log_level.clone().unwrap_or_else(|| config.logging.level.clone());
    let command = cli.command.unwrap_or(Command::Tui);
    let cli_mode = !matches!(command, Command::Tui);

    if cli_mode {
        logging::init_with_level(&level);
    } else {
        logging::init_file_only(&level, config.tui_log_file().as_deref());
    }

    let runner = CommandRunner::new(Elevation::detect(&config.elevation, cli_mode));
    debug!(elevation = ?runner.elevation(), "elevation helper selected");
    let backend = Backend::new(Arc::new(runner), config);

    match command {
        Command::Tui => {
            info!(version = about::VERSION, "starting TUI");
            tui::run(backend).await
        }
        Command::Search { query, label, json } => cmd_search(&backend, &query, label, json).await,
        Command::Install { package } => {
            let entry = resolve(&backend, &package).await?;
            if entry.installed {
                println!("{}", style(format!(":: {} is already installed", entry.full_name())).yellow());
                return Ok(());
            }
            ensure_unprotected(&entry)?;
            if !confirm(cli.yes, &format!("install {}?", entry.full_name()))? {
                return Ok(());
            }
            run_streamed("install", &backend, |b, s| async move { packages::install(&b, &entry, &s).await }).await
        }
        Command::Uninstall { package } => {
            let entry = resolve(&backend, &package).await?;
            if !entry.installed {
                println!("{}", style(format!(":: {} is not installed", entry.full_name())).yellow());
                return Ok(());
            }
            ensure_unprotected(&entry)?;
            if !confirm(cli.yes, &format!("uninstall {}?", entry.full_name()))? {
                return Ok(());
            }
            run_streamed("uninstall", &backend, |b, s| async move { packages::uninstall(&b, &entry, &s).await }).await
        }
        Command::Upgrade => {
            if !confirm(cli.yes, "perform a full system upgrade?")? {
                return Ok(());
            }
            run_streamed("upgrade", &backend, |b, s| async move { upgrade::full_upgrade(&b, &s).await }).await
        }
        Command::RepoUpdate => {
            run_streamed("repo_update", &backend, |b, s| async move { repo::update_repositories(&b, &s).await }).await
        }
        Command::Check => {
            run_streamed("check", &backend, |b, s| async move { checker::check_system(&b, &s).await }).await
        }
        Command::Cleanup => {
            let info = cache::cache_info(&backend).await;
            if !info.has_cache {
                println!("{}", style(":: no cache to clear").green());
                return Ok(());
            }
            if !confirm(cli.yes, &info.cleanup_question())? {
                return Ok(());
            }
            run_streamed("cleanup", &backend, |b, s| async move { cache::cleanup(&b, &s).await }).await
        }
        Command::Cache => {
            let info = cache::cache_info(&backend).await;
            match info.size_human {
                Some(size) => println!(
                    "{} {} ({})",
                    style("Luet cache:").bold(),
                    size,
                    backend.config.paths.cache_dir.display()
                ),
                None => println!("{} empty", style("Luet cache:").bold()),
            }
            Ok(())
        }
        Command::Info { package } => {
            let entry = resolve(&backend, &package).await?;
            let text = details::details_text(&backend, &entry).await;
            for line in text.lines() {
                match line.split_once(": ") {
                    Some((key, value)) if !key.starts_with(' ') => {
                        println!("{} {}", style(format!("{}:", key)).bold().cyan(), value)
                    }
                    _ => println!("{}", line),
                }
            }
            Ok(())
        }
        Command::Files { package } => {
            let (category, name) = parse_full_name(&package)?;
            let full_name = format!("{}/{}", category, name);
            match details::files(&backend, &full_name).await {
                Some(files) if files.is_empty() => println!("No files found or package not installed"),
                Some(files) => files.iter().for_each(|f| println!("{}", f)),
                None => return Err(LuetError::Other("Error retrieving package files information.".into()).into()),
            }
            Ok(())
        }
        Command::RequiredBy { package } => {
            let (category, name) = parse_full_name(&package)?;
            let full_name = format!("{}/{}", category, name);
            match details::required_by(&backend, &full_name).await {
                Some(pkgs) if pkgs.is_empty() => println!("This package is not required by any other package."),
                Some(pkgs) => pkgs.iter().for_each(|p| println!("{}", p)),
                None => return Err(LuetError::Other("Error retrieving required by information.".into()).into()),
            }
            Ok(())
        }
        Command::SyncInfo => {
            let sync = sync_info::last_sync(&backend.config.paths.sync_file);
            println!("{} {} ({})", style("Last sync:").bold(), sync.datetime, sync.ago);
            Ok(())
        }
    }
}

fn parse_full_name(package: &str) -> LuetResult<(&str, &str)> {
    split_full_name(package).ok_or_else(|| LuetError::Other(format!("expected category/name, got '{}'", package)))
}

/// Look up `category/name` in the repositories
async fn resolve(backend: &Backend, package: &str) -> LuetResult<PackageEntry> {
    let (category, name) = parse_full_name(package)?;
    let raw = search::run_search(backend, name, SearchMode::Name)
        .await
        .map_err(LuetError::Other)?;

    raw.into_iter()
        .find(|p| p.category == category && p.name == name)
        .map(PackageEntry::from)
        .ok_or_else(|| LuetError::PackageNotFound {
            package: package.to_string(),
        })
}

fn ensure_unprotected(entry: &PackageEntry) -> LuetResult<()> {
    if entry.action() == PackageAction::Protected {
        return Err(LuetError::Protected {
            package: entry.full_name(),
            message: entry.protection_message(),
        });
    }
    Ok(())
}

fn confirm(assume_yes: bool, question: &str) -> LuetResult<bool> {
    if assume_yes {
        return Ok(true);
    }
    print!("{} {} [Y/n] ", style("::").bold().cyan(), question);
    io::stdout().flush().context("flushing stdout")?;
    let mut input = String::new();
    io::stdin().read_line(&mut input).context("reading answer")?;
    let answer = input.trim().to_lowercase();
    Ok(answer.is_empty() || answer.starts_with('y'))
}

async fn cmd_search(backend: &Backend, query: &str, label: bool, json: bool) -> Result<()> {
    let mode = if label { SearchMode::Label } else { SearchMode::Name };

    let spinner_style = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg}")?;
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style);
    pb.set_message(format!("searching for {}...", query));
    pb.enable_steady_tick(Duration::from_millis(80));
    let outcome = search::search(backend, query, mode).await;
    pb.finish_and_clear();

    let entries = match outcome {
        search::SearchOutcome::Packages(entries) => entries,
        search::SearchOutcome::Error(message) => return Err(LuetError::Other(message).into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entries).map_err(LuetError::from)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("no matches found.");
        return Ok(());
    }

    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(vec!["Category", "Name", "Version", "Repository", "Action"]);
    for e in &entries {
        t.add_row(vec![
            e.category.clone(),
            e.name.clone(),
            e.version.clone(),
            e.repository.clone(),
            e.action().to_string(),
        ]);
    }
    println!("{}", t);
    println!("{}", style(format!("Found {} results matching '{}'", entries.len(), query)).bold());
    Ok(())
}

/// Print an operation's progress to the console while it runs.
///
/// Ctrl+C stops waiting and reports the operation as interrupted.
async fn run_streamed<F, Fut>(name: &'static str, backend: &Backend, op: F) -> Result<()>
where
    F: FnOnce(Backend, OpSink) -> Fut,
    Fut: std::future::Future<Output = Completion>,
{
    let (sink, mut rx) = OpSink::channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                OpEvent::Log(text) if text.ends_with('\n') => print!("{}", text),
                OpEvent::Log(text) => println!("{}", text),
                OpEvent::Status(text) => println!("{} {}", style("::").bold().cyan(), style(text).bold()),
                OpEvent::Finished(_) => {}
            }
        }
    });

    let fut = op(backend.clone(), sink).instrument(crate::span_operation!(name));
    let completion = tokio::select! {
        completion = fut => completion,
        _ = tokio::signal::ctrl_c() => {
            printer.abort();
            return Err(LuetError::Interrupted.into());
        }
    };
    let _ = printer.await;
    report(completion)
}

fn report(completion: Completion) -> Result<()> {
    if completion.success {
        println!("{}", style(format!(":: {}", completion.message)).green().bold());
        return Ok(());
    }
    eprintln!("{}", style(format!(":: {}", completion.message)).red().bold());
    let argv: Vec<String> = std::env::args().collect();
    Err(LuetError::command_failed(&argv, completion.code, completion.message).into())
}
