use anyhow::{anyhow, bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use finance_tracker_backend::domain::commands::movements::{CreateMovementCommand, MonthQuery};
use finance_tracker_backend::domain::statement_parser::normalize_amount;
use finance_tracker_backend::domain::LoadOutcome;
use finance_tracker_backend::Backend;
use log::debug;
use shared::{MovementDirection, ThemeMode};
use std::path::PathBuf;

mod format;

#[derive(Parser, Debug)]
#[command(name = "finance-tracker", version, about = "Personal income and expense tracker")]
struct Cli {
    /// Data directory (default: $FINANCE_TRACKER_DATA_DIR or ~/Documents/Finance Tracker)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a bank statement (date;description;amount per line)
    Import {
        /// Owner of the imported movements (default: config default_owner)
        #[arg(long)]
        owner: Option<String>,

        /// Statement file
        file: PathBuf,
    },

    /// Record a single movement
    Add {
        #[arg(long)]
        owner: Option<String>,

        #[arg(long)]
        title: String,

        /// Amount, either 1234.56 or 1.234,56
        #[arg(long, allow_hyphen_values = true)]
        amount: String,

        /// Record as an expense instead of an income
        #[arg(long)]
        expense: bool,

        #[arg(long, default_value = "")]
        subtitle: String,

        /// Date as dd/mm/yyyy (default: now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a movement by ID
    Delete {
        #[arg(long)]
        owner: Option<String>,

        id: String,
    },

    /// Totals and daily balance for one month (default: current month)
    Summary {
        #[arg(long)]
        owner: Option<String>,

        #[arg(long)]
        year: Option<i32>,

        /// 1-12
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },

    /// Movement history, newest month first
    History {
        #[arg(long)]
        owner: Option<String>,

        /// Number of paging steps after the current month (default: config history_pages)
        #[arg(long)]
        pages: Option<u32>,
    },

    /// Show or change preferences
    Prefs {
        /// system, light or dark
        #[arg(long)]
        theme: Option<ThemeMode>,

        /// BCP-47 language tag, e.g. es or en-GB
        #[arg(long)]
        language: Option<String>,

        /// Clamped to 0.5-2.0
        #[arg(long)]
        text_scale: Option<f32>,

        /// Account to select
        #[arg(long, conflicts_with = "clear_account")]
        account: Option<String>,

        /// Clear the selected account
        #[arg(long)]
        clear_account: bool,
    },
}

fn resolve_owner(backend: &Backend, owner: Option<String>) -> Result<String> {
    owner
        .or_else(|| backend.config.default_owner.clone())
        .filter(|owner| !owner.trim().is_empty())
        .ok_or_else(|| anyhow!("No owner given: pass --owner or set default_owner in config.yaml"))
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%d/%m/%Y")
        .with_context(|| format!("Invalid date '{}', expected dd/mm/yyyy", value))
}

/// Parse a user-typed amount; the sign, if any, picks the direction
fn parse_amount(value: &str, expense: bool) -> Result<(f64, MovementDirection)> {
    let parsed = normalize_amount(value).ok_or_else(|| anyhow!("Invalid amount '{}'", value))?;
    let direction = if expense || parsed < 0.0 {
        MovementDirection::Expense
    } else {
        MovementDirection::Income
    };
    Ok((parsed.abs(), direction))
}

async fn run(cli: Cli) -> Result<()> {
    let backend = Backend::open(cli.data_dir)?;
    debug!("Data directory: {}", backend.data_directory().display());

    match cli.command {
        Command::Import { owner, file } => {
            let owner = resolve_owner(&backend, owner)?;
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Reading {}", file.display()))?;
            // Bank exports are not always UTF-8
            let text = String::from_utf8_lossy(&bytes);

            let summary = backend
                .movement_service
                .import_statement(&owner, &text)
                .await?;
            println!("{}", format::import(&summary));
        }

        Command::Add {
            owner,
            title,
            amount,
            expense,
            subtitle,
            date,
        } => {
            let owner = resolve_owner(&backend, owner)?;
            let (amount, direction) = parse_amount(&amount, expense)?;
            let date = date.as_deref().map(parse_date).transpose()?;

            let movement = backend
                .movement_service
                .create_movement(CreateMovementCommand {
                    owner_id: owner,
                    title,
                    subtitle,
                    amount,
                    direction,
                    date,
                })
                .await?;
            println!("Added {}", movement.id);
            println!("{}", format::movement_line(&movement));
        }

        Command::Delete { owner, id } => {
            let owner = resolve_owner(&backend, owner)?;
            if !backend.movement_service.delete_movement(&owner, &id).await? {
                bail!("Movement {} not found", id);
            }
            println!("Deleted {}", id);
        }

        Command::Summary { owner, year, month } => {
            let owner = resolve_owner(&backend, owner)?;
            let today = Local::now().date_naive();
            let query = MonthQuery {
                owner_id: owner,
                year: year.unwrap_or(today.year()),
                month: month.unwrap_or(today.month()),
            };

            let summary = backend.movement_service.month_summary(&query).await?;
            print!("{}", format::summary(&summary));
        }

        Command::History { owner, pages } => {
            let owner = resolve_owner(&backend, owner)?;
            let pages = pages.unwrap_or(backend.config.history_pages);

            let mut pager = backend.month_pager();
            pager.start(&owner).await?;
            for _ in 0..pages {
                if pager.load_next(&owner).await? == LoadOutcome::Exhausted {
                    break;
                }
            }

            let sections = pager.sections();
            if sections.is_empty() {
                println!("No movements found");
            }
            for section in &sections {
                let totals = backend.aggregation_service.totals(&section.movements);
                print!("{}", format::section(section, &totals));
            }
        }

        Command::Prefs {
            theme,
            language,
            text_scale,
            account,
            clear_account,
        } => {
            let prefs = &backend.preference_service;
            if let Some(theme) = theme {
                prefs.set_theme(theme).await?;
            }
            if let Some(language) = language {
                prefs.set_language(&language).await?;
            }
            if let Some(scale) = text_scale {
                prefs.set_text_scale(scale).await?;
            }
            if clear_account {
                prefs.set_selected_account(None).await?;
            } else if let Some(account) = account {
                prefs.set_selected_account(Some(&account)).await?;
            }
            println!("{}", format::preferences(&prefs.snapshot()));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    run(cli).await
}
