//! pocketmoney command-line front end.
//!
//! A thin presentation layer over [`BudgetEngine`] backed by the file store.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pocketmoney::storage::{open_store, PersistentConfig};
use pocketmoney::{
    BudgetEngine, BudgetResult, DayOutcome, EngineConfig, ExecutionError, RateNormalization,
    SettlementAction, Settings, SystemClock,
};

/// Pocket money: a daily spending limit from a monthly allowance
#[derive(Parser, Debug)]
#[command(name = "pocketmoney", version, about, long_about = None)]
struct Cli {
    /// Directory holding the budget documents
    #[arg(short, long, env = "POCKETMONEY_DATA_DIR", default_value = "./pocketmoney-data")]
    data_dir: PathBuf,

    /// How the monthly figure is spread over days
    #[arg(long, value_enum, default_value_t = Normalization::FullMonth)]
    normalization: Normalization,

    /// Refuse a second settlement on the same day
    #[arg(long)]
    one_per_day: bool,

    /// Skip fsync after writes
    #[arg(long)]
    no_sync: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a new month (erases history, savings and deductions)
    Init {
        /// Total funds for the month
        #[arg(short, long)]
        allowance: Decimal,

        /// Weekend-day budget relative to a weekday
        #[arg(short, long, default_value = "1.5")]
        weekend: Decimal,

        /// Currency prefix for display
        #[arg(short, long)]
        currency: Option<String>,
    },

    /// Show today's budget and running totals
    Show {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// End the day: record what was spent
    Settle {
        /// Amount spent today
        #[arg(short, long)]
        spent: Decimal,

        /// What to do with the surplus or deficit (defaults to spread / month)
        #[arg(short, long, value_enum)]
        choice: Option<Choice>,
    },

    /// List settled days, newest first
    History,

    /// Subtract a fixed amount from every day's budget for a number of days
    Deduct {
        /// Amount per day
        #[arg(long)]
        daily: Decimal,

        /// Number of days the deduction stays active
        #[arg(long)]
        days: u32,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Normalization {
    FullMonth,
    RemainingDays,
}

impl From<Normalization> for RateNormalization {
    fn from(n: Normalization) -> Self {
        match n {
            Normalization::FullMonth => Self::FullMonth,
            Normalization::RemainingDays => Self::RemainingDays,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Choice {
    /// Surplus: increase the daily budget for the rest of the month
    Spread,
    /// Surplus: add to the savings pot
    Save,
    /// Deficit: heavier cuts, back on track sooner
    Week,
    /// Deficit: smaller cuts across remaining days
    Month,
}

impl From<Choice> for SettlementAction {
    fn from(c: Choice) -> Self {
        match c {
            Choice::Spread => Self::Spread,
            Choice::Save => Self::Save,
            Choice::Week => Self::FixWeek,
            Choice::Month => Self::SpreadLoss,
        }
    }
}

fn suggestion(daily_budget: Decimal) -> (&'static str, &'static str) {
    if daily_budget > Decimal::from(50) {
        ("Treat yourself!", "Cinema, fancy dinner, or a new game?")
    } else if daily_budget > Decimal::from(20) {
        ("Nice day out", "Grab a coffee, visit a museum, or eat out.")
    } else {
        ("Low cost fun", "Read a book, go for a walk, or cook a nice meal.")
    }
}

fn run(cli: Cli) -> BudgetResult<()> {
    let store = open_store(
        &cli.data_dir,
        Some(PersistentConfig {
            sync_on_write: !cli.no_sync,
        }),
    )?;
    let config = EngineConfig::default()
        .with_normalization(cli.normalization.into())
        .with_one_settlement_per_day(cli.one_per_day);
    let engine = BudgetEngine::new(Arc::new(store), Arc::new(SystemClock), config)?;

    match cli.command {
        Commands::Init {
            allowance,
            weekend,
            currency,
        } => {
            match currency {
                Some(c) => engine.initialize_month_with_currency(allowance, weekend, c)?,
                None => engine.initialize_month(allowance, weekend)?,
            }
            println!("Month started.");
            print_snapshot(&engine)?;
        }

        Commands::Show { json } => {
            if json {
                let snapshot = engine.snapshot()?;
                let out = serde_json::to_string_pretty(&snapshot)
                    .map_err(|e| pocketmoney::BudgetError::internal(e.to_string()))?;
                println!("{out}");
            } else {
                print_snapshot(&engine)?;
            }
        }

        Commands::Settle { spent, choice } => {
            let budget = engine.compute_daily_budget()?;
            let outcome = DayOutcome::from_spend(budget, spent);
            let action = choice.map_or_else(
                || match outcome {
                    DayOutcome::Surplus(_) => SettlementAction::Spread,
                    DayOutcome::Deficit(_) => SettlementAction::SpreadLoss,
                },
                SettlementAction::from,
            );
            let settlement = engine.settle_spend(spent, action)?;
            let settings = onboarded_settings(&engine)?;
            match settlement.outcome {
                DayOutcome::Surplus(a) => {
                    println!("You saved {}! ({action})", settings.format_amount(a));
                }
                DayOutcome::Deficit(a) => {
                    println!("Over by {}. ({action})", settings.format_amount(a));
                }
            }
            print_snapshot(&engine)?;
        }

        Commands::History => {
            let history = engine.history()?;
            if history.is_empty() {
                println!("No history yet.");
                return Ok(());
            }
            let settings = onboarded_settings(&engine)?;
            for entry in history.iter().rev() {
                let label = if entry.diff.is_sign_negative() && !entry.diff.is_zero() {
                    "Over"
                } else {
                    "Saved"
                };
                println!(
                    "{}  {:<6}  spent {}  {label} {}",
                    entry.date.with_timezone(&chrono::Local).format("%Y-%m-%d"),
                    entry.action,
                    settings.format_amount(entry.spent),
                    settings.format_amount(entry.diff.abs()),
                );
            }
        }

        Commands::Deduct { daily, days } => {
            let end = Utc::now() + Duration::days(i64::from(days));
            engine.add_temporary_deduction(daily, end)?;
            println!("Deduction added until {}.", end.format("%Y-%m-%d"));
            print_snapshot(&engine)?;
        }
    }
    Ok(())
}

fn onboarded_settings(engine: &BudgetEngine) -> BudgetResult<Settings> {
    Ok(engine.settings()?.ok_or(ExecutionError::NotOnboarded)?)
}

fn print_snapshot(engine: &BudgetEngine) -> BudgetResult<()> {
    let s = engine.snapshot()?;
    let settings = onboarded_settings(engine)?;
    let (title, description) = suggestion(s.daily_budget);
    println!("Today's budget: {}", settings.format_amount(s.daily_budget));
    println!("Remaining:      {}", settings.format_amount(s.total_remaining));
    println!("Savings pot:    {}", settings.format_amount(s.savings_pot));
    if !s.active_deductions.is_zero() {
        println!("Deductions:     {}/day", settings.format_amount(s.active_deductions));
    }
    println!("{title} {description}");
    if s.settled_today {
        println!("(today is already settled)");
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_not_onboarded() => {
            eprintln!("error: {e}");
            eprintln!("hint: pocketmoney init --allowance <AMOUNT>");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
