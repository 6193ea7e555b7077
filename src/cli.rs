use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use crate::aggregate::RecordField;
use crate::period::Granularity;
use crate::window::Window;

#[derive(Parser, Debug)]
#[command(
    name = "promptmeter",
    about = "Cost and usage summaries for AI command palette history"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// History file (JSON array or JSON Lines) or directory of them
    #[arg(long, global = true)]
    pub history: Option<PathBuf>,

    /// Relative time window
    #[arg(long, global = true)]
    pub window: Option<Window>,

    /// Start date filter (YYYY-MM-DD, local time)
    #[arg(long, global = true)]
    pub from: Option<NaiveDate>,

    /// End date filter (YYYY-MM-DD, inclusive)
    #[arg(long, global = true)]
    pub to: Option<NaiveDate>,

    /// Output format: table (default), json
    #[arg(long, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Columns to display (comma-separated).
    /// Use +col to add, -col to remove from defaults, or plain names to replace.
    /// Available: period,count,cost,tokens,avg_tokens,time,avg_time
    #[arg(long, global = true, value_delimiter = ',', allow_hyphen_values = true)]
    pub columns: Option<Vec<String>>,

    /// Input price per 1M tokens for models missing from the price table
    #[arg(long, global = true)]
    pub input_price: Option<String>,

    /// Output price per 1M tokens for models missing from the price table
    #[arg(long, global = true)]
    pub output_price: Option<String>,

    /// Suppress progress output (for scripting)
    #[arg(long, global = true)]
    pub quiet: bool,
}

pub const DEFAULT_COLUMNS: &[&str] = &[
    "period",
    "count",
    "cost",
    "tokens",
    "avg_tokens",
    "avg_time",
];

/// Resolve `--columns` into a final list.
/// - No flag → defaults
/// - All prefixed with +/- → modify defaults (e.g. `+time,-avg_tokens`)
/// - Plain names → explicit replacement (e.g. `period,cost`)
pub fn resolve_columns(raw: Option<Vec<String>>) -> Vec<String> {
    let Some(raw) = raw else {
        return DEFAULT_COLUMNS.iter().map(|s| s.to_string()).collect();
    };

    let is_modifier = raw.iter().all(|c| c.starts_with('+') || c.starts_with('-'));

    if !is_modifier {
        return raw;
    }

    let mut cols: Vec<String> = DEFAULT_COLUMNS.iter().map(|s| s.to_string()).collect();
    for entry in &raw {
        if let Some(name) = entry.strip_prefix('+') {
            if !cols.iter().any(|c| c == name) {
                cols.push(name.to_string());
            }
        } else if let Some(name) = entry.strip_prefix('-') {
            cols.retain(|c| c != name);
        }
    }
    cols
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Summarize by hour
    Hourly(PeriodArgs),
    /// Summarize by day (default)
    Daily(PeriodArgs),
    /// Summarize by ISO week
    Weekly(PeriodArgs),
    /// Summarize by month
    Monthly(PeriodArgs),
    /// Summarize by year
    Yearly(PeriodArgs),
    /// Summarize by a period named at runtime (hour, day, week, month, year)
    Period {
        granularity: String,
        #[command(flatten)]
        args: PeriodArgs,
    },
    /// Per-command statistics, busiest first
    Action,
    /// Per-model statistics, busiest first
    Model,
    /// Per-temperature statistics, busiest first
    Temperature,
    /// One stats line per request, newest last
    Recent {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// List the built-in price table
    Models,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct PeriodArgs {
    /// Show per-model rows within each period
    #[arg(long)]
    pub breakdown: bool,
}

#[derive(ValueEnum, Debug, Clone, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
}

/// What a command asks the aggregator for.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Periods { granularity: Granularity, breakdown: bool },
    Groups(RecordField),
    Recent(usize),
    Models,
}

impl Cli {
    /// The command to run. Without a subcommand this is a period table at the
    /// configured default granularity.
    pub fn effective_command(&self, default_period: Option<Granularity>) -> Command {
        self.command.clone().unwrap_or(match default_period {
            Some(g) => Command::Period {
                granularity: g.to_string(),
                args: PeriodArgs::default(),
            },
            None => Command::Daily(PeriodArgs::default()),
        })
    }
}

impl Command {
    pub fn report(&self) -> Result<Report, crate::error::UsageError> {
        let periods = |granularity, args: &PeriodArgs| Report::Periods {
            granularity,
            breakdown: args.breakdown,
        };
        Ok(match self {
            Command::Hourly(a) => periods(Granularity::Hour, a),
            Command::Daily(a) => periods(Granularity::Day, a),
            Command::Weekly(a) => periods(Granularity::Week, a),
            Command::Monthly(a) => periods(Granularity::Month, a),
            Command::Yearly(a) => periods(Granularity::Year, a),
            Command::Period { granularity, args } => periods(granularity.parse()?, args),
            Command::Action => Report::Groups(RecordField::ActionName),
            Command::Model => Report::Groups(RecordField::Model),
            Command::Temperature => Report::Groups(RecordField::Temperature),
            Command::Recent { limit } => Report::Recent(*limit),
            Command::Models => Report::Models,
        })
    }
}
