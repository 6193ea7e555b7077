mod aggregate;
mod cli;
mod config;
mod cost;
mod error;
mod history;
mod logging;
mod output;
mod period;
mod pricing;
mod types;
mod window;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;

use aggregate::{detailed_group_stats, period_summaries, RecordField};
use cli::{Cli, Report};
use config::Config;
use cost::{Pricing, PricingMap};
use output::PeriodRow;
use pricing::{OverridePrices, PriceTable};
use types::HistoryRecord;
use window::Bounds;

fn history_path(cli: &Cli, config: &Config) -> Option<PathBuf> {
    cli.history
        .clone()
        .or_else(|| config.history.clone())
        .or_else(|| config::project_dirs().map(|d| d.data_dir().join("history.jsonl")))
}

/// CLI rates win over config rates, per rate.
fn override_prices(cli: &Cli, config: &Config) -> OverridePrices {
    let from_cli = OverridePrices::parse(cli.input_price.as_deref(), cli.output_price.as_deref());
    let from_config = config.pricing.overrides();
    OverridePrices {
        input: from_cli.input.or(from_config.input),
        output: from_cli.output.or(from_config.output),
    }
}

fn select(records: Vec<HistoryRecord>, cli: &Cli) -> Vec<HistoryRecord> {
    let mut records = records;
    if let Some(w) = cli.window {
        records = window::filter(records, w.bounds(&Local::now()));
    }
    if let Some(bounds) = Bounds::between_dates(&Local, cli.from, cli.to) {
        records = window::filter(records, bounds);
    }
    records
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.quiet);

    let config = config::load_config()?;
    let default_period = config
        .default_granularity()
        .context("invalid default_period in config")?;
    let report = cli
        .effective_command(default_period)
        .report()
        .context("invalid period")?;

    let overrides = override_prices(&cli, &config);
    if !overrides.is_empty() {
        tracing::debug!(?overrides, "override prices for unknown models");
    }
    let pricing = Pricing::new(PriceTable::builtin(), overrides);

    if report == Report::Models {
        return run_report(&report, &[], &cli, &config, &pricing);
    }

    let path = history_path(&cli, &config).context("no history path configured")?;
    tracing::debug!(path = %path.display(), "loading history");
    let records = select(history::load(&path)?, &cli);

    if records.is_empty() {
        eprintln!("No history records found.");
        return Ok(());
    }

    if !cli.quiet {
        eprintln!("Found {} history records.", records.len());
    }

    let unknown = pricing.unknown_models(&records);
    if !unknown.is_empty() {
        tracing::warn!(
            models = %unknown.join(", "),
            "no table pricing, using fallback rates"
        );
    }

    run_report(&report, &records, &cli, &config, &pricing)
}

fn run_report(
    report: &Report,
    records: &[HistoryRecord],
    cli: &Cli,
    config: &Config,
    pricing: &Pricing,
) -> Result<()> {
    let columns = cli::resolve_columns(cli.columns.clone());
    let model_name = |id: &str| pricing.table.display_name(id);
    let action_name = |id: &str| config.action_name(id);

    match *report {
        Report::Periods {
            granularity,
            breakdown,
        } => {
            let rows: Vec<PeriodRow> = period_summaries(records, granularity, pricing)
                .into_iter()
                .map(|(group, summary)| PeriodRow {
                    models: if breakdown {
                        detailed_group_stats(
                            group.records.iter().copied(),
                            RecordField::Model,
                            model_name,
                            pricing,
                        )
                    } else {
                        Vec::new()
                    },
                    period: group.key,
                    summary,
                })
                .collect();

            match cli.format {
                cli::OutputFormat::Json => output::print_json(&rows)?,
                cli::OutputFormat::Table => output::print_period_table(&rows, &columns),
            }
        }
        Report::Groups(field) => {
            let (stats, heading) = match field {
                RecordField::ActionName => (
                    detailed_group_stats(records, field, action_name, pricing),
                    "Command",
                ),
                RecordField::Model => (
                    detailed_group_stats(records, field, model_name, pricing),
                    "Model",
                ),
                RecordField::Temperature => (
                    detailed_group_stats(records, field, |t: &str| format!("{t}°"), pricing),
                    "Temperature",
                ),
            };
            match cli.format {
                cli::OutputFormat::Json => output::print_json(&stats)?,
                cli::OutputFormat::Table => output::print_group_table(&stats, &columns, heading),
            }
        }
        Report::Recent(limit) => {
            let start = records.len().saturating_sub(limit);
            let recent: Vec<&HistoryRecord> = records[start..].iter().collect();
            match cli.format {
                cli::OutputFormat::Json => output::print_json(&recent)?,
                cli::OutputFormat::Table => {
                    output::print_recent(&recent, &pricing.table, action_name)
                }
            }
        }
        Report::Models => match cli.format {
            cli::OutputFormat::Json => output::print_models_json(&pricing.table)?,
            cli::OutputFormat::Table => output::print_models(&pricing.table),
        },
    }

    Ok(())
}
