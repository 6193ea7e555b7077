use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};
use serde::Serialize;

use crate::pricing::PriceTable;
use crate::types::{DetailedGroupStat, GroupSummary, HistoryRecord, RequestStats};

/// One period row, with its per-model rows when a breakdown was asked for.
#[derive(Debug, Serialize)]
pub struct PeriodRow {
    pub period: String,
    #[serde(flatten)]
    pub summary: GroupSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<DetailedGroupStat>,
}

fn format_tokens(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn format_cost(cost: f64) -> String {
    format!("${:.4}", cost)
}

fn format_secs(secs: f64) -> String {
    format!("{:.1}s", secs)
}

fn column_header(col: &str) -> &str {
    match col {
        "period" => "Period",
        "count" => "Requests",
        "cost" => "Cost",
        "tokens" => "Tokens",
        "avg_tokens" => "Avg Tokens",
        "time" => "Time",
        "avg_time" => "Avg Time",
        other => other,
    }
}

fn summary_cell(col: &str, label: &str, s: &GroupSummary) -> Cell {
    match col {
        "period" => Cell::new(label),
        "count" => Cell::new(s.member_count),
        "cost" => Cell::new(format_cost(s.total_cost)),
        "tokens" => Cell::new(format_tokens(s.total_tokens)),
        "avg_tokens" => Cell::new(format_tokens(s.average_tokens.round() as u64)),
        "time" => Cell::new(format_secs(s.total_elapsed_secs)),
        "avg_time" => Cell::new(format_secs(s.average_elapsed_secs)),
        _ => Cell::new(""),
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn print_period_table(rows: &[PeriodRow], columns: &[String]) {
    let mut table = new_table();
    table.set_header(columns.iter().map(|c| Cell::new(column_header(c))));

    let mut totals = GroupSummary::default();

    for row in rows {
        table.add_row(columns.iter().map(|c| summary_cell(c, &row.period, &row.summary)));

        for detail in &row.models {
            let label = format!("  {}", detail.label);
            table.add_row(columns.iter().map(|c| summary_cell(c, &label, &detail.summary)));
        }

        totals.accumulate_from(&row.summary);
    }

    table.add_row(columns.iter().map(|c| summary_cell(c, "TOTAL", &totals)));

    println!("{table}");
}

/// Group tables label their first column by what was grouped on.
pub fn print_group_table(stats: &[DetailedGroupStat], columns: &[String], heading: &str) {
    let mut table = new_table();
    table.set_header(columns.iter().map(|c| match c.as_str() {
        "period" => Cell::new(heading),
        other => Cell::new(column_header(other)),
    }));

    for s in stats {
        table.add_row(columns.iter().map(|c| summary_cell(c, &s.label, &s.summary)));
    }

    println!("{table}");
}

pub fn print_models(table: &PriceTable) {
    let mut out = new_table();
    out.set_header(vec![
        "Model",
        "Name",
        "Provider",
        "Input /1M",
        "Output /1M",
        "Thinking /1M",
        "Thinking Budget",
    ]);
    for m in table.models() {
        out.add_row(vec![
            Cell::new(&m.id),
            Cell::new(&m.display_name),
            Cell::new(m.provider),
            Cell::new(format!("{:.2}", m.input_per_million)),
            Cell::new(format!("{:.2}", m.output_per_million)),
            Cell::new(format!("{:.2}", m.reasoning_output_per_million)),
            Cell::new(m.default_reasoning_budget),
        ]);
    }
    println!("{out}");
}

/// Footer line for one request, e.g.
/// `2.5 Flash; 0.2°; Time: 0.4+1.1 sec; P:120 + I:20 + T:0 ~ 560 tokens`.
/// The split time is shown only when first response and total differ by at
/// least 0.1 s.
pub fn format_request_stats(model_name: &str, temperature: f64, stats: &RequestStats) -> String {
    let total = stats.total_elapsed_secs.unwrap_or(0.0);
    let first = stats.first_response_secs.unwrap_or(0.0);
    let time = if (total - first).abs() < 0.1 {
        format!("Time: {:.1} sec", total)
    } else {
        format!("Time: {:.1}+{:.1} sec", first, total - first)
    };

    format!(
        "{model_name}; {temperature}°; {time}; P:{} + I:{} + T:{} ~ {} tokens",
        stats.prompt(),
        stats.input_tokens.unwrap_or(0),
        stats.reasoning(),
        stats.total_reported(),
    )
}

pub fn print_recent(
    records: &[&HistoryRecord],
    prices: &PriceTable,
    name_action: impl Fn(&str) -> String,
) {
    for r in records {
        let when = chrono::DateTime::from_timestamp_millis(r.timestamp)
            .map(|t| t.with_timezone(&chrono::Local).format("%H:%M:%S, %B %-d").to_string())
            .unwrap_or_else(|| r.timestamp.to_string());
        let action = r
            .action_name
            .as_deref()
            .map(&name_action)
            .unwrap_or_else(|| "-".to_string());
        let model = prices.display_name(r.model_id.as_deref().unwrap_or("-"));

        match &r.stats {
            Some(stats) => println!(
                "{when}  {action}  {}",
                format_request_stats(&model, r.temperature.unwrap_or(0.0), stats)
            ),
            None => println!("{when}  {action}  {model}; no usage reported"),
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_models_json(table: &PriceTable) -> anyhow::Result<()> {
    print_json(&table.models())
}
