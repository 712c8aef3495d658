use super::ui;
use crate::core::normalise::NORMALISED_COLUMN;
use crate::core::session::{HistoryRequest, QuerySession, SeriesRequest};
use crate::core::table::{ColumnData, TimeSeriesTable};
use anyhow::Result;
use chrono::{NaiveDateTime, Timelike};
use comfy_table::{Cell, CellAlignment};
use tracing::debug;

fn format_index(ts: &NaiveDateTime) -> String {
    if ts.num_seconds_from_midnight() == 0 {
        ts.format("%Y-%m-%d").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M").to_string()
    }
}

fn value_cell(data: &ColumnData, row: usize) -> Cell {
    match data {
        ColumnData::Numeric(_) => {
            Cell::new(data.display_at(row)).set_alignment(CellAlignment::Right)
        }
        ColumnData::Text(_) => Cell::new(data.display_at(row)),
    }
}

/// Renders a time series as a terminal table, one row per index entry.
pub fn render_table(table: &TimeSeriesTable) -> String {
    let mut output = ui::new_styled_table();

    let mut header = vec![ui::header_cell("Date")];
    for name in table.column_names() {
        header.push(ui::header_cell(name));
    }
    output.set_header(header);

    for (row, ts) in table.index().iter().enumerate() {
        let mut cells = vec![Cell::new(format_index(ts))];
        for column in table.columns() {
            let cell = match (&column.data, column.name.as_str()) {
                (ColumnData::Numeric(values), NORMALISED_COLUMN) => {
                    ui::change_cell(values.get(row).copied().flatten())
                }
                (data, _) => value_cell(data, row),
            };
            cells.push(cell);
        }
        output.add_row(cells);
    }

    output.to_string()
}

fn print_result(title: &str, table: &TimeSeriesTable, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(table)?);
        return Ok(());
    }

    println!("{}\n", ui::style_text(title, ui::StyleType::Title));
    if table.is_empty() {
        println!(
            "{}",
            ui::style_text("No data returned for this range.", ui::StyleType::Subtle)
        );
    } else {
        println!("{}", render_table(table));
    }
    Ok(())
}

pub async fn run_prices(
    session: &QuerySession,
    request: &HistoryRequest,
    json: bool,
) -> Result<()> {
    debug!(?request, "Fetching price history");
    let pb = ui::new_spinner("Fetching prices...");
    let result = session.price_history(request).await;
    pb.finish_and_clear();

    let table = result?;
    let title = format!("Share price for ${} ({})", session.symbol(), request.interval);
    print_result(&title, &table, json)
}

pub async fn run_short_interest(
    session: &QuerySession,
    request: &SeriesRequest,
    json: bool,
) -> Result<()> {
    debug!(?request, code = %session.dataset_code(), "Fetching short interest");
    let pb = ui::new_spinner("Fetching short interest...");
    let result = session.time_series(request).await;
    pb.finish_and_clear();

    let table = result?;
    let title = format!("Short interest for ${} ({})", session.symbol(), session.dataset_code());
    print_result(&title, &table, json)
}

pub async fn run_multi(
    session: &QuerySession,
    codes: &[String],
    request: &SeriesRequest,
    json: bool,
) -> Result<()> {
    let pb = ui::new_spinner("Fetching datasets...");
    let result = session
        .multi_time_series(codes, request.start, request.end)
        .await;
    pb.finish_and_clear();

    let table = result?;
    print_result(&format!("Datasets: {}", codes.join(", ")), &table, json)
}
