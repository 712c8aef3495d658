//! Single-page overview of one symbol: prices, short interest and forum chatter.

use super::{series, ui};
use crate::core::listing::Listing;
use crate::core::session::{HistoryRequest, QuerySession, SeriesRequest};
use crate::core::table::TimeSeriesTable;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::try_join;
use tracing::info;

pub const PRICE_COLUMNS: [&str; 5] = ["Open", "Close", "High", "Low", "Volume"];
pub const SHORT_INTEREST_COLUMN: &str = "TotalVolume";

pub struct DashboardData {
    pub prices: TimeSeriesTable,
    pub short_interest: TimeSeriesTable,
    pub posts: Listing,
}

/// Fetches the three panels together; any provider failure fails the page.
pub async fn fetch(
    session: &QuerySession,
    start: NaiveDate,
    end: NaiveDate,
    forum: &str,
    post_limit: usize,
) -> Result<DashboardData> {
    let history = HistoryRequest::new(start).end(end);
    let series = SeriesRequest::new(start, end);

    let (prices, short_interest, posts) = try_join!(
        session.price_history(&history),
        session.time_series(&series),
        session.hot(forum, post_limit),
    )?;

    let prices = prices
        .select(&PRICE_COLUMNS)
        .context("Price history is missing OHLCV columns")?
        .sorted_by_index(true);

    // Fall back to every column if the dataset uses another schema.
    let short_interest = short_interest
        .select(&[SHORT_INTEREST_COLUMN])
        .unwrap_or(short_interest);

    Ok(DashboardData {
        prices,
        short_interest,
        posts,
    })
}

pub async fn run(
    session: &QuerySession,
    start: NaiveDate,
    end: NaiveDate,
    forum: &str,
    post_limit: usize,
) -> Result<()> {
    info!(symbol = %session.symbol(), %start, %end, "Building dashboard");

    let pb = ui::new_spinner("Fetching prices, short interest and posts...");
    let result = fetch(session, start, end, forum, post_limit).await;
    pb.finish_and_clear();
    let data = result?;

    println!(
        "{}",
        ui::style_text("The Short Squeeze is On!", ui::StyleType::Title)
    );
    println!(
        "{}",
        ui::style_text(
            "This is purely intended for fun, so do not trade based on the information contained here.",
            ui::StyleType::Subtle
        )
    );

    ui::print_separator();
    println!(
        "Share Price Details for {} ({} to {})\n",
        ui::style_text(&format!("${}", session.symbol()), ui::StyleType::Label),
        start,
        end
    );
    if data.prices.is_empty() {
        println!("{}", ui::style_text("No prices in range.", ui::StyleType::Error));
    } else {
        println!("{}", series::render_table(&data.prices));
    }

    ui::print_separator();
    println!(
        "Short Interest over Time ({})\n",
        ui::style_text(&session.dataset_code(), ui::StyleType::Label)
    );
    if data.short_interest.is_empty() {
        println!(
            "{}",
            ui::style_text("No short interest in range.", ui::StyleType::Error)
        );
    } else {
        println!("{}", series::render_table(&data.short_interest));
    }

    ui::print_separator();
    println!(
        "Top posts on {}\n",
        ui::style_text(&format!("r/{forum}"), ui::StyleType::Label)
    );
    println!("{}", data.posts.display_as_table());

    Ok(())
}
