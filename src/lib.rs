pub mod cli;
pub mod core;
pub mod providers;

// Re-export for the binary and integration tests
pub use crate::core::config;
pub use crate::core::error::{Error, ProviderKind};

use crate::core::config::{AppConfig, Credentials};
use crate::core::listing::ListingOrder;
use crate::core::provider::Interval;
use crate::core::session::{HistoryRequest, QuerySession, SeriesRequest, user_agent};
use crate::providers::{
    nasdaq_data_link::NasdaqDataLinkProvider, reddit::RedditProvider,
    yahoo_finance::YahooFinanceProvider,
};
use anyhow::{Result, bail};
use std::sync::Arc;
use chrono::{Days, NaiveDate, Utc};
use tracing::{debug, info};

/// A date range where either end may be left to the configured window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    /// Fills missing ends: `end` defaults to `today`, `start` to `window_days` before `end`.
    pub fn resolve(&self, today: NaiveDate, window_days: i64) -> Result<(NaiveDate, NaiveDate)> {
        let end = self.end.unwrap_or(today);
        let start = match self.start {
            Some(start) => start,
            None => end
                .checked_sub_days(Days::new(window_days.max(0) as u64))
                .unwrap_or(NaiveDate::MIN),
        };
        if start > end {
            bail!("Start date {} is after end date {}", start, end);
        }
        Ok((start, end))
    }
}

#[derive(Debug, Clone)]
pub enum AppCommand {
    Prices {
        symbol: Option<String>,
        window: DateWindow,
        interval: Interval,
        normalise: bool,
        normalise_column: Option<String>,
        json: bool,
    },
    ShortInterest {
        symbol: Option<String>,
        window: DateWindow,
        normalise_column: Option<String>,
        json: bool,
    },
    Multi {
        codes: Vec<String>,
        window: DateWindow,
        json: bool,
    },
    Info {
        symbol: Option<String>,
    },
    Posts {
        order: ListingOrder,
        forum: Option<String>,
        limit: Option<usize>,
        html: bool,
    },
    Dashboard {
        symbol: Option<String>,
        days: Option<i64>,
    },
}

impl AppCommand {
    fn symbol(&self) -> Option<&str> {
        match self {
            AppCommand::Prices { symbol, .. }
            | AppCommand::ShortInterest { symbol, .. }
            | AppCommand::Info { symbol }
            | AppCommand::Dashboard { symbol, .. } => symbol.as_deref(),
            AppCommand::Multi { .. } | AppCommand::Posts { .. } => None,
        }
    }
}

/// Builds a session for `symbol` backed by the HTTP providers configured in `config`.
pub fn connect_session(
    symbol: &str,
    config: &AppConfig,
    credentials: &Credentials,
) -> Result<QuerySession, Error> {
    let (auth_url, api_url) = config.providers.reddit_urls();
    let discussion = RedditProvider::new(
        auth_url,
        api_url,
        &credentials.reddit_client,
        &credentials.reddit_secret,
        &user_agent(&config.account),
    )?;
    let short_interest =
        NasdaqDataLinkProvider::new(config.providers.nasdaq_base_url(), &credentials.quandl_key)?;
    let market_data = YahooFinanceProvider::new(config.providers.yahoo_base_url())?;

    Ok(QuerySession::new(
        symbol,
        &config.account,
        Arc::new(short_interest),
        Arc::new(market_data),
        Arc::new(discussion),
    ))
}

/// Loads configuration and credentials, then runs `command`.
pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("wsbtrack starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let credentials = Credentials::from_env()?;
    execute(command, &config, &credentials).await
}

/// Runs `command` against HTTP providers built from `config` and `credentials`.
pub async fn execute(
    command: AppCommand,
    config: &AppConfig,
    credentials: &Credentials,
) -> Result<()> {
    let symbol = command
        .symbol()
        .unwrap_or_else(|| config.default_symbol())
        .to_uppercase();
    let session = connect_session(&symbol, config, credentials)?;
    let today = Utc::now().date_naive();

    match command {
        AppCommand::Prices {
            window,
            interval,
            normalise,
            normalise_column,
            json,
            ..
        } => {
            let (start, end) = window.resolve(today, config.window_days)?;
            let mut request = HistoryRequest::new(start).end(end).interval(interval);
            if let Some(column) = normalise_column {
                request = request.normalise_on(column);
            }
            if !normalise {
                request = request.without_normalisation();
            }
            cli::series::run_prices(&session, &request, json).await
        }
        AppCommand::ShortInterest {
            window,
            normalise_column,
            json,
            ..
        } => {
            let (start, end) = window.resolve(today, config.window_days)?;
            let mut request = SeriesRequest::new(start, end);
            if let Some(column) = normalise_column {
                request = request.normalise(column);
            }
            cli::series::run_short_interest(&session, &request, json).await
        }
        AppCommand::Multi {
            codes,
            window,
            json,
        } => {
            if codes.is_empty() {
                bail!("At least one dataset code is required");
            }
            let (start, end) = window.resolve(today, config.window_days)?;
            cli::series::run_multi(&session, &codes, &SeriesRequest::new(start, end), json).await
        }
        AppCommand::Info { .. } => cli::info::run(&session).await,
        AppCommand::Posts {
            order,
            forum,
            limit,
            html,
        } => {
            let forum = forum.as_deref().unwrap_or(&config.forum);
            let limit = limit.unwrap_or(crate::core::listing::DEFAULT_LIMIT);
            cli::posts::run(&session, order, forum, limit, html).await
        }
        AppCommand::Dashboard { days, .. } => {
            let window_days = days.unwrap_or(config.window_days);
            let (start, end) = DateWindow::default().resolve(today, window_days)?;
            cli::dashboard::run(&session, start, end, &config.forum, config.post_limit).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_window_defaults() {
        let today = date(2021, 2, 1);
        assert_eq!(
            DateWindow::default().resolve(today, 31).unwrap(),
            (date(2021, 1, 1), today)
        );

        let window = DateWindow {
            start: Some(date(2021, 1, 10)),
            end: None,
        };
        assert_eq!(window.resolve(today, 365).unwrap(), (date(2021, 1, 10), today));

        let window = DateWindow {
            start: None,
            end: Some(date(2021, 1, 31)),
        };
        assert_eq!(
            window.resolve(today, 30).unwrap(),
            (date(2021, 1, 1), date(2021, 1, 31))
        );
    }

    #[test]
    fn test_date_window_rejects_inverted_range() {
        let window = DateWindow {
            start: Some(date(2021, 3, 1)),
            end: Some(date(2021, 1, 1)),
        };
        assert!(window.resolve(date(2021, 3, 1), 30).is_err());
    }
}
