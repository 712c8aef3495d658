//! Per-symbol query session over the three data providers.

use super::error::{Error, ProviderKind, Result};
use super::listing::{Listing, ListingOrder};
use super::normalise::apply_normalisation;
use super::provider::{DiscussionProvider, Interval, MarketDataProvider, ShortInterestProvider};
use super::table::{ColumnData, TimeSeriesTable};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, instrument};

pub const DATABASE_CODE: &str = "FINRA";
pub const DATASET_PREFIX: &str = "FNYX_";
pub const TICKER_COLUMN: &str = "ticker";

/// Dataset code of the short-interest series for `symbol`, e.g. `FINRA/FNYX_GME`.
pub fn dataset_code(symbol: &str) -> String {
    format!("{DATABASE_CODE}/{DATASET_PREFIX}{symbol}")
}

/// The part of a dataset code after its first `/`, or the whole code.
pub fn ticker_tag(code: &str) -> &str {
    code.split_once('/').map_or(code, |(_, rest)| rest)
}

/// Parameters of a short-interest query. Normalisation is off unless asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub normalise: bool,
    pub normalise_column: Option<String>,
}

impl SeriesRequest {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        SeriesRequest {
            start,
            end,
            normalise: false,
            normalise_column: None,
        }
    }

    pub fn normalise(mut self, column: impl Into<String>) -> Self {
        self.normalise = true;
        self.normalise_column = Some(column.into());
        self
    }
}

/// Parameters of a price history query. Normalisation is on by default, but
/// has no effect until a column is named.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRequest {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub interval: Interval,
    pub normalise: bool,
    pub normalise_column: Option<String>,
}

impl HistoryRequest {
    pub fn new(start: NaiveDate) -> Self {
        HistoryRequest {
            start,
            end: None,
            interval: Interval::default(),
            normalise: true,
            normalise_column: None,
        }
    }

    pub fn end(mut self, end: NaiveDate) -> Self {
        self.end = Some(end);
        self
    }

    pub fn interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn normalise_on(mut self, column: impl Into<String>) -> Self {
        self.normalise_column = Some(column.into());
        self
    }

    pub fn without_normalisation(mut self) -> Self {
        self.normalise = false;
        self
    }
}

pub struct QuerySession {
    symbol: String,
    account: String,
    short_interest: Arc<dyn ShortInterestProvider>,
    market_data: Arc<dyn MarketDataProvider>,
    discussion: Arc<dyn DiscussionProvider>,
}

impl QuerySession {
    pub fn new(
        symbol: &str,
        account: &str,
        short_interest: Arc<dyn ShortInterestProvider>,
        market_data: Arc<dyn MarketDataProvider>,
        discussion: Arc<dyn DiscussionProvider>,
    ) -> Self {
        QuerySession {
            symbol: symbol.to_string(),
            account: account.to_string(),
            short_interest,
            market_data,
            discussion,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Switches the session to another symbol; later queries use it.
    pub fn set_symbol(&mut self, symbol: &str) {
        debug!(from = %self.symbol, to = %symbol, "Switching symbol");
        self.symbol = symbol.to_string();
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn dataset_code(&self) -> String {
        dataset_code(&self.symbol)
    }

    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn time_series(&self, request: &SeriesRequest) -> Result<TimeSeriesTable> {
        let table = self
            .short_interest
            .dataset(&self.dataset_code(), request.start, request.end)
            .await?;
        Ok(apply_normalisation(
            table,
            request.normalise,
            request.normalise_column.as_deref(),
        ))
    }

    /// Fetches each code in turn and stacks the results, tagging every row
    /// with the code's ticker.
    #[instrument(skip(self, codes))]
    pub async fn multi_time_series<S: AsRef<str>>(
        &self,
        codes: &[S],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeriesTable> {
        let mut tables = Vec::with_capacity(codes.len());
        for code in codes {
            let code = code.as_ref();
            let mut table = self.short_interest.dataset(code, start, end).await?;
            let tag = ticker_tag(code);
            let tags = ColumnData::Text(vec![Some(tag.to_string()); table.len()]);
            table
                .push_column(TICKER_COLUMN, tags)
                .map_err(|e| Error::provider(ProviderKind::ShortInterest, e))?;
            debug!(code, rows = table.len(), "Fetched dataset");
            tables.push(table);
        }
        Ok(TimeSeriesTable::concat(tables))
    }

    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn price_history(&self, request: &HistoryRequest) -> Result<TimeSeriesTable> {
        let table = self
            .market_data
            .history(&self.symbol, request.start, request.end, request.interval)
            .await?;
        Ok(apply_normalisation(
            table,
            request.normalise,
            request.normalise_column.as_deref(),
        ))
    }

    pub async fn info(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        self.market_data.info(&self.symbol).await
    }

    #[instrument(skip(self))]
    pub async fn list_posts(
        &self,
        order: ListingOrder,
        forum: &str,
        limit: usize,
    ) -> Result<Listing> {
        let posts = self.discussion.posts(forum, order, limit).await?;
        debug!(count = posts.len(), "Received posts");
        Ok(Listing::new(forum, order, posts))
    }

    pub async fn hot(&self, forum: &str, limit: usize) -> Result<Listing> {
        self.list_posts(ListingOrder::Hot, forum, limit).await
    }

    pub async fn rising(&self, forum: &str, limit: usize) -> Result<Listing> {
        self.list_posts(ListingOrder::Rising, forum, limit).await
    }

    pub async fn new_posts(&self, forum: &str, limit: usize) -> Result<Listing> {
        self.list_posts(ListingOrder::New, forum, limit).await
    }
}

/// User agent registered with the discussion provider for `account`.
pub fn user_agent(account: &str) -> String {
    format!("my-wsb-tracker by/u/{account}")
}
