//! Abstractions over the external data providers.

use super::error::Result;
use super::listing::{ListingOrder, Post};
use super::table::TimeSeriesTable;
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Bar size accepted by the market-data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interval {
    OneMinute,
    TwoMinutes,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    SixtyMinutes,
    NinetyMinutes,
    OneHour,
    #[default]
    OneDay,
    FiveDays,
    OneWeek,
    OneMonth,
    ThreeMonths,
}

impl Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Interval::OneMinute => "1m",
                Interval::TwoMinutes => "2m",
                Interval::FiveMinutes => "5m",
                Interval::FifteenMinutes => "15m",
                Interval::ThirtyMinutes => "30m",
                Interval::SixtyMinutes => "60m",
                Interval::NinetyMinutes => "90m",
                Interval::OneHour => "1h",
                Interval::OneDay => "1d",
                Interval::FiveDays => "5d",
                Interval::OneWeek => "1wk",
                Interval::OneMonth => "1mo",
                Interval::ThreeMonths => "3mo",
            }
        )
    }
}

impl Interval {
    /// Whether bars are shorter than a trading day.
    pub fn is_intraday(&self) -> bool {
        !matches!(
            self,
            Interval::OneDay
                | Interval::FiveDays
                | Interval::OneWeek
                | Interval::OneMonth
                | Interval::ThreeMonths
        )
    }
}

impl FromStr for Interval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1m" => Ok(Interval::OneMinute),
            "2m" => Ok(Interval::TwoMinutes),
            "5m" => Ok(Interval::FiveMinutes),
            "15m" => Ok(Interval::FifteenMinutes),
            "30m" => Ok(Interval::ThirtyMinutes),
            "60m" => Ok(Interval::SixtyMinutes),
            "90m" => Ok(Interval::NinetyMinutes),
            "1h" => Ok(Interval::OneHour),
            "1d" => Ok(Interval::OneDay),
            "5d" => Ok(Interval::FiveDays),
            "1wk" => Ok(Interval::OneWeek),
            "1mo" => Ok(Interval::OneMonth),
            "3mo" => Ok(Interval::ThreeMonths),
            _ => Err(anyhow!("Invalid interval: {}", s)),
        }
    }
}

/// Short-interest time series keyed by dataset code, e.g. `FINRA/FNYX_GME`.
#[async_trait]
pub trait ShortInterestProvider: Send + Sync {
    async fn dataset(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeriesTable>;
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Descriptive metadata for `symbol`, as reported by the provider.
    async fn info(&self, symbol: &str) -> Result<serde_json::Map<String, serde_json::Value>>;

    /// OHLCV bars for `symbol` over `[start, end]`; an open end means up to now.
    async fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
        interval: Interval,
    ) -> Result<TimeSeriesTable>;
}

#[async_trait]
pub trait DiscussionProvider: Send + Sync {
    async fn posts(&self, forum: &str, order: ListingOrder, limit: usize) -> Result<Vec<Post>>;
}
