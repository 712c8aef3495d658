use crate::core::error::{Error, ProviderKind, Result};
use crate::core::provider::{Interval, MarketDataProvider};
use crate::core::table::{ColumnData, TimeSeriesTable};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

fn provider_error(e: impl Into<anyhow::Error>) -> Error {
    Error::provider(ProviderKind::MarketData, e)
}

fn day_start(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

// YahooFinanceProvider implementation for MarketDataProvider
pub struct YahooFinanceProvider {
    base_url: String,
    client: reqwest::Client,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("wsbtrack/0.1")
            .build()
            .map_err(provider_error)?;
        Ok(YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn fetch_chart(&self, symbol: &str, params: &[(&str, String)]) -> Result<ChartItem> {
        let endpoint = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let url = reqwest::Url::parse_with_params(&endpoint, params).map_err(provider_error)?;
        debug!("Requesting chart data from {}", url);

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            provider_error(anyhow!(
                "Request error: {} for symbol: {} URL: {}",
                e,
                symbol,
                url
            ))
        })?;

        debug!(response = ?response, "Received Yahoo response");

        let status = response.status();
        let text = response.text().await.map_err(provider_error)?;

        let data: YahooChartResponse = match serde_json::from_str(&text) {
            Ok(data) => data,
            Err(_) if !status.is_success() => {
                return Err(provider_error(anyhow!(
                    "HTTP error: {} for symbol: {}",
                    status,
                    symbol
                )));
            }
            Err(e) => {
                return Err(provider_error(anyhow!(
                    "Failed to parse JSON response for {}: {}",
                    symbol,
                    e
                )));
            }
        };

        if let Some(error) = data.chart.error {
            return Err(provider_error(anyhow!(
                "{} for symbol: {}",
                error.description,
                symbol
            )));
        }

        data.chart
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| provider_error(anyhow!("No price data found for symbol: {}", symbol)))
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    description: String,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: Map<String, Value>,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug, Default)]
struct Quote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

/// Bar timestamps shifted into exchange time. Daily and longer bars are keyed
/// by their trading date.
fn bar_index(
    timestamps: &[i64],
    gmt_offset: i64,
    interval: Interval,
) -> Result<Vec<NaiveDateTime>> {
    timestamps
        .iter()
        .map(|ts| {
            let local = DateTime::<Utc>::from_timestamp(ts + gmt_offset, 0)
                .ok_or_else(|| provider_error(anyhow!("Invalid bar timestamp: {}", ts)))?
                .naive_utc();
            Ok(if interval.is_intraday() {
                local
            } else {
                local.date().and_time(NaiveTime::MIN)
            })
        })
        .collect()
}

fn into_table(item: ChartItem, interval: Interval) -> Result<TimeSeriesTable> {
    let timestamps = item.timestamp.unwrap_or_default();
    let gmt_offset = item
        .meta
        .get("gmtoffset")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let rows = timestamps.len();

    let quote = item
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .unwrap_or_default();

    let mut table = TimeSeriesTable::new(bar_index(&timestamps, gmt_offset, interval)?);
    for (name, values) in [
        ("Open", quote.open),
        ("High", quote.high),
        ("Low", quote.low),
        ("Close", quote.close),
        ("Volume", quote.volume),
    ] {
        let mut values = values.unwrap_or_default();
        values.resize(rows, None);
        table
            .push_column(name, ColumnData::Numeric(values))
            .map_err(provider_error)?;
    }
    Ok(table)
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    #[instrument(name = "YahooInfoFetch", skip(self), fields(symbol = %symbol))]
    async fn info(&self, symbol: &str) -> Result<Map<String, Value>> {
        let item = self
            .fetch_chart(
                symbol,
                &[("range", "1d".to_string()), ("interval", "1d".to_string())],
            )
            .await?;
        Ok(item.meta)
    }

    #[instrument(
        name = "YahooHistoryFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
        interval: Interval,
    ) -> Result<TimeSeriesTable> {
        let period1 = day_start(start);
        // The end date is inclusive, so ask for bars before the following midnight.
        let period2 = match end.and_then(|e| e.checked_add_days(Days::new(1))) {
            Some(next) => day_start(next),
            None => Utc::now().timestamp(),
        };

        let item = self
            .fetch_chart(
                symbol,
                &[
                    ("period1", period1.to_string()),
                    ("period2", period2.to_string()),
                    ("interval", interval.to_string()),
                    ("events", "div,splits".to_string()),
                ],
            )
            .await?;

        let table = into_table(item, interval)?;
        debug!(rows = table.len(), "Received price history");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_mock_server(symbol: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/v8/finance/chart/{symbol}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_successful_history_fetch() {
        // 2021-01-04 and 2021-01-05 at 14:30 UTC, market open in New York.
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": {
                        "symbol": "GME",
                        "currency": "USD",
                        "gmtoffset": -18000
                    },
                    "timestamp": [1609770600, 1609857000],
                    "indicators": {
                        "quote": [{
                            "open": [19.0, 17.35],
                            "high": [19.1, 18.08],
                            "low": [17.15, 17.23],
                            "close": [17.25, 17.37],
                            "volume": [10022500, 4961500]
                        }]
                    }
                }],
                "error": null
            }
        }"#;

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/GME"))
            .and(query_param("period1", "1609459200"))
            .and(query_param("period2", "1609891200"))
            .and(query_param("interval", "1d"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let table = provider
            .history(
                "GME",
                date(2021, 1, 1),
                Some(date(2021, 1, 5)),
                Interval::OneDay,
            )
            .await
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.column_names(),
            vec!["Open", "High", "Low", "Close", "Volume"]
        );
        assert_eq!(
            table.index(),
            &[
                date(2021, 1, 4).and_time(NaiveTime::MIN),
                date(2021, 1, 5).and_time(NaiveTime::MIN)
            ]
        );
        assert_eq!(table.numeric("Close").unwrap(), &[Some(17.25), Some(17.37)]);
        assert_eq!(
            table.numeric("Volume").unwrap(),
            &[Some(10022500.0), Some(4961500.0)]
        );
    }

    #[tokio::test]
    async fn test_intraday_history_keeps_time() {
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": {"gmtoffset": -18000},
                    "timestamp": [1609770600],
                    "indicators": {"quote": [{"close": [17.5, 99.0]}]}
                }]
            }
        }"#;
        let mock_server = create_mock_server("GME", mock_response).await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let table = provider
            .history("GME", date(2021, 1, 4), None, Interval::FiveMinutes)
            .await
            .unwrap();

        assert_eq!(
            table.index()[0],
            date(2021, 1, 4).and_hms_opt(9, 30, 0).unwrap()
        );
        // Extra values are dropped, missing columns filled.
        assert_eq!(table.numeric("Close").unwrap(), &[Some(17.5)]);
        assert_eq!(table.numeric("Open").unwrap(), &[None]);
    }

    #[tokio::test]
    async fn test_history_without_bars_is_empty() {
        let mock_response = r#"{"chart": {"result": [{"meta": {"symbol": "GME"}}]}}"#;
        let mock_server = create_mock_server("GME", mock_response).await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let table = provider
            .history("GME", date(2021, 1, 4), None, Interval::OneDay)
            .await
            .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 5);
    }

    #[tokio::test]
    async fn test_no_price_result_data() {
        let mock_response = r#"{"chart": {"result": []}}"#;
        let mock_server = create_mock_server("INVALID", mock_response).await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let result = provider
            .history("INVALID", date(2021, 1, 4), None, Interval::OneDay)
            .await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Yahoo Finance request failed: No price data found for symbol: INVALID"
        );
    }

    #[tokio::test]
    async fn test_chart_error_for_unknown_symbol() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{
            "chart": {
                "result": null,
                "error": {
                    "code": "Not Found",
                    "description": "No data found, symbol may be delisted"
                }
            }
        }"#;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/NOPE"))
            .respond_with(ResponseTemplate::new(404).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let err = provider.info("NOPE").await.unwrap_err();
        assert_eq!(err.provider_kind(), Some(ProviderKind::MarketData));
        assert_eq!(
            err.to_string(),
            "Yahoo Finance request failed: No data found, symbol may be delisted for symbol: NOPE"
        );
    }

    #[tokio::test]
    async fn test_server_error_without_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/GME"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let err = provider.info("GME").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Yahoo Finance request failed: HTTP error: 500 Internal Server Error for symbol: GME"
        );
    }

    #[tokio::test]
    async fn test_info_returns_meta_unmodified() {
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": {
                        "symbol": "GME",
                        "currency": "USD",
                        "exchangeName": "NYQ",
                        "regularMarketPrice": 150.65,
                        "longName": "GameStop Corp."
                    }
                }]
            }
        }"#;

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/GME"))
            .and(query_param("range", "1d"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let info = provider.info("GME").await.unwrap();
        assert_eq!(info.len(), 5);
        assert_eq!(info["longName"], "GameStop Corp.");
        assert_eq!(info["regularMarketPrice"], 150.65);
    }

    #[test]
    fn test_day_start() {
        assert_eq!(day_start(date(2021, 1, 1)), 1609459200);
    }
}
