use crate::core::error::{Error, ProviderKind, Result};
use crate::core::provider::ShortInterestProvider;
use crate::core::table::{ColumnData, TimeSeriesTable};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

static NULL: Value = Value::Null;

fn provider_error(e: impl Into<anyhow::Error>) -> Error {
    Error::provider(ProviderKind::ShortInterest, e)
}

/// Short-interest datasets served by Nasdaq Data Link (formerly Quandl).
pub struct NasdaqDataLinkProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl NasdaqDataLinkProvider {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("wsbtrack/0.1")
            .build()
            .map_err(provider_error)?;
        Ok(NasdaqDataLinkProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }
}

#[derive(Deserialize, Debug)]
struct DatasetResponse {
    dataset_data: DatasetData,
}

#[derive(Deserialize, Debug)]
struct DatasetData {
    column_names: Vec<String>,
    data: Vec<Vec<Value>>,
}

#[derive(Deserialize, Debug)]
struct ErrorResponse {
    quandl_error: ErrorDetail,
}

#[derive(Deserialize, Debug)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Turns the row-major payload into a table indexed by its first (date) column.
/// A column holding only numbers and nulls is numeric, anything else is text.
fn into_table(data: DatasetData, code: &str) -> anyhow::Result<TimeSeriesTable> {
    if data.column_names.is_empty() {
        return Err(anyhow!("Dataset {} has no columns", code));
    }

    let mut index = Vec::with_capacity(data.data.len());
    for row in &data.data {
        let date = row
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Row without date in dataset {}", code))?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{date}' in dataset {code}"))?;
        index.push(date.and_time(chrono::NaiveTime::MIN));
    }

    let mut table = TimeSeriesTable::new(index);
    for (j, name) in data.column_names.iter().enumerate().skip(1) {
        let cells: Vec<&Value> = data
            .data
            .iter()
            .map(|row| row.get(j).unwrap_or(&NULL))
            .collect();

        let numeric = cells.iter().all(|v| v.is_number() || v.is_null());
        let column = if numeric {
            ColumnData::Numeric(cells.iter().map(|v| v.as_f64()).collect())
        } else {
            ColumnData::Text(
                cells
                    .iter()
                    .map(|v| match v {
                        Value::Null => None,
                        Value::String(s) => Some(s.clone()),
                        other => Some(other.to_string()),
                    })
                    .collect(),
            )
        };
        table.push_column(name.as_str(), column)?;
    }
    Ok(table)
}

#[async_trait]
impl ShortInterestProvider for NasdaqDataLinkProvider {
    #[instrument(
        name = "NasdaqDatasetFetch",
        skip(self),
        fields(code = %code)
    )]
    async fn dataset(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeriesTable> {
        let endpoint = format!("{}/api/v3/datasets/{}/data.json", self.base_url, code);
        debug!("Requesting dataset from {} ({} to {})", endpoint, start, end);

        let url = reqwest::Url::parse_with_params(
            &endpoint,
            &[
                ("start_date", start.format("%Y-%m-%d").to_string()),
                ("end_date", end.format("%Y-%m-%d").to_string()),
                ("order", "asc".to_string()),
                ("api_key", self.api_key.clone()),
            ],
        )
        .map_err(provider_error)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| {
                provider_error(anyhow!(
                    "Request error: {} for dataset: {}",
                    e.without_url(),
                    code
                ))
            })?;

        // The request url carries the api key, keep it out of errors.
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| provider_error(e.without_url()))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| format!("{} ({})", e.quandl_error.message, e.quandl_error.code))
                .unwrap_or(text);
            return Err(provider_error(anyhow!(
                "HTTP error: {} for dataset: {}: {}",
                status,
                code,
                detail
            )));
        }

        let data: DatasetResponse = serde_json::from_str(&text).map_err(|e| {
            provider_error(anyhow!("Failed to parse JSON response for {}: {}", code, e))
        })?;

        let table = into_table(data.dataset_data, code).map_err(provider_error)?;
        debug!(rows = table.len(), "Received dataset");
        Ok(table)
    }
}
