//! Date-indexed tabular results returned by the time-series providers.

use anyhow::{Result, bail};
use chrono::NaiveDateTime;
use serde::Serialize;

/// Values held by a single column. `None` marks a missing observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn missing(&self, len: usize) -> ColumnData {
        match self {
            ColumnData::Numeric(_) => ColumnData::Numeric(vec![None; len]),
            ColumnData::Text(_) => ColumnData::Text(vec![None; len]),
        }
    }

    fn extend_from(&mut self, other: &ColumnData) {
        // Mixed kinds degrade to text, as a dataframe falls back to object dtype.
        let as_text = match (&*self, other) {
            (ColumnData::Numeric(a), ColumnData::Text(_)) => Some(ColumnData::Text(
                a.iter().map(|v| v.map(|n| n.to_string())).collect(),
            )),
            _ => None,
        };
        if let Some(text) = as_text {
            *self = text;
        }

        match (self, other) {
            (ColumnData::Numeric(a), ColumnData::Numeric(b)) => a.extend_from_slice(b),
            (ColumnData::Text(a), ColumnData::Text(b)) => a.extend_from_slice(b),
            (ColumnData::Text(a), ColumnData::Numeric(b)) => {
                a.extend(b.iter().map(|v| v.map(|n| n.to_string())))
            }
            (ColumnData::Numeric(_), ColumnData::Text(_)) => unreachable!(),
        }
    }

    fn take(&self, order: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(order.iter().map(|&i| v[i]).collect()),
            ColumnData::Text(v) => {
                ColumnData::Text(order.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }

    /// Renders the value at `row` for display, empty when missing.
    pub fn display_at(&self, row: usize) -> String {
        match self {
            ColumnData::Numeric(v) => v
                .get(row)
                .copied()
                .flatten()
                .map(format_number)
                .unwrap_or_default(),
            ColumnData::Text(v) => v.get(row).cloned().flatten().unwrap_or_default(),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// An ordered sequence of rows keyed by timestamp with named columns.
///
/// Every column always has exactly one value per index entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TimeSeriesTable {
    index: Vec<NaiveDateTime>,
    columns: Vec<Column>,
}

impl TimeSeriesTable {
    pub fn new(index: Vec<NaiveDateTime>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.data)
    }

    /// Returns the values of a numeric column, `None` if absent or textual.
    pub fn numeric(&self, name: &str) -> Option<&[Option<f64>]> {
        match self.column(name)? {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }

    /// Adds a column, replacing an existing one of the same name in place.
    pub fn push_column(&mut self, name: impl Into<String>, data: ColumnData) -> Result<()> {
        let name = name.into();
        if data.len() != self.index.len() {
            bail!(
                "Column '{}' has {} values but the table has {} rows",
                name,
                data.len(),
                self.index.len()
            );
        }
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.data = data,
            None => self.columns.push(Column { name, data }),
        }
        Ok(())
    }

    /// Keeps only the named columns, in the order given. Unknown names are an error.
    pub fn select(&self, names: &[&str]) -> Result<TimeSeriesTable> {
        let mut selected = TimeSeriesTable::new(self.index.clone());
        for name in names {
            match self.column(name) {
                Some(data) => selected.push_column(*name, data.clone())?,
                None => bail!("Column '{}' not found", name),
            }
        }
        Ok(selected)
    }

    /// Returns a copy with rows ordered by index. The sort is stable.
    pub fn sorted_by_index(&self, descending: bool) -> TimeSeriesTable {
        let mut order: Vec<usize> = (0..self.index.len()).collect();
        order.sort_by(|&a, &b| {
            let ord = self.index[a].cmp(&self.index[b]);
            if descending { ord.reverse() } else { ord }
        });
        TimeSeriesTable {
            index: order.iter().map(|&i| self.index[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.take(&order),
                })
                .collect(),
        }
    }

    /// Appends the rows of every table in order.
    ///
    /// The result has the union of all columns in first-seen order; rows coming
    /// from a table without a given column hold missing values there.
    pub fn concat(tables: impl IntoIterator<Item = TimeSeriesTable>) -> TimeSeriesTable {
        let mut result = TimeSeriesTable::default();
        for table in tables {
            let offset = result.len();
            let added = table.len();

            for column in &table.columns {
                if result.column(&column.name).is_none() {
                    result.columns.push(Column {
                        name: column.name.clone(),
                        data: column.data.missing(offset),
                    });
                }
            }

            for existing in result.columns.iter_mut() {
                match table.column(&existing.name) {
                    Some(data) => existing.data.extend_from(data),
                    None => {
                        let filler = existing.data.missing(added);
                        existing.data.extend_from(&filler);
                    }
                }
            }

            result.index.extend(table.index);
        }
        result
    }
}
