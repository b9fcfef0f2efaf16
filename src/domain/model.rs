use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

/// One entity as scraped from the document. The market cap is kept as the raw
/// text token until the transform stage coerces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub market_cap_usd: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub currency: String,
    pub value: f64,
}

/// A record with its converted market caps. Built only by the transformer, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    name: String,
    market_cap_usd: f64,
    conversions: Vec<Conversion>,
}

impl EnrichedRecord {
    pub(crate) fn new(name: String, market_cap_usd: f64, conversions: Vec<Conversion>) -> Self {
        Self {
            name,
            market_cap_usd,
            conversions,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn market_cap_usd(&self) -> f64 {
        self.market_cap_usd
    }

    pub fn conversions(&self) -> &[Conversion] {
        &self.conversions
    }

    pub fn converted(&self, currency: &str) -> Option<f64> {
        self.conversions
            .iter()
            .find(|c| c.currency == currency)
            .map(|c| c.value)
    }
}

/// Ordered rows with a column set fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<R> {
    columns: Vec<String>,
    rows: Vec<R>,
}

impl<R> Table<R> {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: R) {
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }
}

impl<'a, R> IntoIterator for &'a Table<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[derive(Debug, Deserialize)]
struct RateRow {
    #[serde(rename = "Currency")]
    currency: String,
    #[serde(rename = "Rate")]
    rate: f64,
}

/// USD to target-currency multipliers, loaded once per run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeRateTable {
    rates: HashMap<String, f64>,
}

impl ExchangeRateTable {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            tracing::error!("Cannot open exchange rate file {}: {}", path.display(), e);
            EtlError::IoError(e)
        })?;
        Self::from_reader(file)
    }

    /// Reads a `Currency,Rate` CSV. Duplicate codes and non-positive rates are rejected.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut rates = HashMap::new();

        for (index, row) in csv_reader.deserialize::<RateRow>().enumerate() {
            let row = row.map_err(|e| {
                EtlError::parse(format!("Invalid exchange rate row {}: {}", index + 1, e))
            })?;

            if !(row.rate.is_finite() && row.rate > 0.0) {
                return Err(EtlError::parse(format!(
                    "Exchange rate for {} must be positive, got {}",
                    row.currency, row.rate
                )));
            }
            if rates.insert(row.currency.clone(), row.rate).is_some() {
                return Err(EtlError::parse(format!(
                    "Duplicate exchange rate for {}",
                    row.currency
                )));
            }
        }

        tracing::debug!("Loaded {} exchange rates", rates.len());
        Ok(Self { rates })
    }

    pub fn rate(&self, currency: &str) -> Option<f64> {
        self.rates.get(currency).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl FromIterator<(String, f64)> for ExchangeRateTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            rates: iter.into_iter().collect(),
        }
    }
}

/// Result set of one SQL statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub statement: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryResult {
    pub fn column(&self, name: &str) -> Option<Vec<&serde_json::Value>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }
}

fn render_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(render_cell).collect())
            .collect();

        let index_width = self.rows.len().saturating_sub(1).to_string().len();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:width$}", "", width = index_width)?;
        for (name, width) in self.columns.iter().zip(&widths) {
            write!(f, "  {:>width$}", name, width = *width)?;
        }
        for (index, row) in cells.iter().enumerate() {
            writeln!(f)?;
            write!(f, "{:<width$}", index, width = index_width)?;
            for (cell, width) in row.iter().zip(&widths) {
                write!(f, "  {:>width$}", cell, width = *width)?;
            }
        }
        Ok(())
    }
}
