// Core structs: ProductPriceRecord, Snapshot, VariationRecord, CategorySummary
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::compact_date;

/// One observed price for one product on one calendar day.
///
/// Field names on disk follow the historical table header
/// (`ean,nombre,categoria,cat_principal,precio,fecha`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPriceRecord {
    #[serde(rename = "ean")]
    pub product_id: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "cat_principal")]
    pub principal_category: String,
    #[serde(rename = "precio")]
    pub price: f64,
    #[serde(rename = "fecha", with = "compact_date")]
    pub date: NaiveDate,
}

/// A row as produced by the scraper, before any cleaning.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    #[serde(rename = "ean", default)]
    pub product_id: String,
    #[serde(rename = "nombre", default)]
    pub name: String,
    #[serde(rename = "categoria", default)]
    pub category: String,
    #[serde(rename = "cat_principal", default)]
    pub principal_category: Option<String>,
    #[serde(rename = "precio", default)]
    pub price: String,
}

/// All records observed on a single date, at most one per product id.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub records: Vec<ProductPriceRecord>,
}

impl Snapshot {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy of this snapshot restricted to one principal category.
    pub fn only_category(&self, category: &str) -> Snapshot {
        Snapshot {
            date: self.date,
            records: self
                .records
                .iter()
                .filter(|r| r.principal_category == category)
                .cloned()
                .collect(),
        }
    }
}

/// Price movement of one product between two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct VariationRecord {
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub principal_category: String,
    pub price_before: f64,
    pub price_after: f64,
    pub abs_diff: f64,
    pub pct_diff: f64,
}

/// Reporting shape of a ranked `VariationRecord`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedProduct {
    #[serde(rename = "ean")]
    pub product_id: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "precio_antes")]
    pub price_before: f64,
    #[serde(rename = "precio_hoy")]
    pub price_after: f64,
    #[serde(rename = "diff_abs")]
    pub abs_diff: f64,
    #[serde(rename = "diff_pct")]
    pub pct_diff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "variacion_pct_promedio")]
    pub average_pct_diff: f64,
    #[serde(rename = "productos_subieron")]
    pub count_up: usize,
    #[serde(rename = "productos_bajaron")]
    pub count_down: usize,
    #[serde(rename = "total_productos")]
    pub count_total: usize,
}

impl CategorySummary {
    /// Matched products whose price did not move.
    pub fn count_unchanged(&self) -> usize {
        self.count_total - self.count_up - self.count_down
    }
}

/// One point of a cumulative percent-change series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    #[serde(rename = "fecha", with = "crate::utils::iso_date")]
    pub date: NaiveDate,
    #[serde(rename = "pct")]
    pub cumulative_pct: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// String-keyed map that serializes its entries in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMap<V>(pub Vec<(String, V)>);

impl<V> Default for LabeledMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

#[cfg(test)]
impl<V> LabeledMap<V> {
    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }
}

impl<V: Serialize> Serialize for LabeledMap<V> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
