use crate::model::{ProductPriceRecord, RawRow, Snapshot};
use chrono::NaiveDate;
use std::collections::HashSet;

/// Outcome of cleaning one run's raw rows.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub snapshot: Snapshot,
    pub dropped_invalid_price: usize,
    pub dropped_duplicates: usize,
    /// Records the CSV reader could not decode at all.
    pub dropped_malformed: usize,
}

impl LoadReport {
    pub fn dropped(&self) -> usize {
        self.dropped_invalid_price + self.dropped_duplicates + self.dropped_malformed
    }
}

/// Turns raw scraper rows into the canonical snapshot for `date`.
///
/// Rows whose price is not a positive number are dropped, and only the first
/// row seen for each product id is kept.
pub fn normalize_all(rows: &[RawRow], date: NaiveDate) -> LoadReport {
    let mut snapshot = Snapshot::new(date);
    let mut seen: HashSet<String> = HashSet::new();
    let mut dropped_invalid_price = 0;
    let mut dropped_duplicates = 0;

    for row in rows {
        let Some(record) = normalize_row(row, date) else {
            dropped_invalid_price += 1;
            continue;
        };
        if !seen.insert(record.product_id.clone()) {
            dropped_duplicates += 1;
            continue;
        }
        snapshot.records.push(record);
    }

    LoadReport {
        snapshot,
        dropped_invalid_price,
        dropped_duplicates,
        dropped_malformed: 0,
    }
}

fn normalize_row(row: &RawRow, date: NaiveDate) -> Option<ProductPriceRecord> {
    let price = parse_price(&row.price)?;
    let category = row.category.trim().to_string();
    let principal_category = match row.principal_category.as_deref().map(str::trim) {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => category.clone(),
    };

    Some(ProductPriceRecord {
        // kept as text: EANs may carry leading zeros
        product_id: row.product_id.trim().to_string(),
        name: row.name.trim().to_string(),
        category,
        principal_category,
        price,
        date,
    })
}

/// Plain decimal prices only; anything non-finite or not above zero is rejected.
pub fn parse_price(text: &str) -> Option<f64> {
    let price: f64 = text.trim().parse().ok()?;
    (price.is_finite() && price > 0.0).then_some(price)
}
