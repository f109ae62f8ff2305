use crate::model::{CategorySummary, RankedProduct, Snapshot, VariationRecord};
use crate::utils::{mean, round2};
use std::collections::HashMap;

/// Trait defining the interface for the price variation engine.
pub trait Analyzer {
    /// Joins two snapshots on product id and measures each product's move.
    fn compute_variation(&self, after: &Snapshot, before: &Snapshot) -> Vec<VariationRecord>;
    /// Top `n` movers by percent change; ties keep their input order.
    fn rank(&self, variations: &[VariationRecord], n: usize, ascending: bool) -> Vec<RankedProduct>;
    /// One summary per principal category, in canonical category order.
    fn summarize_by_category(&self, variations: &[VariationRecord]) -> Vec<CategorySummary>;
}

/// Implementation of the variation engine.
pub struct AnalyzerImpl {
    category_order: Vec<String>,
}

impl AnalyzerImpl {
    pub fn new(category_order: Vec<String>) -> Self {
        Self { category_order }
    }

    pub fn category_order(&self) -> &[String] {
        &self.category_order
    }

    fn category_rank(&self, category: &str) -> usize {
        self.category_order
            .iter()
            .position(|c| c == category)
            .unwrap_or(self.category_order.len())
    }
}

impl Analyzer for AnalyzerImpl {
    fn compute_variation(&self, after: &Snapshot, before: &Snapshot) -> Vec<VariationRecord> {
        let before_prices: HashMap<&str, f64> = before
            .records
            .iter()
            .map(|r| (r.product_id.as_str(), r.price))
            .collect();

        after
            .records
            .iter()
            .filter_map(|now| {
                let price_before = *before_prices.get(now.product_id.as_str())?;
                if !price_before.is_finite() || !now.price.is_finite() || price_before <= 0.0 {
                    return None;
                }
                let abs_diff = round2(now.price - price_before);
                Some(VariationRecord {
                    product_id: now.product_id.clone(),
                    name: now.name.clone(),
                    category: now.category.clone(),
                    principal_category: now.principal_category.clone(),
                    price_before,
                    price_after: now.price,
                    abs_diff,
                    pct_diff: round2(abs_diff / price_before * 100.0),
                })
            })
            .collect()
    }

    fn rank(&self, variations: &[VariationRecord], n: usize, ascending: bool) -> Vec<RankedProduct> {
        let mut sorted: Vec<&VariationRecord> = variations.iter().collect();
        // sort_by is stable, so equal percentages stay in join order
        sorted.sort_by(|a, b| {
            let ord = a.pct_diff.total_cmp(&b.pct_diff);
            if ascending { ord } else { ord.reverse() }
        });

        sorted
            .into_iter()
            .take(n)
            .map(|v| RankedProduct {
                product_id: v.product_id.clone(),
                name: v.name.clone(),
                category: v.category.clone(),
                price_before: v.price_before,
                price_after: v.price_after,
                abs_diff: v.abs_diff,
                pct_diff: v.pct_diff,
            })
            .collect()
    }

    fn summarize_by_category(&self, variations: &[VariationRecord]) -> Vec<CategorySummary> {
        let mut groups: HashMap<&str, Vec<f64>> = HashMap::new();
        for v in variations {
            groups
                .entry(v.principal_category.as_str())
                .or_default()
                .push(v.pct_diff);
        }

        let mut summaries: Vec<CategorySummary> = groups
            .into_iter()
            .map(|(category, pcts)| CategorySummary {
                category: category.to_string(),
                average_pct_diff: mean(pcts.iter().copied()).map(round2).unwrap_or(0.0),
                count_up: pcts.iter().filter(|&&p| p > 0.0).count(),
                count_down: pcts.iter().filter(|&&p| p < 0.0).count(),
                count_total: pcts.len(),
            })
            .collect();

        // unknown categories go last, alphabetically among themselves
        summaries.sort_by(|a, b| {
            self.category_rank(&a.category)
                .cmp(&self.category_rank(&b.category))
                .then_with(|| a.category.cmp(&b.category))
        });
        summaries
    }
}

/// Mean percent change across all variations, unrounded. `None` when nothing matched.
pub fn mean_pct_diff(variations: &[VariationRecord]) -> Option<f64> {
    mean(variations.iter().map(|v| v.pct_diff))
}
