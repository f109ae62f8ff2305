//! Cumulative percent-change series over the price history.
//!
//! Each step adds the mean day-over-day change to a running total that is
//! rounded to cents every time, so published values compound their rounding
//! exactly the way earlier charts did.

use crate::analyzer::price_analysis::{mean_pct_diff, Analyzer, AnalyzerImpl};
use crate::config::WindowConfig;
use crate::model::{LabeledMap, SeriesPoint, Snapshot};
use crate::storage::HistoricalStore;
use crate::utils::round2;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WindowSeries {
    pub total: Vec<SeriesPoint>,
    #[serde(rename = "categorias")]
    pub categories: LabeledMap<Vec<SeriesPoint>>,
}

/// Builds the overall and per-category series for every configured window,
/// each counted back from `today`.
pub fn build_window_series(
    store: &HistoricalStore,
    analyzer: &AnalyzerImpl,
    windows: &[WindowConfig],
    today: NaiveDate,
) -> LabeledMap<WindowSeries> {
    let mut out = LabeledMap::default();
    for window in windows {
        let start = today - Duration::days(window.days);
        let snapshots: Vec<&Snapshot> = store.snapshots_in(start..=today).collect();
        let series = window_series(analyzer, &snapshots);
        debug!(
            "Window {}: {} dates, {} categories",
            window.label,
            series.total.len(),
            series.categories.0.len()
        );
        out.0.push((window.label.clone(), series));
    }
    out
}

/// Series for one window. `snapshots` must be sorted by date.
pub fn window_series(analyzer: &AnalyzerImpl, snapshots: &[&Snapshot]) -> WindowSeries {
    if snapshots.is_empty() {
        return WindowSeries::default();
    }

    let total = cumulative_series(analyzer, snapshots);

    let mut categories = LabeledMap::default();
    for category in analyzer.category_order() {
        let present = snapshots
            .iter()
            .any(|s| s.records.iter().any(|r| &r.principal_category == category));
        if !present {
            continue;
        }
        let restricted: Vec<Snapshot> = snapshots.iter().map(|s| s.only_category(category)).collect();
        let refs: Vec<&Snapshot> = restricted.iter().collect();
        categories.0.push((category.clone(), cumulative_series(analyzer, &refs)));
    }

    WindowSeries { total, categories }
}

/// Running total of the mean percent change between consecutive snapshots,
/// starting at 0.0 on the first one. A step with no matched products adds 0.
pub fn cumulative_series(analyzer: &AnalyzerImpl, snapshots: &[&Snapshot]) -> Vec<SeriesPoint> {
    let Some(first) = snapshots.first() else {
        return Vec::new();
    };

    let mut series = vec![SeriesPoint {
        date: first.date,
        cumulative_pct: 0.0,
    }];
    let mut acc = 0.0;
    for pair in snapshots.windows(2) {
        let variations = analyzer.compute_variation(pair[1], pair[0]);
        let step = mean_pct_diff(&variations).unwrap_or(0.0);
        acc = round2(acc + step);
        series.push(SeriesPoint {
            date: pair[1].date,
            cumulative_pct: acc,
        });
    }
    series
}
