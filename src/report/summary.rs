use crate::analyzer::{build_window_series, mean_pct_diff, Analyzer, AnalyzerImpl, WindowSeries};
use crate::config::AppConfig;
use crate::model::{CategorySummary, LabeledMap, RankedProduct, Snapshot};
use crate::storage::HistoricalStore;
use crate::utils::{compact_date, round2};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::info;

/// A reference point today's prices are compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// The previous stored date, however far back it is.
    Day,
    Week,
    Month,
    Year,
}

impl Comparison {
    pub const ALL: [Comparison; 4] = [Self::Day, Self::Week, Self::Month, Self::Year];

    pub fn label(self) -> &'static str {
        match self {
            Self::Day => "día",
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Year => "1y",
        }
    }

    pub fn ranking_file(self) -> &'static str {
        match self {
            Self::Day => "ranking_dia.json",
            Self::Week => "ranking_7d.json",
            Self::Month => "ranking_mes.json",
            Self::Year => "ranking_anio.json",
        }
    }

    fn lookback_days(self) -> Option<i64> {
        match self {
            Self::Day => None,
            Self::Week => Some(7),
            Self::Month => Some(30),
            Self::Year => Some(365),
        }
    }

    /// Picks the stored snapshot this comparison measures against.
    pub fn reference<'a>(self, store: &'a HistoricalStore, today: NaiveDate) -> Option<&'a Snapshot> {
        match self.lookback_days() {
            None => store.snapshot_before(today),
            Some(days) => store.snapshot_at_or_before(today - Duration::days(days)),
        }
    }
}

/// The `resumen.json` document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    #[serde(rename = "fecha", with = "compact_date")]
    pub date: NaiveDate,
    #[serde(rename = "total_productos")]
    pub total_products: usize,
    #[serde(rename = "variacion_dia")]
    pub variation_day: Option<f64>,
    #[serde(rename = "variacion_7d")]
    pub variation_week: Option<f64>,
    #[serde(rename = "variacion_mes")]
    pub variation_month: Option<f64>,
    #[serde(rename = "variacion_anio")]
    pub variation_year: Option<f64>,
    #[serde(rename = "categorias_dia")]
    pub categories_day: Vec<CategorySummary>,
    #[serde(rename = "ranking_baja_dia")]
    pub fallers_day: Vec<RankedProduct>,
    #[serde(rename = "productos_subieron_dia")]
    pub rose_day: usize,
    #[serde(rename = "productos_bajaron_dia")]
    pub fell_day: usize,
    #[serde(rename = "productos_sin_cambio_dia")]
    pub unchanged_day: usize,
}

impl DailySummary {
    fn empty(date: NaiveDate, total_products: usize) -> Self {
        Self {
            date,
            total_products,
            variation_day: None,
            variation_week: None,
            variation_month: None,
            variation_year: None,
            categories_day: Vec::new(),
            fallers_day: Vec::new(),
            rose_day: 0,
            fell_day: 0,
            unchanged_day: 0,
        }
    }

    pub fn variation(&self, comparison: Comparison) -> Option<f64> {
        match comparison {
            Comparison::Day => self.variation_day,
            Comparison::Week => self.variation_week,
            Comparison::Month => self.variation_month,
            Comparison::Year => self.variation_year,
        }
    }

    fn set_variation(&mut self, comparison: Comparison, value: f64) {
        let slot = match comparison {
            Comparison::Day => &mut self.variation_day,
            Comparison::Week => &mut self.variation_week,
            Comparison::Month => &mut self.variation_month,
            Comparison::Year => &mut self.variation_year,
        };
        *slot = Some(value);
    }
}

/// Everything one run publishes.
#[derive(Debug, Clone)]
pub struct Report {
    pub summary: DailySummary,
    /// Top risers per comparison, keyed by output file name. Comparisons
    /// without a reference snapshot or without matched products are absent.
    pub rankings: Vec<(&'static str, Vec<RankedProduct>)>,
    pub charts: LabeledMap<WindowSeries>,
}

/// Compares `today_snapshot` against each reference in the store and builds
/// the chart series for every configured window.
pub fn build_report(
    store: &HistoricalStore,
    today_snapshot: &Snapshot,
    analyzer: &AnalyzerImpl,
    config: &AppConfig,
    today: NaiveDate,
) -> Report {
    let mut summary = DailySummary::empty(today, today_snapshot.len());
    let mut rankings = Vec::new();

    for comparison in Comparison::ALL {
        let Some(reference) = comparison.reference(store, today) else {
            info!("No reference snapshot for {} comparison", comparison.label());
            continue;
        };
        let variations = analyzer.compute_variation(today_snapshot, reference);
        let Some(avg) = mean_pct_diff(&variations) else {
            info!(
                "No products in common with {} for {} comparison",
                reference.date,
                comparison.label()
            );
            continue;
        };

        let avg = round2(avg);
        summary.set_variation(comparison, avg);
        info!("Variación {}: {}% (vs {})", comparison.label(), avg, reference.date);

        if comparison == Comparison::Day {
            let categories = analyzer.summarize_by_category(&variations);
            summary.rose_day = categories.iter().map(|c| c.count_up).sum();
            summary.fell_day = categories.iter().map(|c| c.count_down).sum();
            summary.unchanged_day = categories.iter().map(CategorySummary::count_unchanged).sum();
            summary.fallers_day = analyzer.rank(&variations, config.summary_ranking_size, true);
            summary.categories_day = categories;
        }
        rankings.push((
            comparison.ranking_file(),
            analyzer.rank(&variations, config.ranking_size, false),
        ));
    }

    let charts = build_window_series(store, analyzer, &config.windows, today);

    Report {
        summary,
        rankings,
        charts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProductPriceRecord;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshot(on: NaiveDate, rows: &[(&str, &str, f64)]) -> Snapshot {
        Snapshot {
            date: on,
            records: rows
                .iter()
                .map(|(id, cat, price)| ProductPriceRecord {
                    product_id: id.to_string(),
                    name: format!("Producto {}", id),
                    category: cat.to_string(),
                    principal_category: cat.to_string(),
                    price: *price,
                    date: on,
                })
                .collect(),
        }
    }

    fn setup(days: Vec<Snapshot>) -> (HistoricalStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = HistoricalStore::load(dir.path().join("precios.csv")).unwrap();
        for day in days {
            let on = day.date;
            store.merge(day, on).unwrap();
        }
        (store, dir)
    }

    fn run(store: &HistoricalStore, today: NaiveDate) -> Report {
        let config = AppConfig::default();
        let analyzer = AnalyzerImpl::new(config.category_order.clone());
        let today_snapshot = store.snapshot_at(today).unwrap().clone();
        build_report(store, &today_snapshot, &analyzer, &config, today)
    }

    #[test]
    fn day_over_day_variation() {
        let today = date(2025, 6, 2);
        let (store, _tmp) = setup(vec![
            snapshot(date(2025, 6, 1), &[("A", "Almacén", 100.0)]),
            snapshot(today, &[("A", "Almacén", 110.0)]),
        ]);
        let report = run(&store, today);

        assert_eq!(report.summary.variation_day, Some(10.0));
        assert_eq!(report.summary.rose_day, 1);
        assert_eq!(report.summary.fell_day, 0);
        assert_eq!(report.summary.total_products, 1);
        assert_eq!(report.summary.variation_week, None);
        assert_eq!(report.summary.variation_year, None);
        assert_eq!(report.rankings.len(), 1);
        assert_eq!(report.rankings[0].0, "ranking_dia.json");
        assert_eq!(report.summary.categories_day[0].category, "Almacén");
    }

    #[test]
    fn lookbacks_use_latest_date_at_or_before_target() {
        let today = date(2025, 6, 30);
        let (store, _tmp) = setup(vec![
            snapshot(date(2025, 5, 20), &[("A", "Bebidas", 50.0), ("B", "Bebidas", 10.0)]),
            snapshot(date(2025, 6, 22), &[("A", "Bebidas", 75.0), ("B", "Bebidas", 10.0)]),
            snapshot(date(2025, 6, 29), &[("A", "Bebidas", 90.0), ("B", "Bebidas", 10.0)]),
            snapshot(today, &[("A", "Bebidas", 99.0), ("B", "Bebidas", 9.8)]),
        ]);
        let report = run(&store, today);

        // day: vs 06-29 -> mean(10, -2)
        assert_eq!(report.summary.variation_day, Some(4.0));
        // 7d: target 06-23 -> 06-22 -> mean(32, -2)
        assert_eq!(report.summary.variation_week, Some(15.0));
        // 30d: target 05-31 -> 05-20 -> mean(98, -2)
        assert_eq!(report.summary.variation_month, Some(48.0));
        assert_eq!(report.summary.variation_year, None);
        assert_eq!(report.summary.rose_day, 1);
        assert_eq!(report.summary.fell_day, 1);
        assert_eq!(report.summary.fallers_day[0].product_id, "B");

        let files: Vec<_> = report.rankings.iter().map(|(f, _)| *f).collect();
        assert_eq!(files, vec!["ranking_dia.json", "ranking_7d.json", "ranking_mes.json"]);
        assert_eq!(report.rankings[0].1[0].product_id, "A");
    }

    #[test]
    fn counts_add_up_to_matched_products() {
        let today = date(2025, 6, 2);
        let (store, _tmp) = setup(vec![
            snapshot(date(2025, 6, 1), &[("A", "Frescos", 1.0), ("B", "Frescos", 2.0), ("C", "Limpieza", 3.0), ("D", "Limpieza", 4.0)]),
            snapshot(today, &[("A", "Frescos", 1.5), ("B", "Frescos", 2.0), ("C", "Limpieza", 2.0), ("E", "Limpieza", 4.0)]),
        ]);
        let report = run(&store, today);
        let s = &report.summary;

        assert_eq!(s.rose_day + s.fell_day + s.unchanged_day, 3);
        assert_eq!(s.unchanged_day, 1);
        let matched: usize = s.categories_day.iter().map(|c| c.count_total).sum();
        assert_eq!(matched, 3);
        assert_eq!(s.total_products, 4);
    }

    #[test]
    fn no_common_products_leaves_nulls() {
        let today = date(2025, 6, 2);
        let (store, _tmp) = setup(vec![
            snapshot(date(2025, 6, 1), &[("A", "Frescos", 1.0)]),
            snapshot(today, &[("B", "Frescos", 1.0)]),
        ]);
        let report = run(&store, today);

        assert_eq!(report.summary.variation_day, None);
        assert!(report.rankings.is_empty());

        let json = serde_json::to_value(&report.summary).unwrap();
        assert!(json["variacion_dia"].is_null());
        assert_eq!(json["fecha"], "20250602");
        assert_eq!(json["productos_subieron_dia"], 0);
    }
}
