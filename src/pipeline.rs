// One batch run: ingest today's files, update the history, publish the reports.
use crate::analyzer::AnalyzerImpl;
use crate::config::AppConfig;
use crate::model::{PipelineError, RawRow, Snapshot};
use crate::normalizer::{normalize_all, LoadReport};
use crate::parser::{find_input_files, CsvRowParser, Parser};
use crate::report::{build_report, write_report, Comparison, Report, WriteOutcome};
use crate::storage::HistoricalStore;
use chrono::NaiveDate;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Load today's raw files, merge them into the history, then report.
    Ingest,
    /// Recompute every report from the stored history alone, taking its
    /// latest date as today.
    ChartsOnly,
}

#[derive(Debug)]
pub struct RunSummary {
    pub today: NaiveDate,
    pub report: Report,
    pub outcome: WriteOutcome,
}

pub fn run(config: &AppConfig, mode: RunMode, today: NaiveDate) -> Result<RunSummary, PipelineError> {
    let (store, today_snapshot) = match mode {
        RunMode::Ingest => ingest(config, today)?,
        RunMode::ChartsOnly => from_history(config)?,
    };
    let today = today_snapshot.date;

    info!("[3/4] Computing variations...");
    let analyzer = AnalyzerImpl::new(config.category_order.clone());
    let report = build_report(&store, &today_snapshot, &analyzer, config, today);

    info!("[4/4] Writing summary, rankings and chart series...");
    let outcome = write_report(&report, &config.output_dir());

    Ok(RunSummary {
        today,
        report,
        outcome,
    })
}

impl RunSummary {
    /// Logs the headline figures of the run.
    pub fn log(&self) {
        info!("Done: {} products on {}", self.report.summary.total_products, self.today);
        for comparison in [Comparison::Day, Comparison::Month, Comparison::Year] {
            if let Some(v) = self.report.summary.variation(comparison) {
                let marker = if v > 0.0 { "📈" } else { "📉" };
                info!("  {}: {} {}%", comparison.label(), marker, v);
            }
        }
        info!("  {} artifact(s) written", self.outcome.written.len());
        if !self.outcome.failed.is_empty() {
            warn!("{} artifact(s) could not be written", self.outcome.failed.len());
        }
    }
}

fn ingest(config: &AppConfig, today: NaiveDate) -> Result<(HistoricalStore, Snapshot), PipelineError> {
    info!("[1/4] Loading today's files...");
    let load = load_today(config, today)?;
    info!(
        "Snapshot for {}: {} products, {} rows dropped ({} invalid prices, {} duplicates, {} malformed)",
        today,
        load.snapshot.len(),
        load.dropped(),
        load.dropped_invalid_price,
        load.dropped_duplicates,
        load.dropped_malformed
    );
    if load.snapshot.is_empty() {
        return Err(PipelineError::MissingInput(format!(
            "no valid rows in today's files for {}",
            today
        )));
    }

    info!("[2/4] Saving history...");
    let mut store = HistoricalStore::load(config.store_path())?;
    store.merge(load.snapshot.clone(), today)?;
    Ok((store, load.snapshot))
}

/// Reads and cleans every raw file produced for `today`.
pub fn load_today(config: &AppConfig, today: NaiveDate) -> Result<LoadReport, PipelineError> {
    let files = find_input_files(&config.input_dir, &config.input_prefix, today)?;
    let parser = CsvRowParser::new();

    let mut rows: Vec<RawRow> = Vec::new();
    let mut malformed = 0;
    let mut loaded = 0;
    for file in &files {
        match parser.parse_file(file) {
            Ok(parsed) => {
                info!("  Loaded: {} ({} rows)", file.display(), parsed.rows.len());
                rows.extend(parsed.rows);
                malformed += parsed.malformed;
                loaded += 1;
            }
            Err(e) => error!("  Failed to read {}: {}", file.display(), e),
        }
    }
    if loaded == 0 {
        return Err(PipelineError::MissingInput(format!(
            "no readable files matching {}{} in {}",
            config.input_prefix,
            crate::utils::format_compact_date(today),
            config.input_dir.display()
        )));
    }

    let mut report = normalize_all(&rows, today);
    report.dropped_malformed = malformed;
    Ok(report)
}

fn from_history(config: &AppConfig) -> Result<(HistoricalStore, Snapshot), PipelineError> {
    let path = config.store_path();
    if !path.exists() {
        return Err(PipelineError::MissingInput(format!("{} does not exist", path.display())));
    }
    let store = HistoricalStore::load(&path)?;
    let Some(latest) = store.latest_date() else {
        return Err(PipelineError::MissingInput(format!("{} has no rows", path.display())));
    };
    let snapshot = store
        .snapshot_at(latest)
        .cloned()
        .unwrap_or_else(|| Snapshot::new(latest));
    info!("Using most recent date: {} ({} products)", latest, snapshot.len());
    Ok((store, snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    const HEADER: &str = "categoria,cat_principal,nombre,ean,precio,precio_texto,fecha";

    fn config(root: &Path) -> AppConfig {
        AppConfig {
            data_dir: root.join("data"),
            input_dir: root.join("data").join("output"),
            ..AppConfig::default()
        }
    }

    fn write_raw(cfg: &AppConfig, name: &str, rows: &[&str]) {
        fs::create_dir_all(&cfg.input_dir).unwrap();
        let mut text = format!("\u{feff}{}\n", HEADER);
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        fs::write(cfg.input_dir.join(name), text).unwrap();
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn two_days_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        write_raw(&cfg, "gallega_20250601_0800.csv", &[
            "Aceites,Almacén,Aceite,A,100,$ 100,",
            "Aceites,Almacén,Aceite malo,B,abc,,",
        ]);
        write_raw(&cfg, "gallega_20250602_0800.csv", &["Aceites,Almacén,Aceite,A,110,$ 110,"]);

        run(&cfg, RunMode::Ingest, date(1)).unwrap();
        let summary = run(&cfg, RunMode::Ingest, date(2)).unwrap();

        assert_eq!(summary.report.summary.variation_day, Some(10.0));
        assert_eq!(summary.report.summary.rose_day, 1);

        let out = cfg.output_dir();
        let resumen: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("resumen.json")).unwrap()).unwrap();
        assert_eq!(resumen["variacion_dia"], 10.0);
        assert_eq!(resumen["productos_subieron_dia"], 1);
        assert!(out.join("ranking_dia.json").is_file());
        assert!(!out.join("ranking_anio.json").exists());

        let graficos: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("graficos.json")).unwrap()).unwrap();
        assert_eq!(graficos["7d"]["total"][0]["pct"], 0.0);
        assert_eq!(graficos["7d"]["total"][1]["pct"], 10.0);
        assert_eq!(graficos["7d"]["categorias"]["Almacén"][1]["fecha"], "2025-06-02");
    }

    #[test]
    fn re_ingesting_a_date_overwrites_it() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        write_raw(&cfg, "gallega_20250601_0800.csv", &["Bebidas,Bebidas,Agua,A,10,,", "Bebidas,Bebidas,Soda,B,20,,"]);
        run(&cfg, RunMode::Ingest, date(1)).unwrap();

        write_raw(&cfg, "gallega_20250601_0800.csv", &["Bebidas,Bebidas,Agua,A,12,,"]);
        run(&cfg, RunMode::Ingest, date(1)).unwrap();

        let store = HistoricalStore::load(cfg.store_path()).unwrap();
        assert_eq!(store.row_count(), 1);
        assert_eq!(store.snapshot_at(date(1)).unwrap().records[0].price, 12.0);
    }

    #[test]
    fn no_files_for_today_is_missing_input() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        write_raw(&cfg, "gallega_20250531_0800.csv", &["Bebidas,Bebidas,Agua,A,10,,"]);

        let err = run(&cfg, RunMode::Ingest, date(1)).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(_)));
        assert!(!cfg.store_path().exists());
    }

    #[test]
    fn all_invalid_prices_keep_the_history_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        write_raw(&cfg, "gallega_20250601_0800.csv", &["Bebidas,Bebidas,Agua,A,10,,"]);
        run(&cfg, RunMode::Ingest, date(1)).unwrap();
        let before = fs::read_to_string(cfg.store_path()).unwrap();

        write_raw(&cfg, "gallega_20250602_0800.csv", &[
            "Bebidas,Bebidas,Agua,A,abc,,",
            "Bebidas,Bebidas,Soda,B,0,,",
            "Bebidas,Bebidas,Jugo,C,-5,,",
        ]);
        let err = run(&cfg, RunMode::Ingest, date(2)).unwrap_err();

        assert!(matches!(err, PipelineError::MissingInput(_)));
        assert_eq!(fs::read_to_string(cfg.store_path()).unwrap(), before);
    }

    #[test]
    fn charts_only_with_empty_history_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        fs::create_dir_all(&cfg.data_dir).unwrap();
        fs::write(cfg.store_path(), "ean,nombre,categoria,cat_principal,precio,fecha\n").unwrap();

        let err = run(&cfg, RunMode::ChartsOnly, date(1)).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(_)));
        assert!(!cfg.output_dir().join("resumen.json").exists());
        assert!(!cfg.output_dir().join("graficos.json").exists());

        fs::remove_file(cfg.store_path()).unwrap();
        let err = run(&cfg, RunMode::ChartsOnly, date(1)).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(_)));
    }

    #[test]
    fn charts_only_uses_latest_stored_date() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        fs::create_dir_all(&cfg.data_dir).unwrap();
        fs::write(
            cfg.store_path(),
            "ean,nombre,categoria,cat_principal,precio,fecha\n\
             A,Yerba,Infusiones,Almacén,100.0,20250601\n\
             A,Yerba,Infusiones,Almacén,90.0,20250602\n",
        )
        .unwrap();

        // the wall-clock date passed in is ignored in this mode
        let summary = run(&cfg, RunMode::ChartsOnly, date(30)).unwrap();
        assert_eq!(summary.today, date(2));
        assert_eq!(summary.report.summary.variation_day, Some(-10.0));
        assert_eq!(summary.report.summary.fell_day, 1);
        assert!(cfg.output_dir().join("graficos.json").is_file());
    }
}
