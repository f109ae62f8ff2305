use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::ConfigError;

/// A named lookback window for the cumulative chart series.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WindowConfig {
    pub label: String,
    pub days: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    /// Where the scraper drops its daily CSV files.
    pub input_dir: PathBuf,
    /// Raw files are named `{input_prefix}{YYYYMMDD}...csv`.
    pub input_prefix: String,
    /// Historical table, relative to `data_dir`.
    pub store_file: String,
    /// Defaults to `data_dir` when unset.
    pub output_dir: Option<PathBuf>,
    pub category_order: Vec<String>,
    pub windows: Vec<WindowConfig>,
    pub ranking_size: usize,
    pub summary_ranking_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            input_dir: PathBuf::from("data/output"),
            input_prefix: "gallega_".into(),
            store_file: "precios_compacto.csv".into(),
            output_dir: None,
            category_order: [
                "Almacén",
                "Bebidas",
                "Frescos",
                "Congelados",
                "Limpieza",
                "Cuidado Personal",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            windows: [("7d", 7), ("30d", 30), ("6m", 180), ("1y", 365)]
                .into_iter()
                .map(|(label, days)| WindowConfig {
                    label: label.into(),
                    days,
                })
                .collect(),
            ranking_size: 20,
            summary_ranking_size: 10,
        }
    }
}

impl AppConfig {
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.clone())
    }
}

/// Loads the configuration file, falling back to defaults when it does not exist.
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let content = fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    Ok(config)
}
