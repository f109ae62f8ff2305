use crate::model::ReportError;
use crate::report::summary::Report;
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const SUMMARY_FILE: &str = "resumen.json";
pub const CHARTS_FILE: &str = "graficos.json";

/// Which artifacts made it to disk.
#[derive(Debug, Default)]
pub struct WriteOutcome {
    pub written: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

impl WriteOutcome {
    fn record(&mut self, path: PathBuf, result: Result<(), ReportError>) {
        match result {
            Ok(()) => {
                info!("Wrote {}", path.display());
                self.written.push(path);
            }
            Err(e) => {
                warn!("Failed to write {}: {}", path.display(), e);
                self.failed.push(path);
            }
        }
    }
}

/// Writes every artifact of `report` into `dir`. A failed artifact is logged
/// and the remaining ones are still attempted.
pub fn write_report(report: &Report, dir: &Path) -> WriteOutcome {
    if let Err(e) = fs::create_dir_all(dir) {
        warn!("Failed to create output folder {}: {}", dir.display(), e);
    }

    let mut outcome = WriteOutcome::default();
    for (file, ranking) in &report.rankings {
        let path = dir.join(file);
        let result = write_json(&path, ranking);
        outcome.record(path, result);
    }

    let path = dir.join(SUMMARY_FILE);
    let result = write_json(&path, &report.summary);
    outcome.record(path, result);

    let path = dir.join(CHARTS_FILE);
    let result = write_json(&path, &report.charts);
    outcome.record(path, result);

    outcome
}

/// Pretty-printed UTF-8 JSON; accented text is written as-is.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ReportError> {
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
