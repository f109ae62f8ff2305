// Scraper CSV parsing
use crate::model::{ParserError, RawRow};
use crate::utils::format_compact_date;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Rows decoded from one input, plus how many records could not be decoded.
#[derive(Debug, Default)]
pub struct ParsedRows {
    pub rows: Vec<RawRow>,
    pub malformed: usize,
}

pub trait Parser {
    fn parse(&self, data: &[u8]) -> Result<ParsedRows, ParserError>;

    fn parse_file(&self, path: &Path) -> Result<ParsedRows, ParserError> {
        let data = fs::read(path).map_err(|source| ParserError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.parse(&data)
    }
}

pub struct CsvRowParser;

impl CsvRowParser {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for CsvRowParser {
    fn parse(&self, data: &[u8]) -> Result<ParsedRows, ParserError> {
        let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(data);

        // fail early on a file without a usable header row
        reader.headers()?;

        let mut parsed = ParsedRows::default();
        for (idx, result) in reader.deserialize::<RawRow>().enumerate() {
            match result {
                Ok(row) => parsed.rows.push(row),
                Err(e) => {
                    debug!("Skipping malformed record {}: {}", idx + 2, e);
                    parsed.malformed += 1;
                }
            }
        }
        Ok(parsed)
    }
}

/// Lists the raw files produced for `date`, sorted by name.
///
/// A missing directory simply yields no files.
pub fn find_input_files(dir: &Path, prefix: &str, date: NaiveDate) -> Result<Vec<PathBuf>, ParserError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let stem = format!("{}{}", prefix, format_compact_date(date));
    let io_err = |source| ParserError::Io {
        path: dir.display().to_string(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if path.is_file() && name.starts_with(&stem) && name.ends_with(".csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
