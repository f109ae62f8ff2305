// Raw scraper CSV input

pub mod csv_parser;

pub use csv_parser::{find_input_files, CsvRowParser, Parser};
