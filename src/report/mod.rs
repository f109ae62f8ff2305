// Report module: assembles and writes the JSON artifacts consumed by the website.

pub mod summary;
pub mod writer;

pub use summary::{build_report, Comparison, Report};
pub use writer::{write_report, WriteOutcome};
