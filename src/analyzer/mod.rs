// Analyzer module: aggregates submodules for different aspects of analysis.

pub mod price_analysis;
pub mod time_series;

// Re-export the main Analyzer implementation for ease of use.
pub use price_analysis::{mean_pct_diff, Analyzer, AnalyzerImpl};
pub use time_series::{build_window_series, WindowSeries};
