mod analyzer;
mod config;
mod model;
mod normalizer;
mod parser;
mod pipeline;
mod report;
mod storage;
mod utils;

use chrono::Local;
use config::load_config;
use model::PipelineError;
use pipeline::{run, RunMode};
use std::process::ExitCode;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let config = match load_config("config.json") {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mode = parse_mode(std::env::args().skip(1));
    info!(
        "🛒 Price analysis — {}{}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        if mode == RunMode::ChartsOnly { " (charts only)" } else { "" }
    );

    match run(&config, mode, Local::now().date_naive()) {
        Ok(summary) => {
            summary.log();
            ExitCode::SUCCESS
        }
        Err(PipelineError::MissingInput(what)) => {
            // nothing to publish today; not a crash
            error!("Missing input: {}", what);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Single optional flag: recompute reports from the stored history only.
fn parse_mode(args: impl Iterator<Item = String>) -> RunMode {
    let mut mode = RunMode::Ingest;
    for arg in args {
        match arg.as_str() {
            "--charts-only" | "--solo-graficos" => mode = RunMode::ChartsOnly,
            other => warn!("Ignoring unknown argument: {}", other),
        }
    }
    mode
}
