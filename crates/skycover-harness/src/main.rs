#![forbid(unsafe_code)]

//! Replay a recorded visit and print the report as JSONL.
//!
//! # Running
//!
//! ```sh
//! cargo run -p skycover-harness -- visit.jsonl [config.json]
//! ```
//!
//! Logs go to stderr and honor `RUST_LOG`; the report goes to stdout.

use std::error::Error;
use std::io::{self, Write};
use std::process::ExitCode;

use skycover_core::DisguiseConfig;
use skycover_harness::{parse_trace, replay, seed_from_env};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(trace_path) = args.next() else {
        eprintln!("usage: skycover-harness <trace.jsonl> [config.json]");
        return ExitCode::from(2);
    };
    match run(&trace_path, args.next().as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "replay failed");
            ExitCode::FAILURE
        }
    }
}

fn run(trace_path: &str, config_path: Option<&str>) -> Result<(), Box<dyn Error>> {
    let config = match config_path {
        Some(path) => DisguiseConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => DisguiseConfig::default(),
    };
    let steps = parse_trace(&std::fs::read_to_string(trace_path)?)?;
    let report = replay(config, seed_from_env(), &steps)?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(report.to_jsonl().as_bytes())?;
    stdout.flush()?;
    Ok(())
}
