// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, process::ExitCode};

use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use postfix_stats::{
    config::{Config, OutputFormat},
    coordinator::Coordinator,
    report::Report,
    util::decode_lines,
};

#[tokio::main]
pub async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
        return ExitCode::FAILURE;
    }

    debug!("Logging subsystem enabled");

    let program = env::args().next().unwrap_or_else(|| "postfix-stats".to_string());
    let Some(filename) = env::args().nth(1) else {
        eprintln!("Usage: {program} <filename>");
        return ExitCode::FAILURE;
    };

    let contents = match tokio::fs::read(&filename).await {
        Ok(contents) => contents,
        Err(e) => {
            error!("Failed to read file {filename}: {e}");
            return ExitCode::FAILURE;
        }
    };
    let lines = decode_lines(&contents);
    info!("Read {} lines from {}", lines.len(), filename);

    let coordinator = match Coordinator::new(config.workers, config.parser_options()) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let record = match coordinator.run(lines).await {
        Ok(record) => record,
        Err(e) => {
            error!("Aborting, no report produced: {e}");
            return ExitCode::FAILURE;
        }
    };

    let report = Report::from_record(&record);
    match config.output {
        OutputFormat::Text => print!("{report}"),
        OutputFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!("Failed to encode report: {e}");
                return ExitCode::FAILURE;
            }
        },
    }

    ExitCode::SUCCESS
}
