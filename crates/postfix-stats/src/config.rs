// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::str::FromStr;

use derive_more::Display;

use crate::errors::ConfigError;
use crate::parsers::ParserOptions;

pub const WORKERS_ENV: &str = "POSTFIX_STATS_WORKERS";
pub const LOG_LEVEL_ENV: &str = "POSTFIX_STATS_LOG_LEVEL";
pub const OUTPUT_ENV: &str = "POSTFIX_STATS_OUTPUT";
pub const TRACK_DELIVERY_FAILURES_ENV: &str = "POSTFIX_STATS_TRACK_DELIVERY_FAILURES";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// How the final report is written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum OutputFormat {
    #[default]
    #[display("text")]
    Text,
    #[display("json")]
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(ConfigError::Invalid(format!(
                "Invalid output format '{other}'. Must be one of: text, json"
            ))),
        }
    }
}

/// Runtime configuration for a report run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of parallel parse workers
    pub workers: usize,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
    pub output: OutputFormat,
    /// Count smtp deferred/bounced statuses in the totals
    pub track_delivery_failures: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            log_level: "info".to_string(),
            output: OutputFormat::Text,
            track_delivery_failures: false,
        }
    }
}

impl Config {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let workers = match lookup(WORKERS_ENV) {
            Some(value) => value.trim().parse::<usize>().map_err(|_| {
                ConfigError::Invalid(format!("{WORKERS_ENV} must be a number, got '{value}'"))
            })?,
            None => defaults.workers,
        };
        let log_level = lookup(LOG_LEVEL_ENV)
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level);
        let output = match lookup(OUTPUT_ENV) {
            Some(value) => value.parse()?,
            None => defaults.output,
        };
        let track_delivery_failures = lookup(TRACK_DELIVERY_FAILURES_ENV)
            .map(|val| matches!(val.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(defaults.track_delivery_failures);

        let config = Self {
            workers,
            log_level,
            output,
            track_delivery_failures,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid(
                "worker count must be at least 1".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    #[must_use]
    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            track_delivery_failures: self.track_delivery_failures,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, usize::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.workers >= 1);
        assert_eq!(config.output, OutputFormat::Text);
        assert!(!config.track_delivery_failures);
    }

    #[test]
    fn test_from_lookup_reads_every_key() {
        let config = Config::from_lookup(lookup(&[
            (WORKERS_ENV, "6"),
            (LOG_LEVEL_ENV, "DEBUG"),
            (OUTPUT_ENV, "json"),
            (TRACK_DELIVERY_FAILURES_ENV, "true"),
        ]))
        .unwrap();
        assert_eq!(config.workers, 6);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.output, OutputFormat::Json);
        assert!(config.parser_options().track_delivery_failures);
    }

    #[test]
    fn test_empty_lookup_uses_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_workers() {
        assert!(Config::from_lookup(lookup(&[(WORKERS_ENV, "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[(WORKERS_ENV, "many")])).is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let config = Config {
            log_level: "verbose".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!(" json ".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}
