// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Splits a raw log line and dispatches its message to a subsystem parser.
//!
//! Expected shape:
//!
//! ```text
//! 2024-01-01T00:00:00+00:00 host postfix/smtpd[123]: 3F2A1C0042: client=...
//! ^timestamp                ^host ^process tag       ^message
//! ```

use derive_more::Display;

use crate::constants::PROCESS_PREFIX;
use crate::errors::ParseError;
use crate::parsers::{self, ParserOptions};
use crate::record::Record;

/// Postfix component that produced a line, as named in its process tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Subsystem {
    #[display("smtpd")]
    Smtpd,
    #[display("smtp")]
    Smtp,
    #[display("other")]
    Other,
}

impl Subsystem {
    #[must_use]
    pub fn from_process(process: &str) -> Self {
        match process {
            "smtpd" => Subsystem::Smtpd,
            "smtp" => Subsystem::Smtp,
            _ => Subsystem::Other,
        }
    }
}

/// One log line split into its parts. Borrows from the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedMessage<'a> {
    pub timestamp: &'a str,
    pub hostname: &'a str,
    /// Process name between `postfix/` and `[`, e.g. `smtpd` or `qmgr`.
    pub process: &'a str,
    pub subsystem: Subsystem,
    pub body: &'a str,
}

/// Splits `line` into timestamp, host, process tag and message.
///
/// The first three whitespace-delimited tokens are the timestamp, host and process
/// tag; the remainder, minus at most one leading space, is the message.
pub fn classify(line: &str) -> Result<ParsedMessage<'_>, ParseError> {
    let (timestamp, rest) = next_token(line);
    let (hostname, rest) = next_token(rest);
    let (tag, rest) = next_token(rest);
    let body = rest.strip_prefix(' ').unwrap_or(rest);

    let process = process_name(tag).ok_or_else(|| ParseError::MissingProcessTag {
        tag: tag.to_string(),
    })?;

    Ok(ParsedMessage {
        timestamp,
        hostname,
        process,
        subsystem: Subsystem::from_process(process),
        body,
    })
}

/// Classifies `line` and applies whatever event its message carries to `record`.
pub fn process_line(
    line: &str,
    record: &mut Record,
    options: &ParserOptions,
) -> Result<(), ParseError> {
    let message = classify(line)?;
    match message.subsystem {
        Subsystem::Smtpd => parsers::smtpd::parse(message.body, record),
        Subsystem::Smtp => parsers::smtp::parse(message.body, record, options),
        Subsystem::Other => parsers::generic::parse(message.process, message.body, record)?,
    }
    Ok(())
}

fn next_token(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(end) => input.split_at(end),
        None => (input, ""),
    }
}

fn process_name(tag: &str) -> Option<&str> {
    let start = tag.find(PROCESS_PREFIX)? + PROCESS_PREFIX.len();
    let len = tag[start..].find('[')?;
    Some(&tag[start..start + len])
}
