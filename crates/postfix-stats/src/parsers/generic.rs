// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::ParseError;
use crate::parsers::MailEvent;
use crate::record::Record;
use crate::util::trim_warning;

#[allow(clippy::expect_used)]
static LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([[:word:]]+):\s+(.*)$").expect("invalid labelled message regex")
});

/// Recognizes a message from a subsystem without a dedicated parser.
///
/// Only `warning: <detail>` produces an event. Other labels and unlabelled text are
/// accepted and dropped. An empty body is a structural failure.
pub fn event(process: &str, msg: &str) -> Result<Option<MailEvent>, ParseError> {
    if let Some(caps) = LABELLED.captures(msg) {
        if &caps[1] == "warning" {
            return Ok(Some(MailEvent::Warning(trim_warning(&caps[2]))));
        }
        return Ok(None);
    }
    if msg.is_empty() {
        return Err(ParseError::UnmatchedMessage {
            process: process.to_string(),
        });
    }
    Ok(None)
}

pub fn parse(process: &str, msg: &str, record: &mut Record) -> Result<(), ParseError> {
    if let Some(event) = event(process, msg)? {
        event.apply(record);
    }
    Ok(())
}
