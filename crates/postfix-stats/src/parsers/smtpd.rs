// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Inbound connection records written by `postfix/smtpd`.
//!
//! Three shapes are recognized, tried in order:
//! 1. authenticated submissions: `ID: client=host[addr], ..., sasl_username=name`
//! 2. policy exceptions: `ID: reject: ...`, `reject_warning`, `hold`, `discard`
//! 3. warnings: `warning: <detail>`
//!
//! Anything else (connects, disconnects, lost connections, TLS chatter) is ignored.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::constants::UNKNOWN_DOMAIN;
use crate::domain;
use crate::parsers::MailEvent;
use crate::record::Record;
use crate::util::trim_warning;

#[allow(clippy::expect_used)]
static CLIENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[[:word:]]+: client=(.+?)(,|$).+sasl_username=([[:word:]]+)$")
        .expect("invalid smtpd client regex")
});

#[allow(clippy::expect_used)]
static EXCEPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[[:word:]]+: (reject(?:_warning)?|hold|discard):.*$")
        .expect("invalid smtpd exception regex")
});

#[allow(clippy::expect_used)]
static WARNING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^warning: (.+)$").expect("invalid smtpd warning regex"));

#[must_use]
pub fn event(msg: &str) -> Option<MailEvent> {
    if let Some(caps) = CLIENT.captures(msg) {
        let client = domain::extract(&caps[1]);
        let domain = if client.is_unknown() {
            UNKNOWN_DOMAIN.to_string()
        } else {
            client.domain
        };
        return Some(MailEvent::Received {
            user: format!("{}@{}", &caps[3], domain),
            domain,
        });
    }

    if let Some(caps) = EXCEPTION.captures(msg) {
        return match &caps[1] {
            "reject" => Some(MailEvent::Rejected),
            "hold" => Some(MailEvent::Held),
            "discard" => Some(MailEvent::Discarded),
            // reject_warning only logs what would have been rejected
            _ => None,
        };
    }

    if let Some(caps) = WARNING.captures(msg) {
        return Some(MailEvent::Warning(trim_warning(&caps[1])));
    }

    trace!(msg, "ignoring smtpd message");
    None
}

pub fn parse(msg: &str, record: &mut Record) {
    if let Some(event) = event(msg) {
        event.apply(record);
    }
}
