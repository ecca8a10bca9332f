// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Outbound delivery records written by `postfix/smtp`.
//!
//! ```text
//! 3F2A1C0042: to=<bob@example.com>, relay=mx.example.com[192.0.2.7]:25, delay=1.2,
//!     delays=0.1/0/0.5/0.6, dsn=2.0.0, status=sent (250 2.0.0 Ok: queued as 99A1)
//! ```
//!
//! `orig_to`, `conn_use`, `delays` and `dsn` are optional; anything after the status
//! word is ignored.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::parsers::{MailEvent, ParserOptions};
use crate::record::Record;

#[allow(clippy::expect_used)]
static DELIVERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^[[:word:]]+: to=<([^>]*)>, ",
        r"(?:orig_to=<[^>]*>, )?",
        r"relay=([^,]+), ",
        r"(?:conn_use=[^,]+, )?",
        r"delay=([^,]+), ",
        r"(?:delays=[^,]+, )?",
        r"(?:dsn=[^,]+, )?",
        r"status=(\S+).*$",
    ))
    .expect("invalid smtp delivery regex")
});

/// Fields of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery<'a> {
    pub recipient: &'a str,
    pub relay: &'a str,
    pub delay: &'a str,
    pub status: &'a str,
}

impl<'a> Delivery<'a> {
    #[must_use]
    pub fn parse(msg: &'a str) -> Option<Self> {
        let caps = DELIVERY.captures(msg)?;
        let field = |index| caps.get(index).map_or("", |m| m.as_str());
        Some(Delivery {
            recipient: field(1),
            relay: field(2),
            delay: field(3),
            status: field(4),
        })
    }

    /// Everything after the first `@`, or the whole recipient if it has none.
    #[must_use]
    pub fn recipient_domain(&self) -> &'a str {
        self.recipient
            .split_once('@')
            .map_or(self.recipient, |(_, domain)| domain)
    }
}

/// Maps a delivery status to an event. Lines that are not delivery records yield `None`.
#[must_use]
pub fn event(msg: &str, options: &ParserOptions) -> Option<MailEvent> {
    let delivery = Delivery::parse(msg)?;
    match delivery.status {
        "sent" => Some(MailEvent::Delivered {
            recipient: delivery.recipient.to_string(),
            domain: delivery.recipient_domain().to_string(),
        }),
        "deferred" if options.track_delivery_failures => Some(MailEvent::Deferred),
        "bounced" if options.track_delivery_failures => Some(MailEvent::Bounced),
        status => {
            trace!(status, recipient = delivery.recipient, "ignoring delivery status");
            None
        }
    }
}

pub fn parse(msg: &str, record: &mut Record, options: &ParserOptions) {
    if let Some(event) = event(msg, options) {
        event.apply(record);
    }
}
