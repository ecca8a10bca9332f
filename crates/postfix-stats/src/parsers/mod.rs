// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Subsystem parsers: turn a message body into a [`MailEvent`] and apply it to a [`Record`].
//!
//! Each Postfix subsystem has its own grammar:
//! - [`smtp`]: outbound delivery attempts (`to=<..>, relay=.., status=..`)
//! - [`smtpd`]: inbound connections, policy exceptions and warnings
//! - [`generic`]: everything else, where only `warning:` lines are tracked

pub mod generic;
pub mod smtp;
pub mod smtpd;

use crate::record::Record;

/// Knobs that change how delivery statuses are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserOptions {
    /// Count smtp `status=deferred` and `status=bounced` in the global totals.
    /// Off by default: only `status=sent` is attributed.
    pub track_delivery_failures: bool,
}

/// A semantic event recognized in a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailEvent {
    /// A message handed off to the next hop for `recipient`.
    Delivered { recipient: String, domain: String },
    /// A message accepted from an authenticated client.
    Received { user: String, domain: String },
    Rejected,
    Held,
    Discarded,
    /// A delivery attempt that will be retried later.
    Deferred,
    Bounced,
    /// Trimmed warning text.
    Warning(String),
}

impl MailEvent {
    pub fn apply(self, record: &mut Record) {
        match self {
            MailEvent::Delivered { recipient, domain } => {
                record.increment_deliver(&recipient, &domain);
            }
            MailEvent::Received { user, domain } => record.increment_receive(&user, &domain),
            MailEvent::Rejected => record.increment_reject(),
            MailEvent::Held | MailEvent::Deferred => record.increment_deferred(),
            MailEvent::Discarded => record.increment_discard(),
            MailEvent::Bounced => record.increment_bounce(),
            MailEvent::Warning(text) => record.increment_warning(&text),
        }
    }
}
