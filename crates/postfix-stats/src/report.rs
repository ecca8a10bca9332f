// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ranked, render-ready view of a [`Record`].
//!
//! Every list is sorted by count, highest first, with ties broken by identifier so
//! identical records always render identically. User lists leave out users with a
//! zero count for that direction; domain and warning lists keep every entry.

use std::cmp::Reverse;
use std::fmt;

use serde::Serialize;

use crate::record::{Record, Totals, TrafficEntry};

const RULE: &str = "------------";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub identifier: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub totals: Totals,
    pub send_users: Vec<RankedEntry>,
    pub send_domains: Vec<RankedEntry>,
    pub receive_users: Vec<RankedEntry>,
    pub receive_domains: Vec<RankedEntry>,
    pub warnings: Vec<RankedEntry>,
}

impl Report {
    #[must_use]
    pub fn from_record(record: &Record) -> Self {
        let deliver = |entry: &TrafficEntry| entry.deliver_count;
        let receive = |entry: &TrafficEntry| entry.receive_count;

        Report {
            totals: record.totals(),
            send_users: rank_traffic(record.users(), deliver, true),
            send_domains: rank_traffic(record.domains(), deliver, false),
            receive_users: rank_traffic(record.users(), receive, true),
            receive_domains: rank_traffic(record.domains(), receive, false),
            warnings: rank(
                record
                    .warnings()
                    .map(|(text, count)| RankedEntry {
                        identifier: text.to_string(),
                        count,
                    })
                    .collect(),
            ),
        }
    }
}

fn rank_traffic<'a>(
    entries: impl Iterator<Item = &'a TrafficEntry>,
    count: impl Fn(&TrafficEntry) -> u64,
    skip_zero: bool,
) -> Vec<RankedEntry> {
    rank(
        entries
            .map(|entry| RankedEntry {
                identifier: entry.identifier.clone(),
                count: count(entry),
            })
            .filter(|entry| !skip_zero || entry.count != 0)
            .collect(),
    )
}

fn rank(mut entries: Vec<RankedEntry>) -> Vec<RankedEntry> {
    entries.sort_unstable_by(|a, b| {
        (Reverse(a.count), &a.identifier).cmp(&(Reverse(b.count), &b.identifier))
    });
    entries
}

fn write_section(f: &mut fmt::Formatter<'_>, title: &str, entries: &[RankedEntry]) -> fmt::Result {
    writeln!(f, "{title}")?;
    writeln!(f, "{RULE}")?;
    for entry in entries {
        writeln!(f, "{}\t{}", entry.count, entry.identifier)?;
    }
    Ok(())
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let totals = &self.totals;
        writeln!(f, "Grand Totals")?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Messages")?;
        writeln!(f)?;
        writeln!(f, "Received: {}", totals.receive)?;
        writeln!(f, "Delivered: {}", totals.deliver)?;
        writeln!(f, "Deferred: {}", totals.deferred)?;
        writeln!(f, "Bounced: {}", totals.bounce)?;
        writeln!(f, "Discarded: {}", totals.discard)?;
        writeln!(f, "Rejected: {}", totals.reject)?;
        writeln!(f)?;
        writeln!(f)?;

        write_section(f, "Send users by message count", &self.send_users)?;
        writeln!(f)?;
        write_section(f, "Send domains by message count", &self.send_domains)?;
        writeln!(f)?;
        write_section(f, "Receive users by message count", &self.receive_users)?;
        writeln!(f)?;
        write_section(f, "Receive domains by message count", &self.receive_domains)?;
        writeln!(f)?;
        write_section(f, "Warnings", &self.warnings)
    }
}
