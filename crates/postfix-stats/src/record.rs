// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The aggregation unit filled in by the subsystem parsers.
//!
//! A [`Record`] holds everything one parse pass learns about a slice of the log:
//! per-user and per-domain receive/deliver counters, a frequency table of warning
//! texts, and six global totals. Each worker owns a private record for its
//! partition; the coordinator then folds them together with [`Record::merge`].
//!
//! # Merge semantics
//!
//! Merging adds totals elementwise and sums counters key by key, creating entries
//! that only exist on the incoming side. The operation is associative and
//! commutative, so partial records combined in any grouping or order yield the
//! same result as one sequential pass over the whole input.

use std::ops::AddAssign;

use hashbrown::hash_map::Entry;
use serde::Serialize;

pub(crate) type IdentifierMap<V> = hashbrown::HashMap<String, V, fnv::FnvBuildHasher>;

/// Receive and deliver counters for a single user or domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrafficEntry {
    pub identifier: String,
    pub receive_count: u64,
    pub deliver_count: u64,
}

/// Counters for one `mailbox@domain` identifier.
pub type UserEntry = TrafficEntry;

/// Counters for one domain identifier.
pub type DomainEntry = TrafficEntry;

impl TrafficEntry {
    #[must_use]
    pub fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            receive_count: 0,
            deliver_count: 0,
        }
    }

    fn absorb(&mut self, other: &TrafficEntry) {
        self.receive_count += other.receive_count;
        self.deliver_count += other.deliver_count;
    }
}

/// Global message totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub deliver: u64,
    pub receive: u64,
    pub reject: u64,
    pub deferred: u64,
    pub bounce: u64,
    pub discard: u64,
}

impl Totals {
    /// Totals in their transport order: deliver, receive, reject, deferred, bounce, discard.
    #[must_use]
    pub fn to_array(self) -> [u64; 6] {
        [
            self.deliver,
            self.receive,
            self.reject,
            self.deferred,
            self.bounce,
            self.discard,
        ]
    }

    #[must_use]
    pub fn from_array(totals: [u64; 6]) -> Self {
        let [deliver, receive, reject, deferred, bounce, discard] = totals;
        Self {
            deliver,
            receive,
            reject,
            deferred,
            bounce,
            discard,
        }
    }
}

impl AddAssign for Totals {
    fn add_assign(&mut self, rhs: Self) {
        self.deliver += rhs.deliver;
        self.receive += rhs.receive;
        self.reject += rhs.reject;
        self.deferred += rhs.deferred;
        self.bounce += rhs.bounce;
        self.discard += rhs.discard;
    }
}

/// Mutable aggregation state for one parse pass or partition.
///
/// Identifiers are case-sensitive and, once created, are never removed. All
/// counters only grow while a pass is running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    users: IdentifierMap<UserEntry>,
    domains: IdentifierMap<DomainEntry>,
    warnings: IdentifierMap<u64>,
    totals: Totals,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one delivered message against the recipient, its domain, and the global total.
    pub fn increment_deliver(&mut self, user: &str, domain: &str) {
        Self::entry(&mut self.users, user).deliver_count += 1;
        Self::entry(&mut self.domains, domain).deliver_count += 1;
        self.totals.deliver += 1;
    }

    /// Counts one received message against the sender, its domain, and the global total.
    pub fn increment_receive(&mut self, user: &str, domain: &str) {
        Self::entry(&mut self.users, user).receive_count += 1;
        Self::entry(&mut self.domains, domain).receive_count += 1;
        self.totals.receive += 1;
    }

    /// Bumps the occurrence count for an already trimmed warning text.
    pub fn increment_warning(&mut self, text: &str) {
        *self.warnings.entry_ref(text).or_insert(0) += 1;
    }

    pub fn increment_reject(&mut self) {
        self.totals.reject += 1;
    }

    pub fn increment_deferred(&mut self) {
        self.totals.deferred += 1;
    }

    pub fn increment_bounce(&mut self) {
        self.totals.bounce += 1;
    }

    pub fn increment_discard(&mut self) {
        self.totals.discard += 1;
    }

    /// Folds `other` into `self`, consuming it.
    pub fn merge(&mut self, other: Record) {
        self.totals += other.totals;

        for (identifier, entry) in other.users {
            Self::absorb_entry(&mut self.users, identifier, entry);
        }
        for (identifier, entry) in other.domains {
            Self::absorb_entry(&mut self.domains, identifier, entry);
        }
        for (text, count) in other.warnings {
            *self.warnings.entry(text).or_insert(0) += count;
        }
    }

    #[must_use]
    pub fn totals(&self) -> Totals {
        self.totals
    }

    #[must_use]
    pub fn user(&self, identifier: &str) -> Option<&UserEntry> {
        self.users.get(identifier)
    }

    #[must_use]
    pub fn domain(&self, identifier: &str) -> Option<&DomainEntry> {
        self.domains.get(identifier)
    }

    /// Occurrences of a warning text; zero when it was never seen.
    #[must_use]
    pub fn warning_count(&self, text: &str) -> u64 {
        self.warnings.get(text).copied().unwrap_or(0)
    }

    pub fn users(&self) -> impl Iterator<Item = &UserEntry> {
        self.users.values()
    }

    pub fn domains(&self) -> impl Iterator<Item = &DomainEntry> {
        self.domains.values()
    }

    pub fn warnings(&self) -> impl Iterator<Item = (&str, u64)> {
        self.warnings.iter().map(|(text, count)| (text.as_str(), *count))
    }

    /// True when no line has touched this record yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.domains.is_empty()
            && self.warnings.is_empty()
            && self.totals == Totals::default()
    }

    pub(crate) fn from_parts(
        users: IdentifierMap<UserEntry>,
        domains: IdentifierMap<DomainEntry>,
        warnings: IdentifierMap<u64>,
        totals: Totals,
    ) -> Self {
        Self {
            users,
            domains,
            warnings,
            totals,
        }
    }

    fn entry<'a>(map: &'a mut IdentifierMap<TrafficEntry>, identifier: &str) -> &'a mut TrafficEntry {
        map.entry_ref(identifier)
            .or_insert_with(|| TrafficEntry::new(identifier))
    }

    fn absorb_entry(map: &mut IdentifierMap<TrafficEntry>, identifier: String, entry: TrafficEntry) {
        match map.entry(identifier) {
            Entry::Occupied(mut existing) => existing.get_mut().absorb(&entry),
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
        }
    }
}

impl AddAssign for Record {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(rhs);
    }
}
