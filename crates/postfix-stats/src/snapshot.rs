// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Transport form of a [`Record`].
//!
//! A snapshot is the record flattened into plain arrays: the six totals, then the
//! user, domain and warning tables as parallel identifier/count arrays. Any
//! transport that can carry a serde value can move a partial record between
//! workers; the receiving side converts it back and merges it as usual.
//!
//! Tables are ordered by identifier, so a given record always encodes to the same
//! bytes.

use serde::{Deserialize, Serialize};

use crate::errors::SnapshotError;
use crate::record::{IdentifierMap, Record, Totals, TrafficEntry};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficTable {
    pub identifiers: Vec<String>,
    pub receive_counts: Vec<u64>,
    pub deliver_counts: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningTable {
    pub identifiers: Vec<String>,
    pub counts: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    /// deliver, receive, reject, deferred, bounce, discard
    pub totals: [u64; 6],
    pub users: TrafficTable,
    pub domains: TrafficTable,
    pub warnings: WarningTable,
}

impl TrafficTable {
    fn from_entries<'a>(entries: impl Iterator<Item = &'a TrafficEntry>) -> Self {
        let mut entries: Vec<&TrafficEntry> = entries.collect();
        entries.sort_unstable_by(|a, b| a.identifier.cmp(&b.identifier));

        let mut table = TrafficTable {
            identifiers: Vec::with_capacity(entries.len()),
            receive_counts: Vec::with_capacity(entries.len()),
            deliver_counts: Vec::with_capacity(entries.len()),
        };
        for entry in entries {
            table.identifiers.push(entry.identifier.clone());
            table.receive_counts.push(entry.receive_count);
            table.deliver_counts.push(entry.deliver_count);
        }
        table
    }

    fn into_map(self, table: &'static str) -> Result<IdentifierMap<TrafficEntry>, SnapshotError> {
        let identifiers = self.identifiers.len();
        for counts in [self.receive_counts.len(), self.deliver_counts.len()] {
            if counts != identifiers {
                return Err(SnapshotError::LengthMismatch {
                    table,
                    identifiers,
                    counts,
                });
            }
        }

        let mut map = IdentifierMap::default();
        for ((identifier, receive_count), deliver_count) in self
            .identifiers
            .into_iter()
            .zip(self.receive_counts)
            .zip(self.deliver_counts)
        {
            let entry = map
                .entry(identifier.clone())
                .or_insert_with(|| TrafficEntry::new(&identifier));
            entry.receive_count += receive_count;
            entry.deliver_count += deliver_count;
        }
        Ok(map)
    }
}

impl WarningTable {
    fn into_map(self) -> Result<IdentifierMap<u64>, SnapshotError> {
        if self.identifiers.len() != self.counts.len() {
            return Err(SnapshotError::LengthMismatch {
                table: "warnings",
                identifiers: self.identifiers.len(),
                counts: self.counts.len(),
            });
        }

        let mut map = IdentifierMap::default();
        for (text, count) in self.identifiers.into_iter().zip(self.counts) {
            *map.entry(text).or_insert(0) += count;
        }
        Ok(map)
    }
}

impl From<&Record> for RecordSnapshot {
    fn from(record: &Record) -> Self {
        let mut warnings: Vec<(&str, u64)> = record.warnings().collect();
        warnings.sort_unstable_by(|a, b| a.0.cmp(b.0));

        RecordSnapshot {
            totals: record.totals().to_array(),
            users: TrafficTable::from_entries(record.users()),
            domains: TrafficTable::from_entries(record.domains()),
            warnings: WarningTable {
                identifiers: warnings.iter().map(|(text, _)| (*text).to_string()).collect(),
                counts: warnings.iter().map(|(_, count)| *count).collect(),
            },
        }
    }
}

impl TryFrom<RecordSnapshot> for Record {
    type Error = SnapshotError;

    fn try_from(snapshot: RecordSnapshot) -> Result<Self, Self::Error> {
        Ok(Record::from_parts(
            snapshot.users.into_map("users")?,
            snapshot.domains.into_map("domains")?,
            snapshot.warnings.into_map()?,
            Totals::from_array(snapshot.totals),
        ))
    }
}

impl Record {
    #[must_use]
    pub fn snapshot(&self) -> RecordSnapshot {
        RecordSnapshot::from(self)
    }

    /// Encodes the record as a JSON [`RecordSnapshot`].
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.snapshot())
    }

    /// Decodes a JSON [`RecordSnapshot`] produced by [`Record::to_json`].
    pub fn from_json(encoded: &str) -> Result<Self, SnapshotError> {
        let snapshot: RecordSnapshot = serde_json::from_str(encoded)?;
        Record::try_from(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        let mut record = Record::new();
        record.increment_receive("zed@b.example", "b.example");
        record.increment_receive("amy@a.example", "a.example");
        record.increment_deliver("amy@a.example", "a.example");
        record.increment_warning("queue file size limit exceeded");
        record.increment_warning("queue file size limit exceeded");
        record.increment_reject();
        record.increment_bounce();
        record
    }

    #[test]
    fn test_snapshot_layout() {
        let snapshot = sample().snapshot();
        assert_eq!(snapshot.totals, [1, 2, 1, 0, 1, 0]);
        assert_eq!(snapshot.users.identifiers, vec!["amy@a.example", "zed@b.example"]);
        assert_eq!(snapshot.users.receive_counts, vec![1, 1]);
        assert_eq!(snapshot.users.deliver_counts, vec![1, 0]);
        assert_eq!(snapshot.domains.identifiers, vec!["a.example", "b.example"]);
        assert_eq!(snapshot.warnings.identifiers, vec!["queue file size limit exceeded"]);
        assert_eq!(snapshot.warnings.counts, vec![2]);
    }

    #[test]
    fn test_json_restores_equivalent_record() {
        let record = sample();
        let encoded = record.to_json().unwrap();
        assert_eq!(Record::from_json(&encoded).unwrap(), record);
        // stable bytes for identical content
        assert_eq!(sample().to_json().unwrap(), encoded);
    }

    #[test]
    fn test_empty_record_snapshot() {
        let snapshot = Record::new().snapshot();
        assert_eq!(snapshot, RecordSnapshot::default());
        assert!(Record::try_from(snapshot).unwrap().is_empty());
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let mut snapshot = sample().snapshot();
        snapshot.domains.deliver_counts.pop();
        let err = Record::try_from(snapshot).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::LengthMismatch {
                table: "domains",
                identifiers: 2,
                counts: 1
            }
        ));

        let mut snapshot = sample().snapshot();
        snapshot.warnings.counts.clear();
        assert!(matches!(
            Record::try_from(snapshot),
            Err(SnapshotError::LengthMismatch { table: "warnings", .. })
        ));
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        assert!(matches!(
            Record::from_json("{\"totals\": 7}"),
            Err(SnapshotError::Decode(_))
        ));
    }
}
