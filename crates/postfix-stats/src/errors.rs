// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Structural failures that make a log line unusable.
///
/// Any of these aborts the whole aggregation pass: input outside the Postfix log
/// grammar is treated as a data-integrity problem rather than a line to skip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no postfix/<process>[pid] tag found in '{tag}'")]
    MissingProcessTag { tag: String },

    #[error("no message match found for postfix/{process} line")]
    UnmatchedMessage { process: String },
}

/// Failures surfaced by the partition & merge coordinator.
#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("line {index}: {source}")]
    Line {
        index: usize,
        #[source]
        source: ParseError,
    },

    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("worker count must be greater than 0")]
    InvalidWorkerCount,
}

impl AggregationError {
    /// Zero-based index of the offending line, if the failure came from one.
    #[must_use]
    pub fn line_index(&self) -> Option<usize> {
        match self {
            Self::Line { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Failures while moving a [`crate::record::Record`] across a process boundary.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("{table} table has {identifiers} identifiers but {counts} counts")]
    LengthMismatch {
        table: &'static str,
        identifiers: usize,
        counts: usize,
    },

    #[error("failed to decode record snapshot: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
