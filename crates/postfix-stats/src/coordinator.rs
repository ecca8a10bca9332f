// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Splits a line set across workers and folds their partial records into one.
//!
//! Work is partitioned statically before parsing starts: each worker gets one
//! contiguous range and a private [`Record`], so the parse loop needs no locking.
//! Once every worker has finished, partial records are merged on the calling task
//! in worker-index order, which keeps the output identical between runs.
//!
//! A fatal line in any partition fails the whole pass and no partial result is
//! returned. Worker tokens form a parent-to-child chain in index order, so a failing
//! worker stops every worker after it while the ones before it run on and can still
//! report an earlier fatal line.

use std::ops::Range;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::classifier::process_line;
use crate::constants::CANCEL_CHECK_INTERVAL;
use crate::errors::AggregationError;
use crate::parsers::ParserOptions;
use crate::record::Record;

/// Splits `[0, len)` into `workers` contiguous ranges whose sizes differ by at most one.
///
/// The first `len % workers` ranges get the extra line. Ranges are empty when there
/// are more workers than lines; no ranges are returned for zero workers.
#[must_use]
pub fn partition(len: usize, workers: usize) -> Vec<Range<usize>> {
    if workers == 0 {
        return Vec::new();
    }
    let base = len / workers;
    let extra = len % workers;

    let mut start = 0;
    (0..workers)
        .map(|worker| {
            let size = base + usize::from(worker < extra);
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

/// Parses every line into a single record on the current thread.
pub fn parse_lines<S: AsRef<str>>(
    lines: &[S],
    options: &ParserOptions,
) -> Result<Record, AggregationError> {
    let mut record = Record::new();
    for (index, line) in lines.iter().enumerate() {
        process_line(line.as_ref(), &mut record, options)
            .map_err(|source| AggregationError::Line { index, source })?;
    }
    Ok(record)
}

#[derive(Debug, Clone, Copy)]
pub struct Coordinator {
    workers: usize,
    options: ParserOptions,
}

impl Coordinator {
    pub fn new(workers: usize, options: ParserOptions) -> Result<Self, AggregationError> {
        if workers == 0 {
            return Err(AggregationError::InvalidWorkerCount);
        }
        Ok(Self { workers, options })
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Parses `lines` on a fixed pool of blocking tasks and returns the merged record.
    pub async fn run(&self, lines: impl Into<Arc<[String]>>) -> Result<Record, AggregationError> {
        let lines: Arc<[String]> = lines.into();
        let tokens = cancellation_chain(self.workers);

        let handles: Vec<_> = partition(lines.len(), self.workers)
            .into_iter()
            .zip(tokens)
            .enumerate()
            .map(|(worker, (range, cancel_token))| {
                let lines = Arc::clone(&lines);
                let options = self.options;
                tokio::task::spawn_blocking(move || {
                    parse_partition(worker, &lines, range, &options, &cancel_token)
                })
            })
            .collect();

        // Barrier: every worker has finished before anything is merged.
        let mut partials = Vec::with_capacity(handles.len());
        for handle in handles {
            partials.push(handle.await);
        }

        let mut accumulator = Record::new();
        for partial in partials {
            if let Some(record) = partial?? {
                accumulator.merge(record);
            }
        }

        info!(lines = lines.len(), workers = self.workers, "Aggregation finished");
        Ok(accumulator)
    }
}

/// One token per worker, each a child of the previous one, so cancelling worker `k`
/// cancels every worker after `k` and none before it.
fn cancellation_chain(workers: usize) -> Vec<CancellationToken> {
    let mut tokens: Vec<CancellationToken> = Vec::with_capacity(workers);
    let mut parent = CancellationToken::new();
    for _ in 0..workers {
        let token = parent.child_token();
        tokens.push(token.clone());
        parent = token;
    }
    tokens
}

/// Returns `Ok(None)` when an earlier worker failed and this one stopped early.
fn parse_partition(
    worker: usize,
    lines: &[String],
    range: Range<usize>,
    options: &ParserOptions,
    cancel_token: &CancellationToken,
) -> Result<Option<Record>, AggregationError> {
    let mut record = Record::new();
    let Range { start, end } = range;

    for index in start..end {
        if (index - start) % CANCEL_CHECK_INTERVAL == 0 && cancel_token.is_cancelled() {
            debug!(worker, index, "Partition cancelled");
            return Ok(None);
        }
        if let Err(source) = process_line(&lines[index], &mut record, options) {
            error!(worker, index, "Fatal parse error: {}", source);
            cancel_token.cancel();
            return Err(AggregationError::Line { index, source });
        }
    }

    debug!(
        worker,
        start,
        end,
        totals = ?record.totals(),
        "Partition parsed"
    );
    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ParseError;
    use tracing_test::traced_test;

    fn sample_lines() -> Vec<String> {
        vec![
            "2024-01-01T00:00:00+00:00 host postfix/smtpd[123]: ID: client=mail.example.com[10.0.0.1], sasl_username=alice".to_string(),
            "2024-01-01T00:00:01+00:00 host postfix/smtp[124]: ID: to=<bob@example.com>, relay=x, delay=1, status=sent".to_string(),
            "2024-01-01T00:00:02+00:00 host postfix/smtpd[125]: NOQUEUE: reject: RCPT from unknown[192.0.2.1]: 554 denied".to_string(),
            "2024-01-01T00:00:03+00:00 host postfix/qmgr[126]: warning: qmgr_active_corrupt: save corrupt file".to_string(),
            "2024-01-01T00:00:04+00:00 host postfix/smtp[127]: ID: to=<carol@example.org>, relay=y, delay=2, status=sent".to_string(),
            "2024-01-01T00:00:05+00:00 host postfix/smtpd[128]: connect from unknown[192.0.2.1]".to_string(),
            "2024-01-01T00:00:06+00:00 host postfix/smtpd[129]: 7A: discard: END-OF-MESSAGE".to_string(),
        ]
    }

    #[test]
    fn test_partition_sizes() {
        let ranges = partition(10, 3);
        assert_eq!(ranges, vec![0..4, 4..7, 7..10]);

        let ranges = partition(9, 3);
        assert_eq!(ranges, vec![0..3, 3..6, 6..9]);
    }

    #[test]
    fn test_partition_more_workers_than_lines() {
        assert_eq!(partition(2, 4), vec![0..1, 1..2, 2..2, 2..2]);
        assert_eq!(partition(0, 2), vec![0..0, 0..0]);
        assert!(partition(5, 0).is_empty());
    }

    #[test]
    fn test_partition_covers_input_contiguously() {
        for len in 0..40 {
            for workers in 1..9 {
                let ranges = partition(len, workers);
                assert_eq!(ranges.len(), workers);
                assert_eq!(ranges.first().unwrap().start, 0);
                assert_eq!(ranges.last().unwrap().end, len);
                for pair in ranges.windows(2) {
                    assert_eq!(pair[0].end, pair[1].start);
                    assert!(pair[0].len() >= pair[1].len());
                    assert!(pair[0].len() - pair[1].len() <= 1);
                }
            }
        }
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            Coordinator::new(0, ParserOptions::default()),
            Err(AggregationError::InvalidWorkerCount)
        ));
    }

    #[tokio::test]
    async fn test_parallel_matches_sequential() {
        let lines = sample_lines();
        let sequential = parse_lines(&lines, &ParserOptions::default()).unwrap();

        for workers in 1..=9 {
            let coordinator = Coordinator::new(workers, ParserOptions::default()).unwrap();
            let merged = coordinator.run(lines.clone()).await.unwrap();
            assert_eq!(merged, sequential, "mismatch with {workers} workers");
        }
        assert_eq!(sequential.totals().to_array(), [2, 1, 1, 0, 0, 1]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let coordinator = Coordinator::new(4, ParserOptions::default()).unwrap();
        let record = coordinator.run(Vec::<String>::new()).await.unwrap();
        assert!(record.is_empty());
    }

    #[tokio::test]
    async fn test_fatal_line_aborts_whole_run() {
        let mut lines = sample_lines();
        lines.insert(5, "2024-01-01T00:00:05+00:00 host sshd[1]: session opened".to_string());

        let coordinator = Coordinator::new(3, ParserOptions::default()).unwrap();
        let err = coordinator.run(lines).await.unwrap_err();
        match err {
            AggregationError::Line { index, source } => {
                assert_eq!(index, 5);
                assert!(matches!(source, ParseError::MissingProcessTag { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_earliest_fatal_line_wins() {
        let filler = "2024-01-01T00:00:00+00:00 host postfix/smtpd[1]: connect from unknown[192.0.2.1]";
        let mut lines = vec![filler.to_string(); 6_000];
        lines[2_000] = "2024-01-01T00:00:00+00:00 host sshd[2]: session opened".to_string();
        lines[3_000] = "2024-01-01T00:00:00+00:00 host cron[3]: job started".to_string();

        let sequential = parse_lines(&lines, &ParserOptions::default()).unwrap_err();
        assert_eq!(sequential.line_index(), Some(2_000));

        for workers in [2, 3, 4] {
            let coordinator = Coordinator::new(workers, ParserOptions::default()).unwrap();
            for _ in 0..20 {
                let err = coordinator.run(lines.clone()).await.unwrap_err();
                assert_eq!(
                    err.line_index(),
                    sequential.line_index(),
                    "wrong line reported with {workers} workers"
                );
            }
        }
    }

    #[test]
    fn test_cancellation_chain_only_reaches_later_workers() {
        let tokens = cancellation_chain(4);
        tokens[1].cancel();
        assert!(!tokens[0].is_cancelled());
        assert!(tokens[1].is_cancelled());
        assert!(tokens[2].is_cancelled());
        assert!(tokens[3].is_cancelled());
    }

    #[test]
    #[traced_test]
    fn test_failing_worker_cancels_later_workers() {
        let lines = vec!["ts host postfix/smtp[1]: hi".to_string(), "garbage".to_string()];
        let tokens = cancellation_chain(3);
        let outcome = parse_partition(1, &lines, 0..2, &ParserOptions::default(), &tokens[1]);

        assert!(matches!(outcome, Err(AggregationError::Line { index: 1, .. })));
        assert!(!tokens[0].is_cancelled());
        assert!(tokens[2].is_cancelled());
        assert!(logs_contain("Fatal parse error"));
    }

    #[test]
    fn test_sequential_reports_absolute_index() {
        let lines = ["ts host postfix/smtp[1]: hi", "ts host postfix/pickup[2]:"];
        let err = parse_lines(&lines, &ParserOptions::default()).unwrap_err();
        assert_eq!(err.line_index(), Some(1));
    }

    #[test]
    fn test_cancelled_worker_stops_early() {
        let lines = sample_lines();
        let token = CancellationToken::new();
        token.cancel();
        let outcome = parse_partition(0, &lines, 0..lines.len(), &ParserOptions::default(), &token);
        assert!(matches!(outcome, Ok(None)));
    }
}
