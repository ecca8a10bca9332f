// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Longest warning text kept in a record, ellipsis included.
pub const WARNING_WIDTH: usize = 66;

pub const ELLIPSIS: &str = "...";

/// Prefix of the process tag on every Postfix log line, e.g. `postfix/smtpd[123]:`.
pub const PROCESS_PREFIX: &str = "postfix/";

/// Domain used when an smtpd client token has no recognizable hostname.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// Workers check for cancellation once per this many lines.
pub const CANCEL_CHECK_INTERVAL: usize = 1_024;
