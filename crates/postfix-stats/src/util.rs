// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Text helpers: input line decoding and warning trimming.

use crate::constants::{ELLIPSIS, WARNING_WIDTH};

/// Shortens warning text so distinct warnings stay readable in a report column.
///
/// Text of at most [`WARNING_WIDTH`] characters is returned verbatim. Longer text is cut
/// to `WARNING_WIDTH - 3` characters and suffixed with `...`, so the result is exactly
/// `WARNING_WIDTH` characters long. Lengths are counted in characters, not bytes.
///
/// # Examples
///
/// ```
/// use postfix_stats::util::trim_warning;
///
/// assert_eq!(trim_warning("hostname nope does not resolve"), "hostname nope does not resolve");
/// assert_eq!(trim_warning(&"x".repeat(70)).chars().count(), 66);
/// assert!(trim_warning(&"x".repeat(70)).ends_with("..."));
/// ```
#[must_use]
pub fn trim_warning(detail: &str) -> String {
    match detail.char_indices().nth(WARNING_WIDTH) {
        None => detail.to_string(),
        Some(_) => {
            let keep = WARNING_WIDTH - ELLIPSIS.len();
            let cut = detail
                .char_indices()
                .nth(keep)
                .map_or(detail.len(), |(offset, _)| offset);
            format!("{}{}", &detail[..cut], ELLIPSIS)
        }
    }
}

/// Splits raw log bytes into lines the way [`str::lines`] does, decoding each line on
/// its own so invalid UTF-8 (Latin-1 subjects, stray binary) becomes `U+FFFD` instead of
/// failing the whole read.
#[must_use]
pub fn decode_lines(bytes: &[u8]) -> Vec<String> {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    if bytes.is_empty() {
        return Vec::new();
    }
    bytes
        .split(|&b| b == b'\n')
        .map(|line| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            String::from_utf8_lossy(line).into_owned()
        })
        .collect()
}
