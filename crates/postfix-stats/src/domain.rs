// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Splits a Postfix `client=` token into the client hostname and its address.
//!
//! Postfix has written the client in a few shapes over the years:
//! - `host.example.com[192.0.2.1]` on current releases
//! - `host.example.com/192.0.2.1` or `host/fe80::1` on older ones
//! - assorted bracket and paren variants, handled by a generic fallback

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static BRACKETED_IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^\[]+)\[((?:\d{1,3}\.){3}\d{1,3})\]$").expect("invalid bracketed ipv4 regex")
});

#[allow(clippy::expect_used)]
static SLASHED_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([^/]+)/([0-9a-f.:]+)$").expect("invalid slashed address regex")
});

#[allow(clippy::expect_used)]
static GENERIC_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^\[(/]+)[\[(/]([^\])]+)[\])]?:?\s*$").expect("invalid generic address regex")
});

/// Hostname and address pulled out of a client token.
///
/// Both fields are empty when the token has no recognizable shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientAddress {
    pub domain: String,
    pub address: String,
}

impl ClientAddress {
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.domain.is_empty()
    }
}

/// Tries each address shape in priority order and returns the first full match.
#[must_use]
pub fn extract(input: &str) -> ClientAddress {
    [&*BRACKETED_IPV4, &*SLASHED_ADDRESS, &*GENERIC_ADDRESS]
        .into_iter()
        .find_map(|pattern| pattern.captures(input))
        .map(|caps| ClientAddress {
            domain: caps[1].to_string(),
            address: caps[2].to_string(),
        })
        .unwrap_or_default()
}
