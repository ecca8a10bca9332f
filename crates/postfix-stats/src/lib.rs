// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Parse-aggregate engine for Postfix mail logs.
//!
//! Raw lines flow through the [`classifier`], which splits off the timestamp, host
//! and process tag and hands the message to one of the [`parsers`]. Parsers turn
//! messages into events that bump counters in a [`record::Record`]. The
//! [`coordinator`] runs that loop over contiguous partitions in parallel and
//! merges the per-worker records; [`report`] ranks the result for display.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod classifier;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod domain;
pub mod errors;
pub mod parsers;
pub mod record;
pub mod report;
pub mod snapshot;
pub mod util;
