// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daily schedule grammar, as the supervisor consumes it

use sb_core::{parse_schedule, Schedule};
use std::time::Duration;

#[test]
fn daily_clock_time_parses() {
    assert_eq!(
        parse_schedule("daily@09:30").unwrap(),
        Schedule::Daily { hour: 9, minute: 30 }
    );
}

#[test]
fn out_of_range_hour_is_rejected() {
    assert!(parse_schedule("daily@25:00").is_err());
}

#[test]
fn missing_colon_is_rejected() {
    assert!(parse_schedule("daily@0930").is_err());
}

#[test]
fn prose_intervals_are_rejected() {
    assert!(parse_schedule("every5m").is_err());
}

#[test]
fn plain_interval_parses() {
    assert_eq!(
        parse_schedule("5m").unwrap(),
        Schedule::Interval(Duration::from_secs(300))
    );
}
