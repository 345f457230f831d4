// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule grammar for supervisor tasks: intervals and daily clock times

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// When a supervisor task fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Schedule {
    /// Periodic interval ("30s", "5m", "1h").
    Interval(Duration),
    /// Once per day at a local-time `HH:MM`.
    Daily { hour: u32, minute: u32 },
}

/// Schedule parse errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("empty duration string")]
    EmptyDuration,

    #[error("invalid number in duration: {0}")]
    InvalidNumber(String),

    #[error("unknown duration suffix: {0}")]
    UnknownSuffix(String),

    #[error("invalid daily schedule (expected daily@HH:MM): {0}")]
    InvalidDaily(String),

    #[error("daily schedule hour out of range: {0}")]
    HourOutOfRange(u32),

    #[error("daily schedule minute out of range: {0}")]
    MinuteOutOfRange(u32),
}

/// Parse a schedule string: the literal `daily@HH:MM` (zero-padded, local
/// time) or any parseable duration.
pub fn parse_schedule(s: &str) -> Result<Schedule, ScheduleError> {
    if let Some(clock) = s.strip_prefix("daily@") {
        let (hour, minute) = parse_daily_clock(s, clock)?;
        return Ok(Schedule::Daily { hour, minute });
    }
    parse_duration(s).map(Schedule::Interval)
}

/// Parse a duration string with a numeric prefix and unit suffix.
///
/// A bare number is seconds. Accepted suffixes: ms, s/sec/seconds,
/// m/min/minutes, h/hr/hours, d/days.
pub fn parse_duration(s: &str) -> Result<Duration, ScheduleError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ScheduleError::EmptyDuration);
    }

    // Find the numeric prefix
    let (num_str, suffix) = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| (&s[..i], &s[i..]))
        .unwrap_or((s, ""));

    let num: u64 =
        num_str.parse().map_err(|_| ScheduleError::InvalidNumber(s.to_string()))?;

    let multiplier = match suffix.trim() {
        "ms" | "millis" | "millisecond" | "milliseconds" => {
            return Ok(Duration::from_millis(num));
        }
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3600,
        "d" | "day" | "days" => 86400,
        other => return Err(ScheduleError::UnknownSuffix(other.to_string())),
    };

    Ok(Duration::from_secs(num * multiplier))
}

/// `HH:MM`, both parts exactly two digits, HH in [0,23], MM in [0,59].
fn parse_daily_clock(full: &str, clock: &str) -> Result<(u32, u32), ScheduleError> {
    let invalid = || ScheduleError::InvalidDaily(full.to_string());

    let (hh, mm) = clock.split_once(':').ok_or_else(invalid)?;
    if hh.len() != 2 || mm.len() != 2 {
        return Err(invalid());
    }
    if !hh.bytes().all(|b| b.is_ascii_digit()) || !mm.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let hour: u32 = hh.parse().map_err(|_| invalid())?;
    let minute: u32 = mm.parse().map_err(|_| invalid())?;
    if hour > 23 {
        return Err(ScheduleError::HourOutOfRange(hour));
    }
    if minute > 59 {
        return Err(ScheduleError::MinuteOutOfRange(minute));
    }
    Ok((hour, minute))
}

/// Next local-time instant strictly after now with the given hour and minute,
/// seconds and nanos zeroed.
pub fn next_daily_run(hour: u32, minute: u32) -> DateTime<Local> {
    next_daily_run_after(Local::now(), hour, minute)
}

/// As [`next_daily_run`], relative to an explicit `now`.
pub fn next_daily_run_after(now: DateTime<Local>, hour: u32, minute: u32) -> DateTime<Local> {
    let mut date = now.date_naive();
    // At most two iterations in the common case; the extra day covers a
    // DST gap swallowing the target wall-clock time.
    for _ in 0..3 {
        if let Some(naive) = date.and_hms_opt(hour, minute, 0) {
            if let Some(candidate) = Local.from_local_datetime(&naive).earliest() {
                if candidate > now {
                    return candidate;
                }
            }
        }
        date = date.succ_opt().unwrap_or(date);
    }
    now + chrono::Duration::days(1)
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
