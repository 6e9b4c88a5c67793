//! Refresh interval parsing.
//!
//! Intervals are written as a positive count glued to a single unit letter,
//! `90s`, `15m`, `12h`, `7d` or `2w`. Anything else, including a zero count
//! or surrounding whitespace, is rejected at configuration time.

use std::fmt;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

static INTERVAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(s|m|h|d|w)$").expect("interval pattern is valid"));

/// Time unit of a refresh interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl IntervalUnit {
    fn seconds(self) -> u64 {
        match self {
            IntervalUnit::Second => 1,
            IntervalUnit::Minute => 60,
            IntervalUnit::Hour => 3_600,
            IntervalUnit::Day => 86_400,
            IntervalUnit::Week => 604_800,
        }
    }

    fn letter(self) -> char {
        match self {
            IntervalUnit::Second => 's',
            IntervalUnit::Minute => 'm',
            IntervalUnit::Hour => 'h',
            IntervalUnit::Day => 'd',
            IntervalUnit::Week => 'w',
        }
    }
}

/// A validated refresh period, count times unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    count: u64,
    unit: IntervalUnit,
}

impl Interval {
    /// Parse the `<count><unit>` form. Returns `None` for anything that is
    /// not a positive integer followed by exactly one of `s m h d w`.
    pub fn parse(raw: &str) -> Option<Interval> {
        let caps = INTERVAL_RE.captures(raw)?;
        let count: u64 = caps[1].parse().ok()?;
        if count == 0 {
            return None;
        }
        let unit = match &caps[2] {
            "s" => IntervalUnit::Second,
            "m" => IntervalUnit::Minute,
            "h" => IntervalUnit::Hour,
            "d" => IntervalUnit::Day,
            "w" => IntervalUnit::Week,
            _ => return None,
        };
        Some(Interval { count, unit })
    }

    /// The period as a wall-clock duration.
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.count.saturating_mul(self.unit.seconds()))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit.letter())
    }
}
