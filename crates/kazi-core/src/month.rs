use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const ABBRS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

const LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Calendar-month key for the per-engagement summary tables. Summary rows
/// are keyed by month abbreviation only; the year lives on the engagement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MonthKey {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl MonthKey {
    pub const ALL: [MonthKey; 12] = [
        Self::Jan,
        Self::Feb,
        Self::Mar,
        Self::Apr,
        Self::May,
        Self::Jun,
        Self::Jul,
        Self::Aug,
        Self::Sep,
        Self::Oct,
        Self::Nov,
        Self::Dec,
    ];

    pub fn as_str(self) -> &'static str {
        ABBRS[self.index()]
    }

    fn index(self) -> usize {
        self as usize
    }

    /// 1-based calendar month number.
    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    pub fn from_number(n: u32) -> Option<Self> {
        Self::ALL.get(n.checked_sub(1)? as usize).copied()
    }

    /// Parses a bare abbreviation ("JAN", "jan") or any label whose first
    /// three letters are a month abbreviation ("Jan-2025").
    pub fn parse_prefix(s: &str) -> Option<Self> {
        let prefix = s.get(..3)?.to_ascii_uppercase();
        ABBRS.iter().position(|a| *a == prefix).map(|i| Self::ALL[i])
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonthKey {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_prefix(s).ok_or_else(|| format!("unknown month: {s}"))
    }
}

/// A filing period label, e.g. `Sep-2025`. The VAT return due on a given
/// deadline covers the prior calendar month, so periods are derived from
/// dates with `from_date`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FilingPeriod {
    pub year: i32,
    pub month: MonthKey,
}

impl FilingPeriod {
    pub fn new(year: i32, month: MonthKey) -> Self {
        Self { year, month }
    }

    pub fn from_date(date: impl Datelike) -> Self {
        let month = MonthKey::from_number(date.month()).unwrap_or(MonthKey::Jan);
        Self {
            year: date.year(),
            month,
        }
    }
}

impl fmt::Display for FilingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", LABELS[self.month.index()], self.year)
    }
}

impl FromStr for FilingPeriod {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (m, y) = s
            .split_once('-')
            .ok_or_else(|| format!("bad filing period: {s}"))?;
        let month = MonthKey::parse_prefix(m).ok_or_else(|| format!("bad filing period: {s}"))?;
        let year: i32 = y.parse().map_err(|_| format!("bad filing period: {s}"))?;
        Ok(Self { year, month })
    }
}
