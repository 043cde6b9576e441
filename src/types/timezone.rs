//! Timezone context for date/time columns.
//!
//! The wire value of `DateTime` is a plain unix timestamp; the timezone only
//! matters when a column has to interpret a local date/time string or derive
//! a calendar date.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Offset, TimeZone, Utc};
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timezone {
    /// The host's local zone.
    Local,
    Fixed(FixedOffset),
}

static DEFAULT_TIMEZONE: OnceLock<Timezone> = OnceLock::new();

/// Process-wide default, `Local` unless set before first use.
pub fn default_timezone() -> Timezone {
    *DEFAULT_TIMEZONE.get_or_init(|| Timezone::Local)
}

/// Set the process default. Fails (returning the rejected value) once the
/// default has been read or set.
pub fn set_default_timezone(tz: Timezone) -> Result<(), Timezone> {
    DEFAULT_TIMEZONE.set(tz)
}

impl Timezone {
    pub fn utc() -> Self {
        Timezone::Fixed(Utc.fix())
    }

    /// Accepts `UTC`, `GMT`, `Etc/UTC`, `Local` and `±HH:MM` offsets.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "UTC" | "GMT" | "Etc/UTC" | "Etc/GMT" | "Z" => Some(Self::utc()),
            "Local" | "local" => Some(Timezone::Local),
            other => other.parse::<FixedOffset>().ok().map(Timezone::Fixed),
        }
    }

    /// Resolve a wall-clock time in this zone.
    pub fn from_local_datetime(&self, naive: &NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Timezone::Local => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.fixed_offset()),
            Timezone::Fixed(offset) => offset.from_local_datetime(naive).single(),
        }
    }

    /// Convert an instant into this zone.
    pub fn to_zone(&self, dt: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        match self {
            Timezone::Local => dt.with_timezone(&Local).fixed_offset(),
            Timezone::Fixed(offset) => dt.with_timezone(offset),
        }
    }
}

impl From<FixedOffset> for Timezone {
    fn from(offset: FixedOffset) -> Self {
        Timezone::Fixed(offset)
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timezone::Local => write!(f, "Local"),
            Timezone::Fixed(offset) if offset.local_minus_utc() == 0 => write!(f, "UTC"),
            Timezone::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}
