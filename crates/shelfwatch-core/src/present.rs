// ── Presentation helpers ──
//
// Unit conversions and human-readable renderings for display surfaces.
// Snapshots always store raw units; these are applied on the way out.

use std::fmt;

use shelfwatch_api::FailureKind;

use crate::snapshot::{FieldData, FieldValue, LibraryStats};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
const SECS_PER_HOUR: f64 = 3600.0;

/// Bytes to gigabytes (binary), rounded to two decimals.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn bytes_to_gb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_GB * 100.0).round() / 100.0
}

/// Seconds to whole hours.
pub fn seconds_to_hours(secs: f64) -> f64 {
    (secs / SECS_PER_HOUR).round()
}

/// A field value ready for display.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Flag(bool),
    Count(u64),
    Gigabytes(f64),
    Hours(f64),
    Libraries(usize),
    Unavailable(FailureKind),
}

impl Reading {
    pub fn of_data(data: &FieldData) -> Self {
        match data {
            FieldData::Connected(up) => Self::Flag(*up),
            FieldData::Count(n) => Self::Count(*n),
            FieldData::Bytes(b) => Self::Gigabytes(bytes_to_gb(*b)),
            FieldData::Seconds(s) => Self::Hours(seconds_to_hours(*s)),
            FieldData::Libraries(all) => Self::Libraries(all.len()),
        }
    }

    /// This cycle's reading; a failed field reads as unavailable.
    pub fn of_field(value: &FieldValue) -> Self {
        match value {
            FieldValue::Ok { data } => Self::of_data(data),
            FieldValue::Failed { kind, .. } => Self::Unavailable(*kind),
        }
    }

    /// Reading from the last known good value. The flag is `true` when the
    /// value is stale (carried over from an earlier cycle).
    pub fn of_latest(value: &FieldValue) -> (Self, bool) {
        match value {
            FieldValue::Ok { data } => (Self::of_data(data), false),
            FieldValue::Failed {
                last_known: Some(data),
                ..
            } => (Self::of_data(data), true),
            FieldValue::Failed { kind, .. } => (Self::Unavailable(*kind), false),
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(true) => f.write_str("on"),
            Self::Flag(false) => f.write_str("off"),
            Self::Count(n) => write!(f, "{n}"),
            Self::Gigabytes(gb) => write!(f, "{gb:.2} GB"),
            Self::Hours(h) => write!(f, "{h:.0} h"),
            Self::Libraries(1) => f.write_str("1 library"),
            Self::Libraries(n) => write!(f, "{n} libraries"),
            Self::Unavailable(kind) => write!(f, "unavailable ({kind})"),
        }
    }
}

/// One-line summary of a library's totals.
pub fn library_summary(stats: &LibraryStats) -> String {
    let mut parts = vec![
        format!("{} items", stats.total_items),
        format!("{:.2} GB", bytes_to_gb(stats.total_size_bytes)),
        format!("{:.0} h", seconds_to_hours(stats.total_duration_secs)),
    ];
    if let Some(authors) = stats.total_authors {
        parts.push(format!("{authors} authors"));
    }
    if let Some(tracks) = stats.total_tracks {
        parts.push(format!("{tracks} tracks"));
    }
    parts.join(", ")
}
