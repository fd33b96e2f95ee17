// ── Snapshot model ──
//
// One refresh cycle's merged result. Every configured field is present in
// every snapshot; a failed field carries its failure kind instead of data.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use shelfwatch_api::FailureKind;

/// Totals for one library, as stored (raw units).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LibraryStats {
    pub total_items: u64,
    pub total_size_bytes: u64,
    pub total_duration_secs: f64,
    /// Book libraries only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_authors: Option<u64>,
    /// Podcast libraries only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tracks: Option<u64>,
}

/// A successfully derived field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldData {
    Connected(bool),
    Count(u64),
    Bytes(u64),
    Seconds(f64),
    Libraries(BTreeMap<String, LibraryStats>),
}

/// What one field holds after a cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldValue {
    Ok {
        data: FieldData,
    },
    Failed {
        kind: FailureKind,
        message: String,
        /// Last value this field held successfully, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        last_known: Option<FieldData>,
    },
}

impl FieldValue {
    pub fn ok(data: FieldData) -> Self {
        Self::Ok { data }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Current data, or `None` if this cycle failed.
    pub fn data(&self) -> Option<&FieldData> {
        match self {
            Self::Ok { data } => Some(data),
            Self::Failed { .. } => None,
        }
    }

    /// Current data, falling back to the last known good value.
    pub fn latest(&self) -> Option<&FieldData> {
        match self {
            Self::Ok { data } => Some(data),
            Self::Failed { last_known, .. } => last_known.as_ref(),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Ok { .. } => None,
            Self::Failed { kind, .. } => Some(*kind),
        }
    }
}

/// The merged result of one refresh cycle, in descriptor order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub fields: IndexMap<String, FieldValue>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            taken_at: DateTime::<Utc>::UNIX_EPOCH,
            fields: IndexMap::new(),
        }
    }
}

impl Snapshot {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn failed_fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields
            .iter()
            .filter(|(_, v)| !v.is_ok())
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn ok_count(&self) -> usize {
        self.fields.values().filter(|v| v.is_ok()).count()
    }

    /// Convenience for count fields.
    pub fn count(&self, field: &str) -> Option<u64> {
        match self.get(field)?.data()? {
            FieldData::Count(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether the connectivity probe succeeded this cycle.
    pub fn is_connected(&self) -> bool {
        matches!(
            self.get(crate::descriptor::CONNECTIVITY).and_then(FieldValue::data),
            Some(FieldData::Connected(true))
        )
    }
}
