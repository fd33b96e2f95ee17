// ── Field descriptors ──
//
// A static, ordered list of (field, source, decoder) triples built at
// construction time, plus a per-library tail regenerated whenever the
// library list is fetched.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use shelfwatch_api::{
    Endpoint, Library, LibrariesResponse, LibraryStatsResponse, OnlineResponse, Ping,
    UsersResponse,
};

use crate::accessor::{self, SessionWindow, UserFilter};
use crate::snapshot::{FieldData, LibraryStats};

pub const CONNECTIVITY: &str = "connectivity";
pub const ACTIVE_USERS: &str = "active_users";
pub const OPEN_SESSIONS: &str = "open_sessions";
pub const LIBRARY_COUNT: &str = "library_count";
pub const LIBRARY_STATS: &str = "library_stats";

/// Which per-library total a derived field tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryMetric {
    Size,
    Items,
    Duration,
}

impl LibraryMetric {
    pub const ALL: [Self; 3] = [Self::Size, Self::Items, Self::Duration];

    fn suffix(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Items => "items",
            Self::Duration => "duration",
        }
    }

    /// Field key for this metric of `library_id`.
    pub fn field_key(self, library_id: &str) -> String {
        format!("library_{library_id}_{}", self.suffix())
    }

    fn pick(self, stats: &LibraryStats) -> FieldData {
        match self {
            Self::Size => FieldData::Bytes(stats.total_size_bytes),
            Self::Items => FieldData::Count(stats.total_items),
            Self::Duration => FieldData::Seconds(stats.total_duration_secs),
        }
    }
}

/// Where a field's input comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Exactly one upstream call.
    Endpoint(Endpoint),
    /// The statistics endpoint of every known library.
    EachLibrary,
}

/// How a field's value is derived from its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoder {
    Connectivity,
    ActiveUsers,
    OpenSessions,
    LibraryCount,
    LibraryStats,
    LibraryMetric {
        library: Library,
        metric: LibraryMetric,
    },
}

/// Inputs accessors need besides the response body.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    pub users: UserFilter<'a>,
    /// Libraries whose statistics feed the aggregated field.
    pub libraries: &'a [Library],
    pub sessions: SessionWindow,
    pub now_ms: i64,
}

impl Decoder {
    /// Derive a value from a response body.
    ///
    /// For `LibraryStats` the body is an object mapping each library id in
    /// `ctx.libraries` to that library's statistics body.
    pub fn decode(&self, body: &Value, ctx: &DecodeContext<'_>) -> Result<FieldData, serde_json::Error> {
        Ok(match self {
            Self::Connectivity => FieldData::Connected(Ping::deserialize(body)?.success),
            Self::ActiveUsers => {
                let resp = UsersResponse::deserialize(body)?;
                FieldData::Count(accessor::count_active_users(&resp, &ctx.users))
            }
            Self::OpenSessions => {
                let resp = OnlineResponse::deserialize(body)?;
                FieldData::Count(accessor::count_open_sessions(
                    &resp,
                    ctx.sessions,
                    ctx.now_ms,
                ))
            }
            Self::LibraryCount => {
                let resp = LibrariesResponse::deserialize(body)?;
                FieldData::Count(accessor::count_libraries(&resp))
            }
            Self::LibraryStats => {
                let mut all = BTreeMap::new();
                for library in ctx.libraries {
                    let stats = body.get(&library.id).unwrap_or(&Value::Null);
                    all.insert(library.id.clone(), decode_library_stats(library, stats)?);
                }
                FieldData::Libraries(all)
            }
            Self::LibraryMetric { library, metric } => {
                metric.pick(&decode_library_stats(library, body)?)
            }
        })
    }
}

/// Decode one library's statistics body.
pub fn decode_library_stats(library: &Library, body: &Value) -> Result<LibraryStats, serde_json::Error> {
    let resp = LibraryStatsResponse::deserialize(body)?;
    Ok(accessor::summarize_library_stats(&resp, &library.media_type))
}

/// One snapshot field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub field: String,
    pub source: Source,
    pub decoder: Decoder,
}

impl Descriptor {
    fn endpoint(field: &str, endpoint: Endpoint, decoder: Decoder) -> Self {
        Self {
            field: field.to_owned(),
            source: Source::Endpoint(endpoint),
            decoder,
        }
    }
}

/// The ordered set of fields every snapshot contains.
#[derive(Debug, Clone)]
pub struct DescriptorSet {
    fixed: Vec<Descriptor>,
    libraries: Vec<Library>,
    derived: Vec<Descriptor>,
}

impl Default for DescriptorSet {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorSet {
    pub fn new() -> Self {
        let fixed = vec![
            Descriptor::endpoint(CONNECTIVITY, Endpoint::Ping, Decoder::Connectivity),
            Descriptor::endpoint(ACTIVE_USERS, Endpoint::Users, Decoder::ActiveUsers),
            Descriptor::endpoint(OPEN_SESSIONS, Endpoint::UsersOnline, Decoder::OpenSessions),
            Descriptor::endpoint(LIBRARY_COUNT, Endpoint::Libraries, Decoder::LibraryCount),
            Descriptor {
                field: LIBRARY_STATS.to_owned(),
                source: Source::EachLibrary,
                decoder: Decoder::LibraryStats,
            },
        ];
        Self {
            fixed,
            libraries: Vec::new(),
            derived: Vec::new(),
        }
    }

    /// Regenerate the per-library fields from `libraries`.
    ///
    /// The derived tail is rebuilt from scratch, so calling this again with
    /// the same list leaves the field set unchanged. Duplicate ids are
    /// collapsed. Returns `true` if the field set changed.
    pub fn expand_libraries(&mut self, libraries: &[Library]) -> bool {
        let mut unique: Vec<Library> = Vec::with_capacity(libraries.len());
        for lib in libraries {
            if !unique.iter().any(|u| u.id == lib.id) {
                unique.push(lib.clone());
            }
        }

        let derived: Vec<Descriptor> = unique
            .iter()
            .flat_map(|lib| {
                LibraryMetric::ALL.into_iter().map(move |metric| Descriptor {
                    field: metric.field_key(&lib.id),
                    source: Source::Endpoint(Endpoint::LibraryStats(lib.id.clone())),
                    decoder: Decoder::LibraryMetric {
                        library: lib.clone(),
                        metric,
                    },
                })
            })
            .collect();

        let changed = derived != self.derived;
        self.libraries = unique;
        self.derived = derived;
        changed
    }

    /// Known libraries, in server order.
    pub fn libraries(&self) -> &[Library] {
        &self.libraries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.fixed.iter().chain(self.derived.iter())
    }

    pub fn field_keys(&self) -> Vec<String> {
        self.iter().map(|d| d.field.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.fixed.len() + self.derived.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use shelfwatch_api::MediaType;

    use super::*;

    fn lib(id: &str, media_type: MediaType) -> Library {
        Library {
            id: id.into(),
            name: id.to_uppercase(),
            media_type,
            provider: None,
        }
    }

    #[test]
    fn static_fields_in_fixed_order() {
        let set = DescriptorSet::new();
        assert_eq!(
            set.field_keys(),
            vec![CONNECTIVITY, ACTIVE_USERS, OPEN_SESSIONS, LIBRARY_COUNT, LIBRARY_STATS]
        );
    }

    #[test]
    fn expansion_adds_three_fields_per_library() {
        let mut set = DescriptorSet::new();
        assert!(set.expand_libraries(&[lib("books", MediaType::Book), lib("pods", MediaType::Podcast)]));
        let keys = set.field_keys();
        assert_eq!(keys.len(), 11);
        assert_eq!(
            &keys[5..8],
            &["library_books_size", "library_books_items", "library_books_duration"]
        );
    }

    #[test]
    fn expansion_is_idempotent() {
        let libs = [lib("books", MediaType::Book), lib("books", MediaType::Book)];
        let mut set = DescriptorSet::new();
        set.expand_libraries(&libs);
        let first = set.field_keys();
        assert!(!set.expand_libraries(&libs));
        assert_eq!(set.field_keys(), first);
        assert_eq!(first.len(), 8);
    }

    #[test]
    fn shrinking_library_list_drops_fields() {
        let mut set = DescriptorSet::new();
        set.expand_libraries(&[lib("a", MediaType::Book), lib("b", MediaType::Book)]);
        assert!(set.expand_libraries(&[lib("b", MediaType::Book)]));
        assert!(!set.field_keys().iter().any(|k| k.starts_with("library_a_")));
        assert_eq!(set.libraries().len(), 1);
    }

    #[test]
    fn metric_decoder_picks_raw_units() {
        let decoder = Decoder::LibraryMetric {
            library: lib("books", MediaType::Book),
            metric: LibraryMetric::Size,
        };
        let ctx = DecodeContext {
            users: UserFilter {
                service_account: "hass",
                own_token: None,
            },
            libraries: &[],
            sessions: SessionWindow::All,
            now_ms: 0,
        };
        let data = decoder
            .decode(&json!({ "totalSize": 2_147_483_648_u64 }), &ctx)
            .unwrap();
        assert_eq!(data, FieldData::Bytes(2_147_483_648));

        let bad = Decoder::ActiveUsers.decode(&json!({ "users": "nope" }), &ctx);
        assert!(bad.is_err());
    }

    #[test]
    fn aggregated_stats_keyed_by_library() {
        let libraries = [lib("books", MediaType::Book), lib("pods", MediaType::Podcast)];
        let ctx = DecodeContext {
            users: UserFilter {
                service_account: "hass",
                own_token: None,
            },
            libraries: &libraries,
            sessions: SessionWindow::All,
            now_ms: 0,
        };
        let body = json!({
            "books": { "totalItems": 4, "totalAuthors": 2 },
            "pods": { "totalItems": 1, "numAudioTracks": 9 }
        });
        let FieldData::Libraries(all) = Decoder::LibraryStats.decode(&body, &ctx).unwrap() else {
            panic!("expected per-library map");
        };
        assert_eq!(all["books"].total_authors, Some(2));
        assert_eq!(all["pods"].total_tracks, Some(9));
    }
}
