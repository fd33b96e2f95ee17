// Audiobookshelf wire models
//
// Only the fields the poller reads are modeled. Unknown fields are ignored
// so newer server releases keep decoding. The top-level list or flag of each
// response is required: an error object returned with a 200 must not read
// as an empty result.

use serde::{Deserialize, Serialize};

/// `GET /ping`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Ping {
    pub success: bool,
}

/// `GET /api/users`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

/// A server account as listed by `/api/users`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(rename = "type", default)]
    pub user_type: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    /// Legacy per-user API token. Present on older servers and for admins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub last_seen: Option<i64>,
}

impl User {
    /// Copy of this user safe to print: the token is masked.
    pub fn redacted(&self) -> Self {
        Self {
            token: self.token.as_ref().map(|_| "<redacted>".to_owned()),
            ..self.clone()
        }
    }
}

/// `GET /api/users/online`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineResponse {
    #[serde(default)]
    pub users_online: Vec<User>,
    /// Older servers name this list `sessions`.
    #[serde(alias = "sessions")]
    pub open_sessions: Vec<PlaybackSession>,
}

/// A playback session. Timestamps are server milliseconds since the epoch.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSession {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub display_title: Option<String>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

/// `GET /api/libraries`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LibrariesResponse {
    pub libraries: Vec<Library>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Library {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub provider: Option<String>,
}

/// What a library holds. Decides which per-library totals apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Book,
    Podcast,
    #[serde(other)]
    Other,
}

/// `GET /api/libraries/{id}/stats`
///
/// Every total may be missing or `null` on an empty library.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStatsResponse {
    #[serde(default)]
    pub total_items: Option<u64>,
    #[serde(default)]
    pub total_size: Option<u64>,
    #[serde(default)]
    pub total_duration: Option<f64>,
    #[serde(default)]
    pub total_authors: Option<u64>,
    #[serde(default)]
    pub total_genres: Option<u64>,
    #[serde(default)]
    pub num_audio_tracks: Option<u64>,
}
