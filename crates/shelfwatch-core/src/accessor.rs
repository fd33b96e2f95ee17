// ── Accessors ──
//
// Pure functions from one decoded response to one derived value. No I/O
// here; the coordinator owns fetching.

use secrecy::{ExposeSecret, SecretString};

use shelfwatch_api::{
    LibrariesResponse, LibraryStatsResponse, MediaType, OnlineResponse, UsersResponse,
};

use crate::snapshot::LibraryStats;

/// Who must not be counted as an active user.
#[derive(Debug, Clone, Copy)]
pub struct UserFilter<'a> {
    /// Reserved account name the integration logs in with.
    pub service_account: &'a str,
    /// When set, the user carrying this token is skipped as well.
    pub own_token: Option<&'a SecretString>,
}

/// Which open sessions count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionWindow {
    All,
    /// Only sessions whose `updatedAt` is within `idle_ms` of now.
    Recent { idle_ms: i64 },
}

fn len_u64(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

/// Count active users, minus the service account and (optionally) ourselves.
pub fn count_active_users(resp: &UsersResponse, filter: &UserFilter<'_>) -> u64 {
    let own = filter.own_token.map(ExposeSecret::expose_secret);
    let count = resp
        .users
        .iter()
        .filter(|u| u.is_active)
        .filter(|u| u.username != filter.service_account)
        .filter(|u| match (own, u.token.as_deref()) {
            (Some(own), Some(token)) => own != token,
            _ => true,
        })
        .count();
    len_u64(count)
}

/// Count open playback sessions. `now_ms` is milliseconds since the epoch,
/// the unit the server stamps sessions with.
pub fn count_open_sessions(resp: &OnlineResponse, window: SessionWindow, now_ms: i64) -> u64 {
    let count = match window {
        SessionWindow::All => resp.open_sessions.len(),
        SessionWindow::Recent { idle_ms } => resp
            .open_sessions
            .iter()
            .filter(|s| {
                s.updated_at
                    .is_some_and(|updated| now_ms.saturating_sub(updated) <= idle_ms)
            })
            .count(),
    };
    len_u64(count)
}

pub fn count_libraries(resp: &LibrariesResponse) -> u64 {
    len_u64(resp.libraries.len())
}

/// Reduce a stats response to the totals we publish.
///
/// Missing totals become zero. Authors are reported for book libraries,
/// tracks for podcast libraries.
pub fn summarize_library_stats(resp: &LibraryStatsResponse, media_type: &MediaType) -> LibraryStats {
    LibraryStats {
        total_items: resp.total_items.unwrap_or(0),
        total_size_bytes: resp.total_size.unwrap_or(0),
        total_duration_secs: resp.total_duration.unwrap_or(0.0),
        total_authors: matches!(media_type, MediaType::Book)
            .then_some(resp.total_authors.unwrap_or(0)),
        total_tracks: matches!(media_type, MediaType::Podcast)
            .then_some(resp.num_audio_tracks.unwrap_or(0)),
    }
}
