// Audiobookshelf endpoints polled by shelfwatch
//
// `Endpoint` names every path the poller touches, so the coordinator can
// memoize responses by path within one cycle.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{
    Library, LibrariesResponse, LibraryStatsResponse, OnlineResponse, Ping, UsersResponse,
};

/// One upstream GET endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Ping,
    Users,
    UsersOnline,
    Libraries,
    LibraryStats(String),
}

impl Endpoint {
    /// Path relative to the server base URL.
    pub fn path(&self) -> String {
        match self {
            Self::Ping => "ping".into(),
            Self::Users => "api/users".into(),
            Self::UsersOnline => "api/users/online".into(),
            Self::Libraries => "api/libraries".into(),
            Self::LibraryStats(id) => format!("api/libraries/{id}/stats"),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.path())
    }
}

impl ApiClient {
    /// Fetch the raw JSON body of an endpoint.
    pub async fn fetch(&self, endpoint: &Endpoint) -> Result<Value, Error> {
        self.request(reqwest::Method::GET, &endpoint.path(), None)
            .await
    }

    /// `GET /ping` -- unauthenticated liveness probe.
    pub async fn ping(&self) -> Result<Ping, Error> {
        debug!("pinging server");
        self.get(&Endpoint::Ping.path()).await
    }

    /// `GET /api/users` -- every account. Admin token required.
    pub async fn list_users(&self) -> Result<UsersResponse, Error> {
        debug!("listing users");
        self.get(&Endpoint::Users.path()).await
    }

    /// `GET /api/users/online` -- online users and their open sessions.
    pub async fn users_online(&self) -> Result<OnlineResponse, Error> {
        debug!("fetching online users");
        self.get(&Endpoint::UsersOnline.path()).await
    }

    /// `GET /api/libraries`
    pub async fn list_libraries(&self) -> Result<Vec<Library>, Error> {
        debug!("listing libraries");
        let resp: LibrariesResponse = self.get(&Endpoint::Libraries.path()).await?;
        Ok(resp.libraries)
    }

    /// `GET /api/libraries/{id}/stats`
    pub async fn library_stats(&self, library_id: &str) -> Result<LibraryStatsResponse, Error> {
        debug!(library_id, "fetching library stats");
        self.get(&Endpoint::LibraryStats(library_id.to_owned()).path())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_match_server_routes() {
        assert_eq!(Endpoint::Ping.path(), "ping");
        assert_eq!(Endpoint::UsersOnline.path(), "api/users/online");
        assert_eq!(
            Endpoint::LibraryStats("lib_1".into()).to_string(),
            "/api/libraries/lib_1/stats"
        );
    }
}
