// shelfwatch-api: Async Rust client for the Audiobookshelf server API

pub mod client;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod transport;

pub use client::ApiClient;
pub use endpoints::Endpoint;
pub use error::{Error, FailureKind};
pub use models::{
    Library, LibrariesResponse, LibraryStatsResponse, MediaType, OnlineResponse, Ping,
    PlaybackSession, User, UsersResponse,
};
pub use transport::{TlsMode, TransportConfig};
