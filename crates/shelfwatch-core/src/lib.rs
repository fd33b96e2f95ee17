//! Polling data-refresh engine for a single Audiobookshelf server.
//!
//! - **[`Coordinator`]** owns the refresh cycle. [`setup()`](Coordinator::setup)
//!   loads the library list, runs the first cycle and spawns the periodic
//!   task; readers call [`get_snapshot()`](Coordinator::get_snapshot) or
//!   register listeners that fire once per completed cycle.
//!
//! - **[`Snapshot`]** is the merged result of one cycle. Every configured
//!   field is present; failed fields carry a [`FailureKind`] and the last
//!   known good value instead of data.
//!
//! - **Descriptors** ([`descriptor`]) are the static (field, source, decoder)
//!   list, extended with three fields per library once the list is known.
//!
//! - **Accessors** ([`accessor`]) are pure functions turning one response into
//!   one derived value.

pub mod accessor;
pub mod config;
pub mod coordinator;
pub mod descriptor;
pub mod error;
pub mod present;
pub mod snapshot;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::ServerConfig;
pub use coordinator::{Coordinator, ListenerId};
pub use descriptor::{DescriptorSet, LibraryMetric};
pub use error::CoreError;
pub use present::Reading;
pub use snapshot::{FieldData, FieldValue, LibraryStats, Snapshot};

pub use shelfwatch_api::{FailureKind, Library, MediaType, TlsMode};
