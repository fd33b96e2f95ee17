//! Libraries command: list libraries, optionally with their totals.

use serde::Serialize;
use tabled::Tabled;

use shelfwatch_core::accessor::summarize_library_stats;
use shelfwatch_core::present::library_summary;
use shelfwatch_core::{Coordinator, Library, LibraryStats, MediaType};

use crate::cli::{GlobalOpts, LibrariesArgs};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct LibraryEntry {
    #[serde(flatten)]
    library: Library,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<LibraryStats>,
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct LibraryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    media_type: &'static str,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Totals")]
    totals: String,
}

fn media_type_name(media_type: &MediaType) -> &'static str {
    match media_type {
        MediaType::Book => "book",
        MediaType::Podcast => "podcast",
        MediaType::Other => "other",
    }
}

impl From<&LibraryEntry> for LibraryRow {
    fn from(e: &LibraryEntry) -> Self {
        Self {
            id: e.library.id.clone(),
            name: e.library.name.clone(),
            media_type: media_type_name(&e.library.media_type),
            provider: e.library.provider.clone().unwrap_or_default(),
            totals: e.stats.as_ref().map(library_summary).unwrap_or_default(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    coordinator: &Coordinator,
    args: LibrariesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = coordinator.client();
    let libraries = coordinator.get_libraries().await?;

    let mut entries = Vec::with_capacity(libraries.len());
    for library in libraries {
        let stats = if args.stats {
            let resp = client.library_stats(&library.id).await?;
            Some(summarize_library_stats(&resp, &library.media_type))
        } else {
            None
        };
        entries.push(LibraryEntry { library, stats });
    }

    let out = output::render_list(&global.output, &entries, |e| LibraryRow::from(e), |e| {
        format!("{}\t{}", e.library.id, e.library.name)
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_without_stats_leaves_totals_blank() {
        let entry = LibraryEntry {
            library: Library {
                id: "lib1".into(),
                name: "Audiobooks".into(),
                media_type: MediaType::Podcast,
                provider: None,
            },
            stats: None,
        };
        let row = LibraryRow::from(&entry);
        assert_eq!(row.media_type, "podcast");
        assert!(row.totals.is_empty());
    }
}
