//! Snapshot command: one refresh cycle, every field printed.

use tabled::Tabled;
use tracing::warn;

use shelfwatch_core::{Coordinator, CoreError, FieldValue, Reading, Snapshot};

use crate::cli::{GlobalOpts, OutputFormat, SnapshotArgs};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn row(field: &str, value: &FieldValue, color: bool) -> FieldRow {
    let (reading, stale) = Reading::of_latest(value);
    let status = value
        .failure_kind()
        .map_or_else(|| "ok".to_owned(), |kind| kind.to_string());
    let shown = if stale {
        output::dim(&format!("{reading} (last known)"), color)
    } else {
        reading.to_string()
    };
    FieldRow {
        field: field.to_owned(),
        status: output::paint(&status, value.is_ok(), color),
        value: shown,
    }
}

/// Render a snapshot in the selected output format.
pub(crate) fn render(snapshot: &Snapshot, format: &OutputFormat, color: bool) -> String {
    output::render_single(
        format,
        snapshot,
        |s| {
            let rows: Vec<FieldRow> = s.fields.iter().map(|(k, v)| row(k, v, color)).collect();
            format!(
                "Snapshot at {}\n{}",
                s.taken_at.format("%Y-%m-%d %H:%M:%S UTC"),
                output::render_table(&rows)
            )
        },
        |s| {
            s.fields
                .iter()
                .map(|(k, v)| format!("{k}\t{}", Reading::of_field(v)))
                .collect::<Vec<_>>()
                .join("\n")
        },
    )
}

/// Expand per-library fields, tolerating a library list that cannot be
/// fetched for a modeled reason.
pub(crate) async fn load_libraries_lenient(coordinator: &Coordinator) -> Result<(), CliError> {
    match coordinator.load_libraries().await {
        Ok(_) => Ok(()),
        Err(CoreError::Api(e)) if !e.is_fatal() => {
            warn!(error = %e, "library list unavailable, per-library fields skipped");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    coordinator: &Coordinator,
    args: SnapshotArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if !args.no_libraries {
        load_libraries_lenient(coordinator).await?;
    }
    coordinator.first_refresh().await?;

    let snapshot = coordinator.get_snapshot();
    let color = output::should_color(&global.color);
    output::print_output(&render(&snapshot, &global.output, color), global.quiet);

    let failed = snapshot.failed_fields().count();
    if failed > 0 && !global.quiet {
        eprintln!("{failed} of {} fields failed", snapshot.fields.len());
    }
    Ok(())
}
