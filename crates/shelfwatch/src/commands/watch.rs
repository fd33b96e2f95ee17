//! Watch command: poll on the scan interval and print each completed cycle.

use tokio::sync::mpsc;
use tracing::{debug, info};

use shelfwatch_core::Coordinator;

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::snapshot;

fn print_cycle(coordinator: &Coordinator, global: &GlobalOpts) {
    // One document per line keeps the stream machine-readable.
    let format = match global.output {
        OutputFormat::Json => &OutputFormat::JsonCompact,
        ref other => other,
    };
    let color = output::should_color(&global.color);
    let rendered = snapshot::render(&coordinator.get_snapshot(), format, color);
    output::print_output(&rendered, global.quiet);
}

pub async fn handle(
    coordinator: &Coordinator,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    coordinator.setup().await?;
    info!(
        interval_secs = coordinator.config().scan_interval.as_secs(),
        "watching"
    );
    print_cycle(coordinator, global);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener = coordinator.add_listener(move || {
        let _ = tx.send(());
    });

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut printed: u64 = 1;
    while args.count.is_none_or(|limit| printed < limit) {
        tokio::select! {
            _ = &mut ctrl_c => {
                debug!("interrupted");
                break;
            }
            cycle = rx.recv() => {
                if cycle.is_none() {
                    break;
                }
                print_cycle(coordinator, global);
                printed += 1;
            }
        }
    }

    coordinator.remove_listener(listener);
    coordinator.shutdown().await;
    Ok(())
}
