//! Check command: verify the token the way setup does.
//!
//! `GET /api/users` needs a valid admin token, so a success proves both
//! reachability and credentials.

use tracing::debug;

use shelfwatch_core::Coordinator;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let url = coordinator.config().url.to_string();
    match coordinator.client().list_users().await {
        Ok(resp) => {
            debug!(users = resp.users.len(), "credentials accepted");
            let color = output::should_color(&global.color);
            output::print_output(
                &format!(
                    "{} token accepted by {url} ({} users)",
                    output::paint("ok", true, color),
                    resp.users.len()
                ),
                global.quiet,
            );
            Ok(())
        }
        Err(e) if e.is_transient() => Err(CliError::ConnectionFailed {
            url,
            reason: format!("cannot reach server: {e}"),
        }),
        Err(e) => Err(e.into()),
    }
}
