//! Ping command: unauthenticated liveness probe.

use serde::Serialize;

use shelfwatch_core::Coordinator;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct PingResult<'a> {
    url: &'a str,
    success: bool,
}

pub async fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let ping = coordinator.client().ping().await?;
    let result = PingResult {
        url: coordinator.config().url.as_str(),
        success: ping.success,
    };
    let color = output::should_color(&global.color);

    let out = output::render_single(
        &global.output,
        &result,
        |r| {
            let status = if r.success { "up" } else { "down" };
            format!("{} is {}", r.url, output::paint(status, r.success, color))
        },
        |r| if r.success { "ok" } else { "fail" }.to_owned(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
