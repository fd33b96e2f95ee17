//! Users command: list accounts with tokens redacted.

use chrono::{DateTime, Utc};
use tabled::Tabled;

use shelfwatch_api::User;
use shelfwatch_core::Coordinator;

use crate::cli::{GlobalOpts, UsersArgs};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Type")]
    user_type: String,
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
}

fn format_last_seen(ms: Option<i64>) -> String {
    ms.and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

impl From<&User> for UserRow {
    fn from(u: &User) -> Self {
        Self {
            username: u.username.clone(),
            user_type: u.user_type.clone().unwrap_or_default(),
            active: if u.is_active { "yes" } else { "no" }.into(),
            last_seen: format_last_seen(u.last_seen),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    coordinator: &Coordinator,
    args: UsersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let resp = coordinator.client().list_users().await?;
    let users: Vec<User> = resp
        .users
        .iter()
        .filter(|u| !args.active || u.is_active)
        .map(User::redacted)
        .collect();

    let out = output::render_list(&global.output, &users, |u| UserRow::from(u), |u| {
        u.username.clone()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_seen_renders_utc_minutes() {
        assert_eq!(format_last_seen(Some(0)), "1970-01-01 00:00");
        assert_eq!(format_last_seen(None), "");
    }
}
