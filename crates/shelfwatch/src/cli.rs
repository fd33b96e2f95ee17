//! Clap derive structures for the `shelfwatch` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// shelfwatch -- poll an Audiobookshelf server and report what it serves
#[derive(Debug, Parser)]
#[command(
    name = "shelfwatch",
    version,
    about = "Watch Audiobookshelf servers from the command line",
    long_about = "Polls an Audiobookshelf server for connectivity, active users,\n\
        open playback sessions, and per-library totals.\n\n\
        A failing endpoint only affects its own fields; everything else\n\
        is still reported.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "SHELFWATCH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Server URL (overrides profile)
    #[arg(long, short = 'u', env = "SHELFWATCH_URL", global = true)]
    pub url: Option<String>,

    /// API token
    #[arg(long, env = "SHELFWATCH_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Output format [default: `defaults.output` from config, else table]
    #[arg(
        long = "output",
        short = 'o',
        value_name = "FORMAT",
        env = "SHELFWATCH_OUTPUT",
        global = true
    )]
    pub output_flag: Option<OutputFormat>,

    /// When to use color output [default: `defaults.color` from config, else auto]
    #[arg(long = "color", value_name = "WHEN", global = true)]
    pub color_flag: Option<ColorMode>,

    /// Count only sessions updated in the last 120 s (or `session_idle_secs`)
    #[arg(long, env = "SHELFWATCH_RECENT_SESSIONS", global = true)]
    pub recent_sessions: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "SHELFWATCH_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "SHELFWATCH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Effective output format, filled by `config::resolve_display_opts`.
    #[arg(skip)]
    pub output: OutputFormat,

    /// Effective color mode, filled by `config::resolve_display_opts`.
    #[arg(skip)]
    pub color: ColorMode,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Default, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    #[default]
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one refresh cycle and print every field
    #[command(alias = "snap", alias = "s")]
    Snapshot(SnapshotArgs),

    /// Poll on an interval and print each completed cycle
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// List libraries
    #[command(alias = "libs", alias = "l")]
    Libraries(LibrariesArgs),

    /// List user accounts (tokens redacted)
    Users(UsersArgs),

    /// Check that the server answers
    Ping,

    /// Verify the configured token against the server
    Check,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Snapshot / Watch ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Skip the per-library fields
    #[arg(long)]
    pub no_libraries: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between cycles (overrides profile)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Exit after this many cycles
    #[arg(long, short = 'n')]
    pub count: Option<u64>,
}

// ── Libraries / Users ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LibrariesArgs {
    /// Include totals from each library's statistics endpoint
    #[arg(long)]
    pub stats: bool,
}

#[derive(Debug, Args)]
pub struct UsersArgs {
    /// Only users that are currently active
    #[arg(long)]
    pub active: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the resolved configuration with tokens redacted
    Show,

    /// Print the config file path
    Path,

    /// Store a token for a profile in the system keyring
    SetToken {
        /// Token value (prompted for when omitted)
        #[arg(long)]
        value: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
