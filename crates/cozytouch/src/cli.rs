//! Clap derive structures for the `cozytouch` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// cozytouch -- inspect and drive Cozytouch heating devices
#[derive(Debug, Parser)]
#[command(
    name = "cozytouch",
    version,
    about = "Inspect and control Cozytouch heating devices",
    long_about = "Talks to the Cozytouch cloud, builds the device tree and exposes\n\
        heaters, water heaters and sensors as entities that can be listed,\n\
        watched and commanded.",
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
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "COZYTOUCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Account e-mail (overrides config)
    #[arg(long, short = 'u', global = true)]
    pub username: Option<String>,

    /// Account password (overrides config)
    #[arg(long, global = true, hide_env = true, env = "COZYTOUCH_PASSWORD")]
    pub password: Option<String>,

    /// API base URL (overrides config)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Request timeout in seconds (overrides config)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "COZYTOUCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
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

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List devices from one refresh of the account
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// List entities with their current properties
    #[command(alias = "ent", alias = "e")]
    Entities(EntitiesArgs),

    /// Keep refreshing and print every published snapshot
    Watch(WatchArgs),

    /// Invoke an entity command and print the reconciled state
    Call(CallArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct DevicesArgs {
    /// Only show one category (heater, water_heater, boiler, sensor, gateway)
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Also list nodes that were skipped as malformed
    #[arg(long)]
    pub diagnostics: bool,
}

#[derive(Debug, Args)]
pub struct EntitiesArgs {
    /// Only show one platform (climate, water_heater, switch, sensor, binary_sensor)
    #[arg(long, short = 'p')]
    pub platform: Option<String>,

    /// Show a single entity in detail
    pub entity: Option<String>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll interval in seconds (overrides config)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Print entity states after each snapshot
    #[arg(long, short = 'e')]
    pub entities: bool,
}

#[derive(Debug, Args)]
pub struct CallArgs {
    /// Entity id (`platform.unique_id`, or a unique id used by one platform)
    pub entity: String,

    /// Command name, e.g. set_hvac_mode or turn_away_mode_on
    pub command: String,

    /// Arguments as a JSON object, e.g. '{"hvac_mode": "heat"}'
    pub args: Option<String>,

    /// Return without waiting for the follow-up refresh
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
