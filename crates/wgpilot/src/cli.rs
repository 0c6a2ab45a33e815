//! Clap derive structures for the `wgpilot` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// wgpilot -- manage WireGuard peers on a wg-easy style server
#[derive(Debug, Parser)]
#[command(
    name = "wgpilot",
    version,
    about = "Manage WireGuard peers on a wg-easy style server",
    long_about = "Manage WireGuard peers on a wg-easy style server.\n\n\
        The login encoding is discovered automatically and the session is\n\
        cached (credential in the OS keyring) until logout or expiry.",
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
    /// Server URL (overrides config and cached session)
    #[arg(long, short = 's', env = "WGPILOT_SERVER", global = true)]
    pub server: Option<String>,

    /// Server password
    #[arg(long, env = "WGPILOT_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "WGPILOT_OUTPUT",
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

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Keep the session in memory only (nothing written to disk or keyring)
    #[arg(long, global = true)]
    pub ephemeral: bool,
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
    /// Log in, discovering the login encoding the server accepts
    Login,

    /// End the session and forget the remembered password
    Logout,

    /// Show the cached session
    Status {
        /// Also confirm with the server that the session is still accepted
        #[arg(long)]
        verify: bool,
    },

    /// Show server version and session status
    Info,

    /// Manage peers
    #[command(alias = "p")]
    Peers(PeersArgs),

    /// Live peer view, refreshed in the background
    #[command(alias = "w")]
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
pub struct PeersArgs {
    #[command(subcommand)]
    pub command: PeersCommand,
}

#[derive(Debug, Subcommand)]
pub enum PeersCommand {
    /// List peers with online status and traffic
    #[command(alias = "ls")]
    List {
        /// Only peers that are online now
        #[arg(long)]
        online: bool,

        /// Keep refreshing (every list_refresh_secs from config)
        #[arg(long, short = 'f', conflicts_with = "online")]
        follow: bool,
    },

    /// Show aggregate statistics
    Stats,

    /// Create a peer
    Create {
        /// Peer name
        name: String,
    },

    /// Delete a peer
    #[command(alias = "rm")]
    Delete {
        /// Peer id or name
        peer: String,
    },

    /// Enable a peer
    Enable {
        /// Peer id or name
        peer: String,
    },

    /// Disable a peer
    Disable {
        /// Peer id or name
        peer: String,
    },

    /// Print a peer's WireGuard configuration
    Config {
        /// Peer id or name
        peer: String,
    },
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between refreshes (default: poll_interval_secs from config)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Exit after this many snapshots
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}
