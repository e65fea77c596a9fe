//! CLI definition using clap derive.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tabsweep", about = "stale editor tab sweeper")]
pub struct Cli {
    /// UDS socket path (default: $XDG_RUNTIME_DIR/tabsweep/tabsweepd.sock)
    #[arg(long, short = 's', global = true)]
    pub socket_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the daemon (tick loop + UDS server)
    Daemon(DaemonOpts),
    /// Close unused tabs now (threshold forced to zero)
    Sweep,
    /// Activate sweeping in the current workspace
    Activate,
    /// Deactivate sweeping in the current workspace
    Deactivate,
    /// Show daemon status
    Status(StatusOpts),
}

#[derive(clap::Args)]
pub struct DaemonOpts {
    /// Timer tick interval in minutes
    #[arg(long, default_value = "1")]
    pub tick_interval_minutes: u64,

    /// Settings file path
    #[arg(long, env = "TABSWEEP_SETTINGS")]
    pub settings_path: Option<String>,
}

#[derive(clap::Args, Default)]
pub struct StatusOpts {
    /// Machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Default socket path using $USER for per-user isolation.
pub fn default_socket_path() -> String {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        return format!("{dir}/tabsweep/tabsweepd.sock");
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    format!("/tmp/tabsweep-{user}/tabsweepd.sock")
}

/// Default settings file path under the user config directory.
pub fn default_settings_path() -> String {
    if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
        return format!("{dir}/tabsweep/settings.json");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.config/tabsweep/settings.json")
}
