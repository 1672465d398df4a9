//! Clap derive structures for the `tundash` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

use tundash_core::LogLevel;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tundash -- manage phantun tunnel instances through their dashboard
#[derive(Debug, Parser)]
#[command(
    name = "tundash",
    version,
    about = "Manage phantun tunnel instances from the command line",
    long_about = "Edit tunnel configuration, watch process status and follow logs \
        of a phantun dashboard backend.",
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
    /// Dashboard profile to use
    #[arg(long, short = 'p', env = "TUNDASH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Dashboard URL (overrides profile)
    #[arg(long, short = 'u', env = "TUNDASH_URL", global = true)]
    pub url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TUNDASH_OUTPUT",
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

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "TUNDASH_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "TUNDASH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
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

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage tunnel instances
    #[command(alias = "inst", alias = "i")]
    Instances(InstancesArgs),

    /// Show or change service-wide settings
    General(GeneralArgs),

    /// Show process status of every instance
    #[command(alias = "st")]
    Status,

    /// Show binary, interface and firewall diagnostics
    #[command(alias = "diag")]
    Diagnostics,

    /// Show the tunnel topology
    #[command(alias = "topo")]
    Topology,

    /// Show or follow the process log stream
    Logs(LogsArgs),

    /// Re-apply the configuration on the backend
    Restart,

    /// Replace the remote configuration with an empty one
    Reset,

    /// List firewall rules installed for the tunnels
    #[command(alias = "fw")]
    Firewall,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

impl Command {
    /// Whether the user asked to save an edit without restarting the service.
    pub fn skips_restart(&self) -> bool {
        match self {
            Self::Instances(args) => matches!(
                args.command,
                InstancesCommand::Enable { no_restart: true, .. }
                    | InstancesCommand::Disable { no_restart: true, .. }
                    | InstancesCommand::Toggle { no_restart: true, .. }
            ),
            Self::General(args) => args.no_restart,
            _ => false,
        }
    }
}

// ── Instances ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct InstancesArgs {
    #[command(subcommand)]
    pub command: InstancesCommand,
}

#[derive(Debug, Subcommand)]
pub enum InstancesCommand {
    /// List configured instances with their status
    #[command(alias = "ls")]
    List,

    /// Show one instance
    Get { id: String },

    /// Add a client or server instance
    Add(AddArgs),

    /// Change fields of an instance
    Update {
        id: String,
        #[command(flatten)]
        fields: InstanceFields,
    },

    /// Remove an instance
    #[command(alias = "rm")]
    Remove { id: String },

    /// Enable an instance
    Enable {
        id: String,
        /// Do not restart the service afterwards
        #[arg(long)]
        no_restart: bool,
    },

    /// Disable an instance
    Disable {
        id: String,
        /// Do not restart the service afterwards
        #[arg(long)]
        no_restart: bool,
    },

    /// Flip the enabled flag of an instance
    Toggle {
        id: String,
        /// Do not restart the service afterwards
        #[arg(long)]
        no_restart: bool,
    },
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[command(subcommand)]
    pub variant: AddVariant,
}

#[derive(Debug, Subcommand)]
pub enum AddVariant {
    /// Add a client instance
    Client(NewInstanceArgs),
    /// Add a server instance
    Server(NewInstanceArgs),
}

#[derive(Debug, Args)]
pub struct NewInstanceArgs {
    /// Explicit instance id (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,

    /// Create the instance disabled
    #[arg(long)]
    pub disabled: bool,

    #[command(flatten)]
    pub fields: InstanceFields,
}

/// Instance fields shared by `add` and `update`.
#[derive(Debug, Default, Args)]
pub struct InstanceFields {
    /// Display name
    #[arg(long)]
    pub alias: Option<String>,

    /// Local listen address (clients only)
    #[arg(long)]
    pub local_addr: Option<String>,

    /// Local listen port
    #[arg(long)]
    pub local_port: Option<u16>,

    /// Remote host
    #[arg(long)]
    pub remote_addr: Option<String>,

    /// Remote port
    #[arg(long)]
    pub remote_port: Option<u16>,

    /// Tunnel local address
    #[arg(long)]
    pub tun_local: Option<String>,

    /// Tunnel peer address
    #[arg(long)]
    pub tun_peer: Option<String>,

    /// TUN interface name
    #[arg(long)]
    pub tun_name: Option<String>,

    /// Tunnel local IPv6 address
    #[arg(long)]
    pub tun_local_ipv6: Option<String>,

    /// Tunnel peer IPv6 address
    #[arg(long)]
    pub tun_peer_ipv6: Option<String>,

    /// Handshake packet file
    #[arg(long)]
    pub handshake_file: Option<String>,

    /// Only use IPv4
    #[arg(long)]
    pub ipv4_only: Option<bool>,
}

// ── General ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GeneralArgs {
    /// Turn the service on
    #[arg(long, conflicts_with = "disable")]
    pub enable: bool,

    /// Turn the service off
    #[arg(long)]
    pub disable: bool,

    /// Backend log level (info, debug, error, ...)
    #[arg(long)]
    pub log_level: Option<LogLevel>,

    /// Do not restart the service after switching it
    #[arg(long)]
    pub no_restart: bool,
}

// ── Logs ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Keep streaming until interrupted
    #[arg(long, short = 'f')]
    pub follow: bool,

    /// Number of buffered lines to show
    #[arg(long, short = 'n', default_value = "100")]
    pub tail: usize,

    /// Only show lines from this instance
    #[arg(long)]
    pub source: Option<String>,

    /// Milliseconds without new lines before the backlog is considered read
    #[arg(long, default_value = "750", hide = true)]
    pub settle_ms: u64,

    /// Upper bound on reading the backlog, for tunnels that never go quiet
    #[arg(long, default_value = "5000", hide = true)]
    pub max_wait_ms: u64,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use { name: String },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
