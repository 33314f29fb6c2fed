use anyhow::Result;
use clap::{Parser, Subcommand};

use adb_relay::config::{Overrides, Settings};
use adb_relay::utils;

mod cmd;

use cmd::{ExecArgs, GetArgs, HealthArgs, ListArgs, ServeArgs};

/// ADB Relay - a fixed set of Android device controls behind HTTP and MCP.
///
/// Command layout:
///   adb-relay list [--json]
///   adb-relay get  <COMMAND> [--json]
///   adb-relay exec <COMMAND> [--param k=v ...] [--param-file f] [--json]
///   adb-relay health [--json]
///   adb-relay serve <http|mcp> [--host H] [--port P]
///
/// Global flags / env:
///   -v / -vv            Increase verbosity (logs go to stderr)
///   -q / --quiet        Errors only
///   -c / --config       JSON or YAML config file
///   --bridge            Bridge command line (or ADB_RELAY_BRIDGE), default "adb"
///   --timeout-ms        Per-invocation timeout, default 10000
///   -s / --device       Default device serial (or ADB_RELAY_DEVICE)
///
/// Examples:
///   adb-relay exec tap --param x=540 --param y=1350
///   adb-relay exec type_text --param "text=hello world" --json
///   adb-relay serve http --port 8000
///   adb-relay serve mcp
#[derive(Parser, Debug)]
#[command(
    name = "adb-relay",
    version,
    author,
    about = "ADB Relay - relay Android device controls over HTTP and MCP",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error logging
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file (JSON, or YAML by .yaml/.yml extension)
    #[arg(short = 'c', long = "config", global = true, value_name = "PATH")]
    config: Option<String>,

    /// Bridge command line, e.g. "adb" or "adb -P 5038"
    #[arg(long, global = true, value_name = "CMD")]
    bridge: Option<String>,

    /// Per-invocation timeout in milliseconds
    #[arg(long = "timeout-ms", global = true, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Default device serial when a request names none
    #[arg(short = 's', long, global = true, value_name = "SERIAL")]
    device: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List supported commands
    List(ListArgs),

    /// Show one command's parameters and schema
    Get(GetArgs),

    /// Run a single command against the device
    Exec(ExecArgs),

    /// Report bridge and device reachability
    Health(HealthArgs),

    /// Serve the relay over HTTP or MCP (stdio)
    Serve(ServeArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    let overrides = Overrides {
        bridge: cli.bridge.clone(),
        timeout_ms: cli.timeout_ms,
        device: cli.device.clone(),
        host: None,
        port: None,
    };
    let config = cli.config.as_deref();

    match cli.command {
        Commands::List(args) => cmd::execute_list(args),
        Commands::Get(args) => cmd::execute_get(args),
        Commands::Exec(args) => cmd::execute_exec(args, Settings::load(overrides, config)?),
        Commands::Health(args) => cmd::execute_health(args, Settings::load(overrides, config)?),
        Commands::Serve(mut args) => {
            let with_listen = Overrides {
                host: args.host.take(),
                port: args.port.take(),
                ..overrides
            };
            cmd::execute_serve(args, Settings::load(with_listen, config)?)
        }
    }
}
