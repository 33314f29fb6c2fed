/*!
`serve.rs`

Implements the `serve` subcommand: run the relay as a long-lived server.

  adb-relay serve http [--host 127.0.0.1] [--port 8000]
  adb-relay serve mcp

Both transports share one `Relay`. For `mcp`, stdout carries the protocol,
so logs stay on stderr.
*/

use anyhow::Result;
use clap::{Args, ValueEnum};
use std::sync::Arc;

use adb_relay::config::Settings;
use adb_relay::{http, mcp};

use crate::cmd::shared::runtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// HTTP/JSON endpoints
    Http,
    /// MCP over stdin/stdout
    Mcp,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Transport to expose
    #[arg(value_enum)]
    pub transport: Transport,

    /// Listen host for `http` (default 127.0.0.1)
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Listen port for `http` (default 8000)
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,
}

pub fn execute_serve(args: ServeArgs, settings: Settings) -> Result<()> {
    let relay = Arc::new(settings.build_relay()?);
    let rt = runtime()?;
    match args.transport {
        Transport::Http => rt.block_on(http::serve(relay, settings.listen_addr())),
        Transport::Mcp => rt.block_on(mcp::serve_stdio(relay)),
    }
}
