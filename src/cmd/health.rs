/*!
`health.rs`

Implements the `health` subcommand: the same probe `GET /health` serves,
run once from the CLI.

Exits non-zero when the bridge cannot be run or no device is ready, so it
can gate scripts (`adb-relay health && adb-relay exec ...`).
*/

use anyhow::{Result, bail};
use clap::Args;

use adb_relay::config::Settings;

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji, table};
use crate::cmd::shared::runtime;

#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute_health(args: HealthArgs, settings: Settings) -> Result<()> {
    let relay = settings.build_relay()?;
    let health = runtime()?.block_on(relay.health());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&health)?);
    } else {
        let style = StyleOptions::detect();
        let (tag, role) = if health.device_reachable {
            ("success", Role::Success)
        } else {
            ("warn", Role::Warning)
        };
        println!(
            "{}",
            box_header(
                format!("{} Relay Health", emoji(tag, &style)),
                Some(format!("bridge={}", settings.bridge)),
                &style,
            )
        );
        println!(
            "bridge available: {}",
            color(role, yes_no(health.bridge_available), &style)
        );
        println!(
            "device reachable: {}",
            color(role, yes_no(health.device_reachable), &style)
        );
        if let Some(detail) = &health.detail {
            println!("{}", color(Role::Dim, detail, &style));
        }
        if !health.devices.is_empty() {
            let rows: Vec<Vec<String>> = health
                .devices
                .iter()
                .map(|d| vec![d.serial.clone(), d.state.clone()])
                .collect();
            println!(
                "\n{} {}",
                emoji("device", &style),
                color(Role::Accent, "Devices:", &style)
            );
            println!("{}", table(&["SERIAL", "STATE"], &rows, &style));
        }
    }

    if !health.bridge_available {
        bail!("bridge '{}' is not usable", settings.bridge);
    }
    if !health.device_reachable {
        bail!("no device in 'device' state");
    }
    Ok(())
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}
