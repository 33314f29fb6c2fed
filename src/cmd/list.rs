/*!
`list.rs`

Implements the `list` subcommand: enumerate the built-in command table.

No bridge or device is needed; the table is static.

JSON Output Shape:
{
  "status": "ok",
  "count": 14,
  "commands": [
    { "name": "tap", "description": "...", "params": "x:integer, y:integer, device?:string" }
  ]
}
*/

use anyhow::Result;
use clap::Args;

use adb_relay::Registry;

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji, table, truncate_ellipsis};

/// CLI arguments for `adb-relay list`
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

pub fn execute_list(args: ListArgs) -> Result<()> {
    let registry = Registry::builtin();

    if args.json {
        let items: Vec<_> = registry
            .iter()
            .map(|c| {
                serde_json::json!({
                    "name": c.name,
                    "description": c.description,
                    "params": c.param_summary(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "count": registry.len(),
                "commands": items,
            })
        );
        return Ok(());
    }

    let style = StyleOptions::detect();
    println!(
        "{}",
        box_header(
            format!("{} Commands ({})", emoji("list", &style), registry.len()),
            None::<&str>,
            &style,
        )
    );

    let rows: Vec<Vec<String>> = registry
        .iter()
        .enumerate()
        .map(|(idx, c)| {
            vec![
                (idx + 1).to_string(),
                c.name.to_string(),
                c.param_summary(),
                truncate_ellipsis(c.description, 90),
            ]
        })
        .collect();
    println!("{}", table(&["#", "NAME", "PARAMS", "DESCRIPTION"], &rows, &style));

    println!(
        "\n{} {}",
        emoji("info", &style),
        color(
            Role::Dim,
            "Use `adb-relay get <name>` for a command's parameters and schema",
            &style
        )
    );
    Ok(())
}
