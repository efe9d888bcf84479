/*!
`list.rs`

Implements the `list` subcommand: enumerate the operations in the catalog.

Behavior:
  - Catalog comes from --catalog or the SCRIPT_BRIDGE_CATALOG env fallback
  - Each row shows identifier, title, menu placement, and flags
    (headless / stub eligibility)
  - JSON or human-readable output

JSON Output Shape:
{
  "status": "ok",
  "count": 2,
  "operations": [
    {
      "identifier": "op:blur",
      "title": "Gaussian Blur",
      "menu_root": "app",
      "menu": "Process > Blur",
      "headless": true,
      "eligible": true
    }
  ]
}
*/

use std::path::Path;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::cmd::shared::{load_registry, output_error, print_json};
use crate::registry::{OperationInfo, OperationRegistry};
use crate::stubgen;

/// CLI arguments for `script-bridge list`
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

/// Entry point for the list subcommand.
pub fn execute_list(args: ListArgs, catalog: Option<&Path>) -> Result<()> {
    let registry = match load_registry(catalog) {
        Ok(r) => r,
        Err(e) => return output_error(args.json, &e.to_string()),
    };
    let ops = registry.operations();

    if args.json {
        let items: Vec<serde_json::Value> = ops.iter().map(|op| operation_row(*op)).collect();
        print_json(&json!({
            "status": "ok",
            "count": items.len(),
            "operations": items,
        }));
        return Ok(());
    }

    println!("Operations ({})", ops.len());
    for op in &ops {
        let mut flags = Vec::new();
        if op.can_run_headless() {
            flags.push("headless");
        }
        if stubgen::is_eligible(*op, true) {
            flags.push("eligible");
        }
        println!(
            "  {:<28} {:<24} {:<32} {}",
            op.identifier().unwrap_or("-"),
            op.title(),
            op.menu_path().join(" > "),
            flags.join(",")
        );
    }
    if !ops.is_empty() {
        println!("\nUse `script-bridge info <name>` for one operation's parameters");
    }
    Ok(())
}

/// One JSON row for an operation.
fn operation_row(op: &dyn OperationInfo) -> serde_json::Value {
    json!({
        "identifier": op.identifier(),
        "title": op.title(),
        "menu_root": op.menu_root(),
        "menu": op.menu_path().join(" > "),
        "headless": op.can_run_headless(),
        "eligible": stubgen::is_eligible(op, true),
    })
}
