/*!
`info.rs`

Implements the `info` subcommand: show one operation's descriptor and its
declared parameter schema.

Behavior:
  - Lookup is an exact identifier match against the catalog
  - The parameter schema is rendered the same way parse-only dispatch
    reports it

JSON Output Shape:
{
  "status": "ok",
  "operation": {
    "identifier": "op:blur",
    "title": "Gaussian Blur",
    "menu_root": "app",
    "menu": "Process > Blur",
    "headless": true
  },
  "params": { "identifier": "op:blur", "inputs": [ ... ], "outputs": [ ... ] }
}

JSON Error Output:
{
  "status":"error",
  "error":"message"
}
*/

use std::path::Path;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::adapter::InvocationAdapter;
use crate::cmd::shared::{describe_field, load_registry, output_error, print_json};
use crate::registry::OperationRegistry;

/// CLI arguments for `script-bridge info <NAME>`
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Operation identifier (exact match)
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

/// Entry point for the info subcommand.
pub fn execute_info(args: InfoArgs, catalog: Option<&Path>) -> Result<()> {
    let name = args.name.trim().to_string();
    if name.is_empty() {
        return output_error(args.json, "operation name cannot be empty");
    }

    let registry = match load_registry(catalog) {
        Ok(r) => r,
        Err(e) => return output_error(args.json, &e.to_string()),
    };
    let Some(op) = registry.find(&name) else {
        return output_error(args.json, &format!("unknown operation: {name}"));
    };
    let params = InvocationAdapter::new(op).job_params();

    if args.json {
        print_json(&json!({
            "status": "ok",
            "operation": {
                "identifier": op.identifier(),
                "title": op.title(),
                "menu_root": op.menu_root(),
                "menu": op.menu_path().join(" > "),
                "headless": op.can_run_headless(),
            },
            "params": params,
        }));
        return Ok(());
    }

    println!("{} - {}", name, op.title());
    let menu = op.menu_path().join(" > ");
    if !menu.is_empty() {
        println!("  menu: {menu} (root: {})", op.menu_root());
    }
    println!("  headless: {}", op.can_run_headless());
    println!("  inputs:");
    for field in &params.inputs {
        println!("    {}", describe_field(field));
    }
    if params.inputs.is_empty() {
        println!("    (none)");
    }
    println!("  outputs:");
    for field in &params.outputs {
        println!("    {}", describe_field(field));
    }
    if params.outputs.is_empty() {
        println!("    (none)");
    }
    Ok(())
}

/* ---- Tests (basic) ---- */
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CATALOG: &str = r#"{"operations": [{
        "identifier": "op:blur",
        "title": "Gaussian Blur",
        "menu_path": ["Process", "Blur"],
        "headless": true,
        "inputs": [{"name": "sigma", "type": "number", "default": 2.0}],
        "outputs": [{"name": "result", "type": "string"}]
    }]}"#;

    fn write_catalog(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("catalog.json");
        std::fs::write(&path, CATALOG).unwrap();
        path
    }

    #[test]
    fn info_reports_known_operation() {
        let dir = tempdir().unwrap();
        let path = write_catalog(dir.path());
        execute_info(
            InfoArgs {
                name: "op:blur".to_string(),
                json: true,
            },
            Some(&path),
        )
        .unwrap();
    }

    #[test]
    fn info_rejects_unknown_operation() {
        let dir = tempdir().unwrap();
        let path = write_catalog(dir.path());
        let err = execute_info(
            InfoArgs {
                name: "op:nope".to_string(),
                json: true,
            },
            Some(&path),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown operation"));
    }
}
