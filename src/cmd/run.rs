/*!
`run.rs`

Implements the `run` subcommand: dispatch one registered operation against
the execution host.

Current Capabilities:
  - Application-command hosts (operation spawned headlessly per invocation)
  - Parameter injection via:
      --param KEY=VALUE               (repeatable)
      --param-file params.(json|yaml) (merged; CLI --param overrides file entries)
  - Parse-only mode: when the session property `scripts.parse` is set, the
    declared parameter schema is reported and nothing executes
  - JSON or human-readable output

Not Yet Implemented:
  - Gateway (http/ws) transports; session creation against them fails cleanly
  - Timeout / cancellation knobs

JSON Success Output (executed):
{
  "status": "ok",
  "command": "op:blur",
  "target": "app: imaging-app",
  "elapsed_ms": 42,
  "outputs": { ... }
}

JSON Success Output (parse-only):
{
  "status": "ok",
  "command": "op:blur",
  "target": "app: imaging-app",
  "elapsed_ms": 3,
  "params": { "identifier": "...", "inputs": [ ... ], "outputs": [ ... ] }
}

JSON Error Output:
{
  "status":"error",
  "error":"message"
}
*/

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::bridge::{self, Dispatch};
use crate::cmd::shared::{
    collect_params, describe_field, display_value, load_registry, output_error, print_json,
    resolve_host,
};
use crate::log_debug;
use crate::session::host_from_spec;

/* ---- Argument Struct ---- */

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Command identifier to invoke
    #[arg(value_name = "COMMAND")]
    pub command: String,

    /// Provide parameter (KEY=VALUE), repeatable
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Load parameters from file (JSON or YAML). CLI --param overrides file entries
    #[arg(long = "param-file", value_name = "PATH")]
    pub param_file: Option<PathBuf>,

    /// Execution host (application command or gateway URL). Falls back to SCRIPT_BRIDGE_HOST env.
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

/* ---- Public Entry Point ---- */

pub fn execute_run(args: RunArgs, catalog: Option<&Path>) -> Result<()> {
    let command = args.command.trim().to_string();
    if command.is_empty() {
        return output_error(args.json, "command identifier cannot be empty");
    }

    let registry = match load_registry(catalog) {
        Ok(r) => r,
        Err(e) => return output_error(args.json, &e.to_string()),
    };
    let spec = match resolve_host(args.host.as_deref()) {
        Ok(s) => s,
        Err(e) => return output_error(args.json, &e.to_string()),
    };
    let provided = match collect_params(&args.params, args.param_file.as_deref()) {
        Ok(p) => p,
        Err(e) => return output_error(args.json, &e.to_string()),
    };

    let target = spec.to_string();
    log_debug!("run {command} against {target}");
    let host = host_from_spec(spec);

    let started = Instant::now();
    let result = bridge::invoke(&registry, host.as_ref(), &command, &provided);
    let elapsed_ms = started.elapsed().as_millis();

    match result {
        Ok(Dispatch::Params(params)) => {
            if args.json {
                print_json(&json!({
                    "status": "ok",
                    "command": command,
                    "target": target,
                    "elapsed_ms": elapsed_ms,
                    "params": params,
                }));
            } else {
                println!("Declared parameters for {command}:");
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
            }
        }
        Ok(Dispatch::Completed(outputs)) => {
            if args.json {
                print_json(&json!({
                    "status": "ok",
                    "command": command,
                    "target": target,
                    "elapsed_ms": elapsed_ms,
                    "outputs": outputs,
                }));
            } else {
                println!("Completed {command} in {elapsed_ms} ms");
                if outputs.is_empty() {
                    println!("  (no outputs)");
                } else {
                    for (name, value) in &outputs {
                        println!("  {name} = {}", display_value(value));
                    }
                }
            }
        }
        Err(e) => return output_error(args.json, &e.to_string()),
    }

    Ok(())
}

/* ---- Tests (basic) ---- */
