/*!
`generate.rs`

Implements the `generate` subcommand: write one stub script per eligible
catalog operation into a target directory tree.

Behavior:
  - DIR must already exist; it is validated before any stub is written
  - By default only headless-capable operations get stubs; --all includes
    the rest
  - Start and end timestamps go to stderr so stdout stays parseable
  - The first per-operation failure aborts the remaining batch

JSON Success Output:
{
  "status": "ok",
  "dir": "/path/to/stubs",
  "stubs": 12,
  "elapsed_ms": 8
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

use crate::cmd::shared::{load_registry, output_error, print_json};
use crate::stubgen;
use crate::utils::logging::{self, LogLevel};

/* ---- Argument Struct ---- */

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Directory that receives the generated stub tree
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Include operations that cannot run headless
    #[arg(long)]
    pub all: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

/* ---- Public Entry Point ---- */

pub fn execute_generate(args: GenerateArgs, catalog: Option<&Path>) -> Result<()> {
    let registry = match load_registry(catalog) {
        Ok(r) => r,
        Err(e) => return output_error(args.json, &e.to_string()),
    };

    // The catalog walk debug-logs every skipped operation; drop to warn
    // unless the user raised verbosity.
    if logging::current_log_level() == LogLevel::Info {
        logging::set_log_level(LogLevel::Warn);
    }

    eprintln!(
        "{}: generating stubs into {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        args.dir.display()
    );
    let started = Instant::now();
    let result = stubgen::generate_all(&registry, &args.dir, !args.all);
    let elapsed_ms = started.elapsed().as_millis();
    eprintln!(
        "{}: done ({elapsed_ms} ms)",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    match result {
        Ok(count) => {
            if args.json {
                print_json(&json!({
                    "status": "ok",
                    "dir": args.dir.display().to_string(),
                    "stubs": count,
                    "elapsed_ms": elapsed_ms,
                }));
            } else {
                println!("Generated {count} stubs under {}", args.dir.display());
            }
            Ok(())
        }
        Err(e) => output_error(args.json, &e.to_string()),
    }
}

/* ---- Tests (basic) ---- */
