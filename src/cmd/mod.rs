/*!
Command layer: one module per subcommand plus shared helpers.

Directory Layout:
  src/cmd/
    mod.rs       (this file: module declarations + re-exports)
    run.rs       (RunArgs      + execute_run)
    generate.rs  (GenerateArgs + execute_generate)
    list.rs      (ListArgs     + execute_list)
    info.rs      (InfoArgs     + execute_info)
    shared.rs    (catalog/host resolution, parameter collection, output helpers)

Conventions:
  - Each subcommand module exposes exactly one public `execute_*` function
    that returns `anyhow::Result<()>` and takes the globally resolved
    catalog path as its second argument.
  - Argument structs derive `clap::Args` and are kept minimal.
  - Anything reused by two subcommands lives in `shared.rs`.
*/

pub mod generate;
pub mod info;
pub mod list;
pub mod run;
pub mod shared;

pub use generate::{GenerateArgs, execute_generate};
pub use info::{InfoArgs, execute_info};
pub use list::{ListArgs, execute_list};
pub use run::{RunArgs, execute_run};
