/*!
Subcommand dispatcher.

Layout:
  src/cmd/
    mod.rs     (this file: declarations + re-exports)
    list.rs    (ListArgs   + execute_list)
    get.rs     (GetArgs    + execute_get)
    exec.rs    (ExecArgs   + execute_exec)
    health.rs  (HealthArgs + execute_health)
    serve.rs   (ServeArgs  + execute_serve)
    shared.rs  (--param parsing, type coercion, param files, runtime)
    format.rs  (human-readable output helpers)

Conventions:
  - Each subcommand module exposes exactly one public `execute_*` function
    returning `anyhow::Result<()>`.
  - Argument structs derive `clap::Args`.
  - JSON output goes to stdout; logs go to stderr.
*/

pub mod exec;
pub mod format;
pub mod get;
pub mod health;
pub mod list;
pub mod serve;
pub mod shared;

pub use exec::{ExecArgs, execute_exec};
pub use get::{GetArgs, execute_get};
pub use health::{HealthArgs, execute_health};
pub use list::{ListArgs, execute_list};
pub use serve::{ServeArgs, execute_serve};
