//! adb-relay: a fixed table of Android device controls exposed over HTTP/JSON
//! and MCP, each request mapped to exactly one `adb` invocation.
//!
//! Layering (leaf first):
//!   registry  -> command specs (schema + argv template)
//!   validate  -> untyped params to `ValidatedArgs`
//!   bridge    -> bounded, argv-only subprocess execution
//!   relay     -> lookup/validate/execute/classify, transport-agnostic
//!   http, mcp -> thin transport bindings over `Relay`

pub mod bridge;
pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod registry;
pub mod relay;
pub mod utils;
pub mod validate;

pub use error::{ErrorKind, RelayError, ValidationError};
pub use registry::{CommandSpec, Registry};
pub use relay::{Health, Relay, Reply};
pub use validate::{ValidatedArgs, validate};
