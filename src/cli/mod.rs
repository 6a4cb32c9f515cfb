//! CLI module for avrogate
//!
//! Provides command-line interface for:
//! - fingerprint: Print a schema's fingerprint
//! - canonical: Print a schema's canonical form
//! - register: Store a schema file in the schema directory
//! - serve: Run the schema exchange and configured operations

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{build_server, canonical, fingerprint, register, run, run_command, serve, Config, OperationConfig};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
