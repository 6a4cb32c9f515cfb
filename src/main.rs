//! avrogate CLI entry point
//!
//! Parses arguments, dispatches to the CLI module and exits non-zero on
//! failure.

use avrogate::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
