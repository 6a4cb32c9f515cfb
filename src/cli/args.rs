//! CLI argument definitions using clap
//!
//! Commands:
//! - avrogate fingerprint <schema-file>
//! - avrogate canonical <schema-file>
//! - avrogate register <schema-file> --config <path>
//! - avrogate serve --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// avrogate - schema-negotiated Avro single-object encoding over HTTP
#[derive(Parser, Debug)]
#[command(name = "avrogate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the fingerprint of a schema file
    Fingerprint {
        /// Schema file (.avsc or .json)
        schema: PathBuf,
    },

    /// Print the canonical form of a schema file
    Canonical {
        /// Schema file (.avsc or .json)
        schema: PathBuf,
    },

    /// Validate a schema file and copy it into the schema directory
    Register {
        /// Schema file (.avsc or .json)
        schema: PathBuf,

        /// Path to configuration file
        #[arg(long, default_value = "./avrogate.json")]
        config: PathBuf,
    },

    /// Serve the schema exchange and the configured operations
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./avrogate.json")]
        config: PathBuf,

        /// Port override
        #[arg(long)]
        port: Option<u16>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
