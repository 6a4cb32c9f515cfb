//! CLI command implementations
//!
//! `serve` loads the config, reads the schema directory into the schema
//! exchange, mounts one echo operation per configured entry and runs the
//! HTTP server until it stops.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::codec::Value;
use crate::fingerprint::{Fingerprint, SchemaCache};
use crate::http_server::{avro_value_route, ApiError, HttpServer, HttpServerConfig, SchemaExchange};
use crate::observability::{Event, Logger, Severity};
use crate::schema::{canonical_form, parse_schema, SchemaLoader, SchemaNode};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP bind settings
    #[serde(default)]
    pub server: HttpServerConfig,

    /// Directory of `.avsc` files served by the schema exchange (default: "./schemas")
    #[serde(default = "default_schema_dir")]
    pub schema_dir: String,

    /// Minimum log severity (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Echo operations, each answering with its request
    #[serde(default)]
    pub operations: Vec<OperationConfig>,
}

/// An operation whose request and response share one schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationConfig {
    pub name: String,
    /// File stem of a schema in `schema_dir`
    pub schema: String,
}

fn default_schema_dir() -> String {
    "./schemas".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config file {}: {}", path.display(), e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Logger::info(
            Event::ConfigLoaded,
            &[
                ("path", &path.display().to_string()),
                ("operations", &config.operations.len().to_string()),
            ],
        );
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> CliResult<()> {
        if self.schema_dir.is_empty() {
            return Err(CliError::config_error("schema_dir must not be empty"));
        }

        self.severity()?;
        self.server.bind_addr().map_err(CliError::config_error)?;

        let mut seen = std::collections::HashSet::new();
        for op in &self.operations {
            if op.name.is_empty() || op.name.contains('/') {
                return Err(CliError::config_error(format!("Invalid operation name '{}'", op.name)));
            }
            if !seen.insert(op.name.as_str()) {
                return Err(CliError::config_error(format!("Duplicate operation '{}'", op.name)));
            }
        }

        Ok(())
    }

    pub fn severity(&self) -> CliResult<Severity> {
        Severity::parse(&self.log_level)
            .ok_or_else(|| CliError::config_error(format!("Invalid log_level '{}'", self.log_level)))
    }

    pub fn schema_path(&self) -> PathBuf {
        PathBuf::from(&self.schema_dir)
    }
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    let result = run_command(cli.command);
    if let Err(ref e) = result {
        write_error(e.code_str(), e.message())?;
    }
    result
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Fingerprint { schema } => fingerprint(&schema),
        Command::Canonical { schema } => canonical(&schema),
        Command::Register { schema, config } => register(&schema, &config),
        Command::Serve { config, port } => serve(&config, port),
    }
}

fn read_schema_file(path: &Path) -> CliResult<SchemaNode> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("Failed to read {}: {}", path.display(), e)))?;
    Ok(parse_schema(&text)?)
}

/// Print the fingerprint and canonical form of a schema file
pub fn fingerprint(path: &Path) -> CliResult<()> {
    let schema = read_schema_file(path)?;
    let canonical = canonical_form(&schema);
    write_response(json!({
        "fingerprint": Fingerprint::of_canonical(&canonical).to_hex(),
        "canonical": canonical,
    }))
}

/// Print the canonical form of a schema file
pub fn canonical(path: &Path) -> CliResult<()> {
    let schema = read_schema_file(path)?;
    write_response(json!({ "canonical": canonical_form(&schema) }))
}

/// Validate a schema file and store it in the configured schema directory
///
/// The stored file is keyed by the schema's name, or by the source file
/// stem for unnamed schemas.
pub fn register(path: &Path, config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let schema = read_schema_file(path)?;

    let name = match schema.name() {
        Some(name) => name.fullname(),
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| CliError::schema_error(format!("Cannot name schema from {}", path.display())))?,
    };

    let loader = SchemaLoader::new(&config.schema_path());
    let stored = loader.save_schema(&name, &schema)?;

    write_response(json!({
        "name": name,
        "path": stored.display().to_string(),
        "fingerprint": Fingerprint::of(&schema).to_hex(),
    }))
}

/// Build the server for a config without binding
pub fn build_server(config: &Config) -> CliResult<HttpServer> {
    let mut loader = SchemaLoader::new(&config.schema_path());
    let count = loader.load_all()?;
    Logger::info(
        Event::SchemasLoaded,
        &[("dir", &config.schema_dir), ("count", &count.to_string())],
    );

    let exchange = Arc::new(SchemaExchange::new(Arc::new(SchemaCache::new())));
    for (name, schema) in loader.all_schemas() {
        exchange
            .cache()
            .register(schema.clone())
            .map_err(|e| CliError::schema_error(format!("Schema '{}': {}", name, e)))?;
    }

    let mut operations = Router::new();
    for op in &config.operations {
        let schema = loader
            .get(&op.schema)
            .ok_or_else(|| {
                CliError::config_error(format!("Operation '{}' names unknown schema '{}'", op.name, op.schema))
            })?
            .clone();
        let route = avro_value_route(Arc::clone(&exchange), &op.name, Some(schema.clone()), schema, |value: Value| async move {
            Ok::<_, ApiError>(value)
        })
        .map_err(|e| CliError::config_error(format!("Operation '{}': {}", op.name, e)))?;
        operations = operations.route(&format!("/{}", op.name), route);
    }

    Ok(HttpServer::new(config.server.clone(), exchange).with_operations(operations))
}

/// Start the HTTP server
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let mut config = Config::load(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }
    Logger::set_min_severity(config.severity()?);

    let server = build_server(&config)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}
