//! Schema loader for reading schema files from disk at startup
//!
//! - One schema per file, `<name>.avsc` or `<name>.json`
//! - Files are keyed by file stem
//! - A malformed file fails the whole load

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::errors::{SchemaError, SchemaResult};
use super::parser::parse_schema;
use super::types::SchemaNode;

/// Schema loader that reads schema files and keeps them in memory.
pub struct SchemaLoader {
    schema_dir: PathBuf,
    schemas: BTreeMap<String, SchemaNode>,
}

impl SchemaLoader {
    pub fn new(schema_dir: &Path) -> Self {
        Self {
            schema_dir: schema_dir.to_path_buf(),
            schemas: BTreeMap::new(),
        }
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Loads every schema file in the directory, returning how many were read.
    ///
    /// A missing directory holds no schemas.
    pub fn load_all(&mut self) -> SchemaResult<usize> {
        if !self.schema_dir.exists() {
            return Ok(0);
        }

        let dir = self.schema_dir.display().to_string();
        let entries = fs::read_dir(&self.schema_dir)
            .map_err(|e| SchemaError::load(&dir, format!("failed to read directory: {}", e)))?;

        let mut loaded = 0;
        for entry in entries {
            let path = entry
                .map_err(|e| SchemaError::load(&dir, format!("failed to read directory entry: {}", e)))?
                .path();

            let is_schema = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "avsc" || ext == "json");
            if !is_schema {
                continue;
            }

            self.load_schema_file(&path)?;
            loaded += 1;
        }

        Ok(loaded)
    }

    fn load_schema_file(&mut self, path: &Path) -> SchemaResult<()> {
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| SchemaError::load(&display, format!("failed to read file: {}", e)))?;
        let schema = parse_schema(&content).map_err(|e| SchemaError::load(&display, e.to_string()))?;

        let key = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.schemas.insert(key, schema);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.schemas.get(name)
    }

    /// Returns all loaded schemas with their file stems.
    pub fn all_schemas(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.schemas.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Writes a schema to `<dir>/<name>.avsc` in full form.
    ///
    /// Existing files are never overwritten.
    pub fn save_schema(&self, name: &str, schema: &SchemaNode) -> SchemaResult<PathBuf> {
        let path = self.schema_dir.join(format!("{}.avsc", name));
        let display = path.display().to_string();

        if path.exists() {
            return Err(SchemaError::load(&display, "file already exists"));
        }

        fs::create_dir_all(&self.schema_dir).map_err(|e| {
            SchemaError::load(self.schema_dir.display().to_string(), format!("failed to create directory: {}", e))
        })?;

        let content = serde_json::to_string_pretty(&schema.to_json()?)?;
        fs::write(&path, content).map_err(|e| SchemaError::load(&display, format!("failed to write file: {}", e)))?;

        Ok(path)
    }
}
