//! `KEY=VALUE` instruction files that tell each stage where to read and write.
//!
//! Keys are case-insensitive. Values given on the command line override the
//! file through [`Instructions::set`]; required values are checked when a
//! stage config is built, before any input is opened.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const READ: &str = "LEIA";
pub const WRITE: &str = "ESCREVA";
pub const MODEL: &str = "MODELO";
pub const QUERIES: &str = "CONSULTAS";
pub const RESULTS: &str = "RESULTADOS";
pub const EXPECTED: &str = "ESPERADOS";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instructions {
    entries: Vec<(String, String)>,
}

impl Instructions {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound { path: path.to_path_buf() },
            _ => Error::Io(e),
        })?;
        let instructions = Self::parse(&text)?;
        tracing::info!(path = %path.display(), entries = instructions.entries.len(), "configuration read");
        Ok(instructions)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("line {} is not KEY=VALUE: {line}", idx + 1)))?;
            entries.push((key.trim().to_uppercase(), value.trim().to_string()));
        }
        Ok(Self { entries })
    }

    /// Loads `path` when given, otherwise starts empty.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map(Self::load).transpose().map(Option::unwrap_or_default)
    }

    /// Replaces every value of `key` when `value` is present.
    pub fn set(&mut self, key: &str, value: Option<impl Into<String>>) -> &mut Self {
        if let Some(value) = value {
            self.entries.retain(|(k, _)| k != key);
            self.entries.push((key.to_string(), value.into()));
        }
        self
    }

    /// Replaces every value of `key` with `values` unless `values` is empty.
    pub fn set_all(&mut self, key: &str, values: Vec<String>) -> &mut Self {
        if !values.is_empty() {
            self.entries.retain(|(k, _)| k != key);
            self.entries.extend(values.into_iter().map(|v| (key.to_string(), v)));
        }
        self
    }

    /// Last value of `key`, ignoring empty values.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    pub fn all(&self, key: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn require(&self, key: &str) -> Result<PathBuf> {
        self.get(key)
            .map(PathBuf::from)
            .ok_or_else(|| Error::Config(format!("missing required instruction {key}")))
    }
}

/// Document ingestion: XML collections → inverted-list file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvertConfig {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
}

impl InvertConfig {
    pub fn from_instructions(ins: &Instructions) -> Result<Self> {
        let inputs: Vec<PathBuf> = ins.all(READ).into_iter().map(PathBuf::from).collect();
        if inputs.is_empty() {
            return Err(Error::Config(format!("missing required instruction {READ}")));
        }
        Ok(Self { inputs, output: ins.require(WRITE)? })
    }
}

/// Query ingestion: XML queries → query-set file and expected-results file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    pub input: PathBuf,
    pub queries: PathBuf,
    pub expected: PathBuf,
}

impl QueryConfig {
    pub fn from_instructions(ins: &Instructions) -> Result<Self> {
        Ok(Self { input: ins.require(READ)?, queries: ins.require(QUERIES)?, expected: ins.require(EXPECTED)? })
    }
}

/// Indexer: inverted-list file → model artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl IndexConfig {
    pub fn from_instructions(ins: &Instructions) -> Result<Self> {
        Ok(Self { input: ins.require(READ)?, output: ins.require(WRITE)? })
    }
}

/// Retriever: model + query-set file → ranked-result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub model: PathBuf,
    pub queries: PathBuf,
    pub results: PathBuf,
}

impl SearchConfig {
    pub fn from_instructions(ins: &Instructions) -> Result<Self> {
        Ok(Self { model: ins.require(MODEL)?, queries: ins.require(QUERIES)?, results: ins.require(RESULTS)? })
    }
}
