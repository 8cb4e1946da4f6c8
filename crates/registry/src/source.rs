//! Workflow definition sources.
//!
//! A source maps workflow names to raw documents. The registry owns parsing and
//! validation; sources only locate and read bytes.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::RwLock,
};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::RegistryError;

/// Serialization format of a workflow document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    #[default]
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Picks the format from a file extension; anything but `json` is YAML.
    pub fn from_extension(extension: Option<&str>) -> Self {
        match extension.map(|ext| ext.to_ascii_lowercase()) {
            Some(ext) if ext == "json" => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// Raw workflow document as returned by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Human readable location used in error messages (a path or `memory:<name>`).
    pub origin: String,
    pub format: DocumentFormat,
    pub content: String,
}

/// Provides workflow documents by name.
pub trait WorkflowSource: Send + Sync {
    /// Reads the document for `name`.
    ///
    /// Returns [`RegistryError::NotFound`] when the source has no such workflow
    /// and [`RegistryError::Read`] when it exists but cannot be read.
    fn fetch(&self, name: &str) -> Result<SourceDocument, RegistryError>;

    /// Names of every workflow the source can provide, sorted.
    fn names(&self) -> Result<Vec<String>, RegistryError>;
}

const WORKFLOW_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Names that map onto a single file inside the workflows directory.
static WORKFLOW_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)*$").expect("valid workflow name pattern"));

/// Reads `<dir>/<name>.yaml`, `.yml`, or `.json` documents.
#[derive(Debug, Clone)]
pub struct DirectoryWorkflowSource {
    root: PathBuf,
}

impl DirectoryWorkflowSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl WorkflowSource for DirectoryWorkflowSource {
    fn fetch(&self, name: &str) -> Result<SourceDocument, RegistryError> {
        if !WORKFLOW_NAME_PATTERN.is_match(name) {
            debug!(workflow = %name, "refusing workflow name outside the workflows directory");
            return Err(RegistryError::not_found(name));
        }
        for extension in WORKFLOW_EXTENSIONS {
            let path = self.root.join(format!("{name}.{extension}"));
            match fs::read_to_string(&path) {
                Ok(content) => {
                    debug!(workflow = %name, path = %path.display(), "read workflow document");
                    return Ok(SourceDocument {
                        origin: path.display().to_string(),
                        format: DocumentFormat::from_extension(Some(extension)),
                        content,
                    });
                }
                Err(error) if error.kind() == ErrorKind::NotFound => continue,
                Err(error) => {
                    return Err(RegistryError::Read {
                        name: name.to_string(),
                        origin: path.display().to_string(),
                        source: error,
                    });
                }
            }
        }
        Err(RegistryError::not_found(name))
    }

    fn names(&self) -> Result<Vec<String>, RegistryError> {
        let entries = fs::read_dir(&self.root).map_err(|error| RegistryError::Read {
            name: "*".to_string(),
            origin: self.root.display().to_string(),
            source: error,
        })?;

        let mut names = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
                continue;
            };
            if !WORKFLOW_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }
}

/// Documents registered in memory.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowSource {
    documents: RwLock<IndexMap<String, (DocumentFormat, String)>>,
}

impl InMemoryWorkflowSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the document for `name`.
    pub fn insert(&self, name: impl Into<String>, format: DocumentFormat, content: impl Into<String>) {
        let mut documents = self.documents.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        documents.insert(name.into(), (format, content.into()));
    }

    /// Builder-style helper registering a YAML document.
    pub fn with_yaml(self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(name, DocumentFormat::Yaml, content);
        self
    }
}

impl WorkflowSource for InMemoryWorkflowSource {
    fn fetch(&self, name: &str) -> Result<SourceDocument, RegistryError> {
        let documents = self.documents.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (format, content) = documents.get(name).ok_or_else(|| RegistryError::not_found(name))?;
        Ok(SourceDocument {
            origin: format!("memory:{name}"),
            format: *format,
            content: content.clone(),
        })
    }

    fn names(&self) -> Result<Vec<String>, RegistryError> {
        let documents = self.documents.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = documents.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(DocumentFormat::from_extension(Some("json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_extension(Some("JSON")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_extension(Some("yml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_extension(None), DocumentFormat::Yaml);
    }

    #[test]
    fn in_memory_source_reports_missing_names() {
        let source = InMemoryWorkflowSource::new().with_yaml("b", "steps: []").with_yaml("a", "steps: []");
        assert_eq!(source.names().unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert!(matches!(source.fetch("c"), Err(RegistryError::NotFound { name }) if name == "c"));
        assert_eq!(source.fetch("a").unwrap().origin, "memory:a");
    }
}
