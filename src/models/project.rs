// Generated project artifact types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of a generated source file, derived from its extension
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Html,
    Css,
    JavaScript,
    TypeScript,
    Json,
}

impl FileKind {
    /// Detect kind from a file extension (without the dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "html" | "htm" => Some(Self::Html),
            "css" => Some(Self::Css),
            "ts" | "tsx" => Some(Self::TypeScript),
            "json" => Some(Self::Json),
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            _ => None,
        }
    }

    /// Infer kind from a file name. Unknown or missing extensions are JavaScript.
    pub fn from_name(name: &str) -> Self {
        std::path::Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .unwrap_or(Self::JavaScript)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Html => "html",
            FileKind::Css => "css",
            FileKind::JavaScript => "javascript",
            FileKind::TypeScript => "typescript",
            FileKind::Json => "json",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single file produced by the generator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFile {
    /// File name as written by the generator (not normalized)
    pub name: String,
    pub content: String,
    pub kind: FileKind,
}

impl GeneratedFile {
    /// Create a file, inferring its kind from the name
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        let kind = FileKind::from_name(&name);
        Self {
            name,
            content: content.into(),
            kind,
        }
    }
}

/// A file block whose opening marker arrived but whose closing marker never did
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IncompleteFile {
    pub name: String,
    /// Everything after the opening marker up to the end of the stream
    pub partial_content: String,
}

/// Final artifact extracted from a completed generation stream
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedProject {
    pub files: Vec<GeneratedFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<u64>,
    /// Unterminated file blocks, excluded from `files`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incomplete_files: Vec<IncompleteFile>,
}

impl GeneratedProject {
    pub fn has_preview(&self) -> bool {
        self.preview_document
            .as_deref()
            .map_or(false, |doc| !doc.is_empty())
    }

    /// Whether any file block was cut off before its closing marker
    pub fn is_incomplete(&self) -> bool {
        !self.incomplete_files.is_empty()
    }

    /// Look up an extracted file by its raw name
    pub fn file(&self, name: &str) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// Ordered project file set keyed by normalized path.
///
/// Insertion order is preserved; replacing an entry keeps its position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<GeneratedFile>", into = "Vec<GeneratedFile>")]
pub struct ProjectFileCollection {
    entries: Vec<GeneratedFile>,
    index: HashMap<String, usize>,
}

impl ProjectFileCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get a file by path; the path is normalized before lookup
    pub fn get(&self, path: &str) -> Option<&GeneratedFile> {
        self.index
            .get(&crate::files::collection_key(path))
            .map(|&idx| &self.entries[idx])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedFile> {
        self.entries.iter()
    }

    /// Normalized keys in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|f| crate::files::collection_key(&f.name))
            .collect()
    }

    pub fn files(&self) -> &[GeneratedFile] {
        &self.entries
    }

    pub fn into_files(self) -> Vec<GeneratedFile> {
        self.entries
    }

    /// Overwrite the entry stored under `key` in place, or append `file`.
    /// Returns true when a new entry was appended.
    pub(crate) fn upsert(&mut self, key: String, file: GeneratedFile) -> bool {
        match self.index.get(&key) {
            Some(&idx) => {
                let existing = &mut self.entries[idx];
                existing.content = file.content;
                existing.kind = file.kind;
                false
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(file);
                true
            }
        }
    }
}

impl PartialEq for ProjectFileCollection {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for ProjectFileCollection {}

impl From<Vec<GeneratedFile>> for ProjectFileCollection {
    fn from(files: Vec<GeneratedFile>) -> Self {
        crate::files::merge(&ProjectFileCollection::new(), &files)
    }
}

impl From<ProjectFileCollection> for Vec<GeneratedFile> {
    fn from(collection: ProjectFileCollection) -> Self {
        collection.entries
    }
}
