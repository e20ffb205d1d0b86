// Merge newly generated files into an existing project file collection

use super::path::collection_key;
use crate::models::{GeneratedFile, ProjectFileCollection};

/// Counts of what a merge changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub created: usize,
    pub updated: usize,
}

impl MergeSummary {
    pub fn total(&self) -> usize {
        self.created + self.updated
    }
}

/// Reconcile `incoming` into `existing`, keyed by normalized path.
///
/// Matching entries are overwritten in place (name and position kept); new
/// entries are appended in input order under their normalized name. Files not
/// mentioned in `incoming` are kept as they are.
pub fn merge(existing: &ProjectFileCollection, incoming: &[GeneratedFile]) -> ProjectFileCollection {
    merge_with_summary(existing, incoming).0
}

/// Same as [`merge`], also reporting how many files were created or updated
pub fn merge_with_summary(
    existing: &ProjectFileCollection,
    incoming: &[GeneratedFile],
) -> (ProjectFileCollection, MergeSummary) {
    let mut merged = existing.clone();
    let mut summary = MergeSummary::default();

    for file in incoming {
        let key = collection_key(&file.name);
        let entry = GeneratedFile {
            name: key.clone(),
            content: file.content.clone(),
            kind: file.kind,
        };
        if merged.upsert(key, entry) {
            summary.created += 1;
        } else {
            summary.updated += 1;
        }
    }

    if !incoming.is_empty() {
        log::debug!(
            "Merged {} files into project ({} created, {} updated, {} total)",
            incoming.len(),
            summary.created,
            summary.updated,
            merged.len()
        );
    }

    (merged, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileKind;

    fn collection(files: &[(&str, &str)]) -> ProjectFileCollection {
        ProjectFileCollection::from(
            files
                .iter()
                .map(|(name, content)| GeneratedFile::new(*name, *content))
                .collect::<Vec<_>>(),
        )
    }

    fn names(collection: &ProjectFileCollection) -> Vec<&str> {
        collection.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_merge_overwrites_in_place() {
        let existing = collection(&[("index.html", "<html>"), ("src/App.tsx", "old"), ("a.css", "")]);
        let incoming = vec![GeneratedFile::new("./src/App.tsx", "new")];

        let merged = merge(&existing, &incoming);

        assert_eq!(merged.len(), 3);
        assert_eq!(names(&merged), vec!["index.html", "src/App.tsx", "a.css"]);
        assert_eq!(merged.get("src/App.tsx").unwrap().content, "new");
    }

    #[test]
    fn test_merge_appends_new_files_in_order() {
        let existing = collection(&[("index.html", "<html>")]);
        let incoming = vec![
            GeneratedFile::new("/b.js", "b"),
            GeneratedFile::new("./a.js", "a"),
        ];

        let (merged, summary) = merge_with_summary(&existing, &incoming);

        assert_eq!(names(&merged), vec!["index.html", "b.js", "a.js"]);
        assert_eq!(summary, MergeSummary { created: 2, updated: 0 });
    }

    #[test]
    fn test_merge_updates_kind() {
        let mut existing = ProjectFileCollection::new();
        existing.upsert(
            "config".to_string(),
            GeneratedFile {
                name: "config".to_string(),
                content: "{}".to_string(),
                kind: FileKind::Json,
            },
        );
        let merged = merge(&existing, &[GeneratedFile::new("config", "module.exports = {}")]);
        assert_eq!(merged.get("config").unwrap().kind, FileKind::JavaScript);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = collection(&[("src/App.tsx", "old"), ("README.md", "docs")]);
        let incoming = vec![
            GeneratedFile::new("./src/App.tsx", "new"),
            GeneratedFile::new("/src/main.tsx", "main"),
            GeneratedFile::new("././odd.js", "odd"),
        ];

        let once = merge(&existing, &incoming);
        let twice = merge(&once, &incoming);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_duplicate_incoming_last_wins() {
        let incoming = vec![
            GeneratedFile::new("app.js", "first"),
            GeneratedFile::new("./app.js", "second"),
        ];
        let (merged, summary) = merge_with_summary(&ProjectFileCollection::new(), &incoming);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get("app.js").unwrap().content, "second");
        assert_eq!(summary, MergeSummary { created: 1, updated: 1 });
    }

    #[test]
    fn test_merge_empty_incoming_is_noop() {
        let existing = collection(&[("a.js", "a"), ("b.js", "b")]);
        let merged = merge(&existing, &[]);
        assert_eq!(merged, existing);
    }

    #[test]
    fn test_merge_normalizes_loaded_collection() {
        let existing = ProjectFileCollection::from(vec![GeneratedFile::new("./legacy.js", "v1")]);
        assert_eq!(names(&existing), vec!["legacy.js"]);

        let merged = merge(&existing, &[GeneratedFile::new("/legacy.js", "v2")]);
        assert_eq!(names(&merged), vec!["legacy.js"]);
        assert_eq!(merged.get("legacy.js").unwrap().content, "v2");
    }
}
