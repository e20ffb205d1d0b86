// Project extraction - structural parse of a completed generation stream

use super::tags::{
    build_plan_pattern, build_summary_pattern, file_block_pattern, file_open_pattern,
    preview_block_pattern,
};
use crate::files::collection_key;
use crate::models::{FileKind, GeneratedFile, GeneratedProject, IncompleteFile};
use regex::Regex;

/// Name used when the whole response has to stand in for the project
pub const FALLBACK_FILE_NAME: &str = "index.html";

/// Extract files and the preview document from a complete stream buffer.
///
/// Never fails. When the text contains no recognizable blocks at all, the whole
/// text becomes a single `index.html` and the preview document.
pub fn extract_project(full_text: &str) -> GeneratedProject {
    let mut project = GeneratedProject {
        preview_document: capture_trimmed(preview_block_pattern(), full_text),
        build_plan: capture_trimmed(build_plan_pattern(), full_text),
        build_summary: capture_trimmed(build_summary_pattern(), full_text),
        ..Default::default()
    };

    let mut last_block_end = 0;
    for cap in file_block_pattern().captures_iter(full_text) {
        let (Some(name), Some(content)) = (cap.get(1), cap.get(2)) else {
            continue;
        };
        project
            .files
            .push(GeneratedFile::new(name.as_str(), content.as_str().trim()));
        if let Some(whole) = cap.get(0) {
            last_block_end = whole.end();
        }
    }

    if let Some(incomplete) = find_unterminated(&full_text[last_block_end..]) {
        log::warn!(
            "File block '{}' was never closed; leaving it out of the project",
            incomplete.name
        );
        project.incomplete_files.push(incomplete);
    }

    if !project.has_preview() {
        if let Some(index) = project.files.iter().find(|f| is_index_document(&f.name)) {
            log::debug!("Using {} as the preview document", index.name);
            project.preview_document = Some(index.content.clone());
        } else if project.files.is_empty() && !full_text.is_empty() {
            log::info!("No file blocks found in response, treating it as a single HTML document");
            project.files.push(GeneratedFile {
                name: FALLBACK_FILE_NAME.to_string(),
                content: full_text.to_string(),
                kind: FileKind::Html,
            });
            project.preview_document = Some(full_text.to_string());
        }
    }

    log::debug!(
        "Extracted {} files (preview: {}, incomplete: {})",
        project.files.len(),
        project.has_preview(),
        project.incomplete_files.len()
    );

    project
}

/// First capture group of `pattern`, trimmed; empty captures count as absent
fn capture_trimmed(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn is_index_document(name: &str) -> bool {
    matches!(collection_key(name).as_str(), "index.html" | "index.htm")
}

/// An opening file marker in `tail` with no closing marker after it
fn find_unterminated(tail: &str) -> Option<IncompleteFile> {
    let cap = file_open_pattern().captures(tail)?;
    let name = cap.get(1)?.as_str().to_string();
    let partial = &tail[cap.get(0)?.end()..];
    Some(IncompleteFile {
        name,
        partial_content: partial.trim().to_string(),
    })
}
