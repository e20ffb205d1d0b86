// Tag grammar for generated output
//
// A generation stream is plain text containing blocks of the form
//   <file name="path/to/file.ext">...content...</file>
// and at most one
//   <preview_html>...markup...</preview_html>
// Blocks do not nest and the first closing marker after an opening marker
// ends the block.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

pub const FILE_OPEN_PREFIX: &str = "<file name=\"";
pub const FILE_CLOSE: &str = "</file>";
pub const PREVIEW_OPEN: &str = "<preview_html>";
pub const PREVIEW_CLOSE: &str = "</preview_html>";

// Compiled block patterns for one-shot extraction
static FILE_BLOCK_PATTERN: OnceLock<Regex> = OnceLock::new();
static FILE_OPEN_PATTERN: OnceLock<Regex> = OnceLock::new();
static PREVIEW_BLOCK_PATTERN: OnceLock<Regex> = OnceLock::new();
static BUILD_PLAN_PATTERN: OnceLock<Regex> = OnceLock::new();
static BUILD_SUMMARY_PATTERN: OnceLock<Regex> = OnceLock::new();

pub fn file_block_pattern() -> &'static Regex {
    FILE_BLOCK_PATTERN
        .get_or_init(|| Regex::new(r#"<file name="([^"]+)">([\s\S]*?)</file>"#).unwrap())
}

pub fn file_open_pattern() -> &'static Regex {
    FILE_OPEN_PATTERN.get_or_init(|| Regex::new(r#"<file name="([^"]+)">"#).unwrap())
}

pub fn preview_block_pattern() -> &'static Regex {
    PREVIEW_BLOCK_PATTERN
        .get_or_init(|| Regex::new(r"<preview_html>([\s\S]*?)</preview_html>").unwrap())
}

pub fn build_plan_pattern() -> &'static Regex {
    BUILD_PLAN_PATTERN.get_or_init(|| Regex::new(r"<build_plan>([\s\S]*?)</build_plan>").unwrap())
}

pub fn build_summary_pattern() -> &'static Regex {
    BUILD_SUMMARY_PATTERN
        .get_or_init(|| Regex::new(r"<build_summary>([\s\S]*?)</build_summary>").unwrap())
}

/// Approximate number of lines in a block's content
pub fn count_lines(content: &str) -> u32 {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return 0;
    }
    u32::try_from(trimmed.lines().count()).unwrap_or(u32::MAX)
}

/// Smallest offset at or after `floor` where a `marker` that is still being
/// streamed could begin. Everything before it has been fully searched.
fn resume_offset(buffer: &str, floor: usize, marker: &str) -> usize {
    let mut at = buffer
        .len()
        .saturating_sub(marker.len().saturating_sub(1))
        .max(floor);
    while !buffer.is_char_boundary(at) {
        at += 1;
    }
    at
}

/// Result of matching a file-opening marker at a known prefix position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenMarker<'a> {
    /// Full `<file name="...">` marker
    Complete { name: &'a str, content_start: usize },
    /// The buffer ends before the marker can be confirmed or rejected
    Partial,
    /// Not a well-formed opening marker
    NoMatch,
}

/// Match a file-opening marker whose [`FILE_OPEN_PREFIX`] starts at `at`
pub fn match_file_open(buffer: &str, at: usize) -> OpenMarker<'_> {
    let name_start = at + FILE_OPEN_PREFIX.len();
    let rest = &buffer[name_start..];
    match rest.find('"') {
        None => OpenMarker::Partial,
        Some(0) => OpenMarker::NoMatch,
        Some(quote) => {
            let after = &rest[quote + 1..];
            if after.is_empty() {
                OpenMarker::Partial
            } else if after.starts_with('>') {
                OpenMarker::Complete {
                    name: &rest[..quote],
                    content_start: name_start + quote + 2,
                }
            } else {
                OpenMarker::NoMatch
            }
        }
    }
}

/// A confirmed file-opening marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOpener {
    pub name: String,
    /// Byte offset of the `<` of the marker
    pub start: usize,
    /// Byte offset just past the marker's `>`
    pub content_start: usize,
}

/// Resumable scanner for file markers in an append-only buffer.
///
/// Each call to [`FileMarkerScanner::scan`] only looks at text that could not
/// be settled by earlier calls, so the markers it reports do not depend on how
/// the buffer was split into chunks.
#[derive(Debug, Clone, Default)]
pub struct FileMarkerScanner {
    open_cursor: usize,
    close_cursor: usize,
    openers: Vec<FileOpener>,
    first_opener: HashMap<String, usize>,
    closers: Vec<usize>,
}

impl FileMarkerScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan newly settled text. Returns the index of the first opener found
    /// by this call; openers from there on are new.
    pub fn scan(&mut self, buffer: &str) -> usize {
        let first_new = self.openers.len();
        self.scan_openers(buffer);
        self.scan_closers(buffer);
        first_new
    }

    fn scan_openers(&mut self, buffer: &str) {
        let mut at = self.open_cursor;
        loop {
            let Some(found) = buffer[at..].find(FILE_OPEN_PREFIX) else {
                self.open_cursor = resume_offset(buffer, at, FILE_OPEN_PREFIX);
                return;
            };
            let start = at + found;
            match match_file_open(buffer, start) {
                OpenMarker::Complete {
                    name,
                    content_start,
                } => {
                    self.first_opener
                        .entry(name.to_string())
                        .or_insert(self.openers.len());
                    self.openers.push(FileOpener {
                        name: name.to_string(),
                        start,
                        content_start,
                    });
                    at = content_start;
                }
                OpenMarker::Partial => {
                    self.open_cursor = start;
                    return;
                }
                OpenMarker::NoMatch => at = start + 1,
            }
        }
    }

    fn scan_closers(&mut self, buffer: &str) {
        let mut at = self.close_cursor;
        while let Some(found) = buffer[at..].find(FILE_CLOSE) {
            self.closers.push(at + found);
            at += found + FILE_CLOSE.len();
        }
        self.close_cursor = resume_offset(buffer, at, FILE_CLOSE);
    }

    /// All confirmed openers in buffer order
    pub fn openers(&self) -> &[FileOpener] {
        &self.openers
    }

    /// Content range of the first complete block for `name`, if it has closed
    pub fn closed_block(&self, name: &str) -> Option<(usize, usize)> {
        let opener = &self.openers[*self.first_opener.get(name)?];
        let idx = self
            .closers
            .partition_point(|&pos| pos < opener.content_start);
        self.closers
            .get(idx)
            .map(|&close| (opener.content_start, close))
    }
}

/// What the preview scanner learned from the latest scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreviewScan {
    /// Offset just past the opening marker, reported once when first seen
    pub opened_at: Option<usize>,
    /// Content range, reported once when the block first closes
    pub closed: Option<(usize, usize)>,
}

/// Resumable scanner for the single preview block
#[derive(Debug, Clone, Default)]
pub struct PreviewScanner {
    open_cursor: usize,
    content_start: Option<usize>,
    close_cursor: usize,
    close_at: Option<usize>,
}

impl PreviewScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scan(&mut self, buffer: &str) -> PreviewScan {
        let mut result = PreviewScan::default();

        let content_start = match self.content_start {
            Some(start) => start,
            None => match buffer[self.open_cursor..].find(PREVIEW_OPEN) {
                Some(found) => {
                    let start = self.open_cursor + found + PREVIEW_OPEN.len();
                    self.content_start = Some(start);
                    self.close_cursor = start;
                    result.opened_at = Some(start);
                    start
                }
                None => {
                    self.open_cursor = resume_offset(buffer, self.open_cursor, PREVIEW_OPEN);
                    return result;
                }
            },
        };

        if self.close_at.is_none() {
            match buffer[self.close_cursor..].find(PREVIEW_CLOSE) {
                Some(found) => {
                    let close = self.close_cursor + found;
                    self.close_at = Some(close);
                    result.closed = Some((content_start, close));
                }
                None => {
                    self.close_cursor = resume_offset(buffer, self.close_cursor, PREVIEW_CLOSE);
                }
            }
        }

        result
    }
}
