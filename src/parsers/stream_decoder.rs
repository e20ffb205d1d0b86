// Incremental decoder turning a chunked generation stream into progress steps

use super::extractor::extract_project;
use super::tags::{count_lines, FileMarkerScanner, PreviewScanner};
use crate::config::DecoderConfig;
use crate::files::collection_key;
use crate::models::{
    file_step_label, preview_step_label, GeneratedProject, GenerationStep, StepTracker,
    PREVIEW_STEP_ID,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Decoder state for one generation request.
///
/// The buffer only grows. `existing_names` is captured when the request starts
/// and is never refreshed, so step labels reflect the project as it was then.
#[derive(Debug, Clone)]
pub struct StreamState {
    buffer: String,
    existing_names: Arc<HashSet<String>>,
    steps: StepTracker,
    files: FileMarkerScanner,
    preview: PreviewScanner,
    limits: DecoderConfig,
    buffer_limit_warned: bool,
    step_limit_warned: bool,
}

impl StreamState {
    /// Start a new stream. `existing_names` are the project's file paths at the
    /// time the request was made.
    pub fn new<I, S>(existing_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_config(existing_names, DecoderConfig::default())
    }

    pub fn with_config<I, S>(existing_names: I, limits: DecoderConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = existing_names
            .into_iter()
            .map(|name| collection_key(name.as_ref()))
            .collect();
        Self {
            buffer: String::new(),
            existing_names: Arc::new(names),
            steps: StepTracker::new(),
            files: FileMarkerScanner::new(),
            preview: PreviewScanner::new(),
            limits,
            buffer_limit_warned: false,
            step_limit_warned: false,
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn steps(&self) -> &StepTracker {
        &self.steps
    }

    /// Copy of the current steps for publishing to the UI
    pub fn snapshot(&self) -> Vec<GenerationStep> {
        self.steps.snapshot()
    }

    pub fn is_existing(&self, name: &str) -> bool {
        self.existing_names.contains(&collection_key(name))
    }

    /// Append a chunk and update steps. Returns true if any step was created
    /// or advanced.
    pub fn push_chunk(&mut self, chunk: &str) -> bool {
        if chunk.is_empty() {
            return false;
        }
        self.buffer.push_str(chunk);

        let first_new = self.files.scan(&self.buffer);
        let preview = self.preview.scan(&self.buffer);
        let mut changed = false;

        // New steps are ordered by where their opening marker ends, which is
        // the moment they become observable regardless of chunking.
        let mut sightings: Vec<(usize, String, String)> = self.files.openers()[first_new..]
            .iter()
            .filter(|opener| !self.steps.contains(&opener.name))
            .map(|opener| {
                let label = file_step_label(&opener.name, self.is_existing(&opener.name));
                (opener.content_start, opener.name.clone(), label)
            })
            .collect();
        if let Some(opened_at) = preview.opened_at {
            sightings.push((opened_at, PREVIEW_STEP_ID.to_string(), preview_step_label()));
        }
        sightings.sort_by_key(|(at, _, _)| *at);

        for (_, id, label) in sightings {
            if self.steps.track(&id, label) {
                log::debug!("Generation step started: {}", id);
                changed = true;
            }
        }

        for id in self.steps.pending_ids() {
            if id == PREVIEW_STEP_ID {
                continue;
            }
            if let Some((start, end)) = self.files.closed_block(&id) {
                let lines = count_lines(&self.buffer[start..end]);
                if self.steps.complete(&id, Some(lines)) {
                    log::debug!("Generation step completed: {} ({} lines)", id, lines);
                    changed = true;
                }
            }
        }

        if let Some((start, end)) = preview.closed {
            let lines = count_lines(&self.buffer[start..end]);
            if self.steps.complete(PREVIEW_STEP_ID, Some(lines)) {
                log::debug!("Preview document completed ({} lines)", lines);
                changed = true;
            }
        }

        self.check_soft_limits();
        changed
    }

    /// Run the one-shot extraction over everything received so far
    pub fn extract(&self) -> GeneratedProject {
        extract_project(&self.buffer)
    }

    fn check_soft_limits(&mut self) {
        if !self.buffer_limit_warned && self.buffer.len() > self.limits.buffer_soft_limit_bytes {
            self.buffer_limit_warned = true;
            log::warn!(
                "Generation buffer is {} bytes, above the expected {} bytes; decoding will slow down",
                self.buffer.len(),
                self.limits.buffer_soft_limit_bytes
            );
        }
        if !self.step_limit_warned && self.steps.len() > self.limits.tracked_files_soft_limit {
            self.step_limit_warned = true;
            log::warn!(
                "Tracking {} generation steps, above the expected {}",
                self.steps.len(),
                self.limits.tracked_files_soft_limit
            );
        }
    }
}

/// Feed one chunk into the stream state and return the updated state
pub fn ingest(mut state: StreamState, chunk: &str) -> StreamState {
    state.push_chunk(chunk);
    state
}
