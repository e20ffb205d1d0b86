// Progress steps reported while a generation stream is being decoded

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reserved step id for the preview document
pub const PREVIEW_STEP_ID: &str = "__preview__";

/// Status of a generation step. Steps only ever move forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
}

impl StepStatus {
    fn rank(self) -> u8 {
        match self {
            StepStatus::Pending => 0,
            StepStatus::InProgress => 1,
            StepStatus::Completed => 2,
        }
    }

    /// Whether moving from `self` to `next` is a forward transition
    pub fn can_advance_to(self, next: StepStatus) -> bool {
        next.rank() > self.rank()
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::InProgress => write!(f, "in_progress"),
            StepStatus::Completed => write!(f, "completed"),
        }
    }
}

/// One unit of progress shown to the user: a file or the preview document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStep {
    /// File path as it appears in the stream, or [`PREVIEW_STEP_ID`]
    pub id: String,
    pub label: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_count: Option<u32>,
}

impl GenerationStep {
    pub fn is_preview(&self) -> bool {
        self.id == PREVIEW_STEP_ID
    }

    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }
}

/// Label for a file step, fixed when the step is created
pub fn file_step_label(name: &str, already_exists: bool) -> String {
    if already_exists {
        format!("Updating {}", name)
    } else {
        format!("Creating {}", name)
    }
}

/// Label for the preview step
pub fn preview_step_label() -> String {
    "Rendering preview".to_string()
}

/// Ordered, deduplicated collection of generation steps
#[derive(Debug, Clone, Default)]
pub struct StepTracker {
    steps: Vec<GenerationStep>,
    index: HashMap<String, usize>,
}

impl StepTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a step as in progress.
    /// Returns false if a step with this id already exists (it is left untouched).
    pub fn track(&mut self, id: &str, label: String) -> bool {
        if self.index.contains_key(id) {
            return false;
        }
        self.index.insert(id.to_string(), self.steps.len());
        self.steps.push(GenerationStep {
            id: id.to_string(),
            label,
            status: StepStatus::InProgress,
            line_count: None,
        });
        true
    }

    /// Mark a tracked step as completed.
    /// Returns false if the step is unknown or already completed.
    pub fn complete(&mut self, id: &str, line_count: Option<u32>) -> bool {
        let Some(&idx) = self.index.get(id) else {
            return false;
        };
        let step = &mut self.steps[idx];
        if !step.status.can_advance_to(StepStatus::Completed) {
            return false;
        }
        step.status = StepStatus::Completed;
        if line_count.is_some() {
            step.line_count = line_count;
        }
        true
    }

    pub fn get(&self, id: &str) -> Option<&GenerationStep> {
        self.index.get(id).map(|&idx| &self.steps[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenerationStep> {
        self.steps.iter()
    }

    /// Ids of steps that have not completed yet, in tracking order
    pub fn pending_ids(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter(|s| !s.is_completed())
            .map(|s| s.id.clone())
            .collect()
    }

    /// Owned copy of the current step list for publishing
    pub fn snapshot(&self) -> Vec<GenerationStep> {
        self.steps.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_only_advances() {
        assert!(StepStatus::Pending.can_advance_to(StepStatus::InProgress));
        assert!(StepStatus::InProgress.can_advance_to(StepStatus::Completed));
        assert!(StepStatus::Pending.can_advance_to(StepStatus::Completed));
        assert!(!StepStatus::Completed.can_advance_to(StepStatus::InProgress));
        assert!(!StepStatus::InProgress.can_advance_to(StepStatus::InProgress));
    }

    #[test]
    fn test_track_creates_in_progress_step() {
        let mut tracker = StepTracker::new();
        assert!(tracker.track("App.tsx", file_step_label("App.tsx", false)));

        let step = tracker.get("App.tsx").unwrap();
        assert_eq!(step.status, StepStatus::InProgress);
        assert_eq!(step.label, "Creating App.tsx");
        assert_eq!(step.line_count, None);
    }

    #[test]
    fn test_track_deduplicates_by_id() {
        let mut tracker = StepTracker::new();
        assert!(tracker.track("a.js", "first".to_string()));
        assert!(!tracker.track("a.js", "second".to_string()));
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.get("a.js").unwrap().label, "first");
    }

    #[test]
    fn test_complete_is_one_way() {
        let mut tracker = StepTracker::new();
        tracker.track("a.js", "a".to_string());
        assert!(tracker.complete("a.js", Some(3)));
        assert!(!tracker.complete("a.js", Some(10)));

        let step = tracker.get("a.js").unwrap();
        assert!(step.is_completed());
        assert_eq!(step.line_count, Some(3));
    }

    #[test]
    fn test_complete_unknown_step() {
        let mut tracker = StepTracker::new();
        assert!(!tracker.complete("missing.js", None));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_snapshot_preserves_order() {
        let mut tracker = StepTracker::new();
        tracker.track("b.js", "b".to_string());
        tracker.track(PREVIEW_STEP_ID, preview_step_label());
        tracker.track("a.js", "a".to_string());
        tracker.complete(PREVIEW_STEP_ID, None);

        let ids: Vec<String> = tracker.snapshot().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["b.js", PREVIEW_STEP_ID, "a.js"]);
        assert_eq!(tracker.pending_ids(), vec!["b.js", "a.js"]);
    }

    #[test]
    fn test_updating_label() {
        assert_eq!(file_step_label("src/App.tsx", true), "Updating src/App.tsx");
    }

    #[test]
    fn test_step_serialization() {
        let step = GenerationStep {
            id: "index.html".to_string(),
            label: "Creating index.html".to_string(),
            status: StepStatus::Completed,
            line_count: Some(12),
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["lineCount"], 12);
    }
}
