// Data models shared by the decoder, extractor and merger

pub mod generation;
pub mod project;

pub use generation::{
    file_step_label, preview_step_label, GenerationStep, StepStatus, StepTracker, PREVIEW_STEP_ID,
};
pub use project::{
    FileKind, GeneratedFile, GeneratedProject, IncompleteFile, ProjectFileCollection,
};
