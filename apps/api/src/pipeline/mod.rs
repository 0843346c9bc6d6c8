// Resume processing pipeline.
// Three model-backed stages (basic info -> skills -> assessment), each wrapped in
// the timeout + retry policy from `retry`, persisted through `CandidateStore`
// after every stage. All model calls go through `llm_client::TextGenerator`.

use serde::Serialize;
use thiserror::Error;

use crate::llm_client::decode::DecodeError;
use crate::llm_client::LlmError;

pub mod extraction;
pub mod orchestrator;
pub mod prompts;
pub mod retry;

pub use orchestrator::ResumePipeline;

/// Hard cap on resume text seen by any stage.
pub const MAX_TEXT_LENGTH: usize = 50_000;

/// Ordered phases of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extraction,
    Skills,
    Assessment,
    Done,
}

/// The stages that make a model call and decode its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStage {
    BasicInfo,
    Skills,
    Assessment,
}

impl ModelStage {
    /// Message used when the model output for this stage cannot be decoded.
    pub fn failure_message(&self) -> &'static str {
        match self {
            ModelStage::BasicInfo => "Failed to extract basic info",
            ModelStage::Skills => "Failed to extract skills",
            ModelStage::Assessment => "Failed to generate assessment",
        }
    }
}

impl From<ModelStage> for Stage {
    fn from(stage: ModelStage) -> Self {
        match stage {
            ModelStage::BasicInfo => Stage::Extraction,
            ModelStage::Skills => Stage::Skills,
            ModelStage::Assessment => Stage::Assessment,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Operation timed out")]
    Timeout,

    #[error("Max retries exceeded")]
    RetriesExhausted,

    #[error("{}", .stage.failure_message())]
    Extraction {
        stage: ModelStage,
        #[source]
        source: DecodeError,
    },

    #[error("Candidate {0} not found")]
    CandidateMissing(i64),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Store error: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// First `max_chars` characters of `text`, never splitting a character.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
