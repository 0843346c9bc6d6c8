//! Resume pipeline orchestrator.
//!
//! Flow: truncate text → basic info → persist → skills → persist →
//!       assessment (from persisted rows) → score → persist → done.
//!
//! Every stage commits its writes before the next stage starts. Nothing is
//! rolled back when a later stage fails; partial progress is a valid end state.
//! Re-running on the same candidate appends skills rather than replacing them.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::llm_client::TextGenerator;
use crate::models::candidate::CandidateStatus;
use crate::pipeline::extraction::{
    extract_basic_info, extract_skills, generate_assessment, AssessmentInput, BasicInfo,
    MAX_SKILLS,
};
use crate::pipeline::retry::{run_with_retry, RetryPolicy};
use crate::pipeline::{char_prefix, PipelineError, Stage, MAX_TEXT_LENGTH};
use crate::store::{CandidateStore, CandidateUpdate, NewAssessment};

/// Advisory progress messages, one before each stage and one on completion.
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Completed,
    Failed,
}

/// Terminal outcome of one pipeline run. Always returned, never thrown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub candidate_id: i64,
    pub status: ProcessingStatus,
    /// `done` on success; on failure, the stage that failed.
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs the three-stage extraction for one candidate at a time.
/// Cheap to share: runs for different candidates hold no common state besides the store.
pub struct ResumePipeline {
    llm: Arc<dyn TextGenerator>,
    store: Arc<dyn CandidateStore>,
    policy: RetryPolicy,
}

impl ResumePipeline {
    pub fn new(
        llm: Arc<dyn TextGenerator>,
        store: Arc<dyn CandidateStore>,
        policy: RetryPolicy,
    ) -> Self {
        Self { llm, store, policy }
    }

    /// Starts a run on the runtime and returns its handle. Dropping the handle
    /// detaches the run; `abort` on it cancels at the next suspension point.
    pub fn spawn(
        self: &Arc<Self>,
        candidate_id: i64,
        resume_text: String,
        role_title: String,
    ) -> JoinHandle<ProcessingResult> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            let result = pipeline
                .process(candidate_id, &resume_text, &role_title, None)
                .await;
            match result.status {
                ProcessingStatus::Completed => {
                    info!("AI processing completed for candidate {candidate_id}")
                }
                ProcessingStatus::Failed => warn!(
                    "Background processing failed for candidate {candidate_id}: {}",
                    result.error.as_deref().unwrap_or("unknown error")
                ),
            }
            result
        })
    }

    /// Processes one resume to completion or failure.
    pub async fn process(
        &self,
        candidate_id: i64,
        resume_text: &str,
        role_title: &str,
        on_progress: Option<ProgressCallback>,
    ) -> ProcessingResult {
        info!(
            "Starting resume processing for candidate {candidate_id} (role: {role_title}, {} chars)",
            resume_text.chars().count()
        );
        let text = char_prefix(resume_text, MAX_TEXT_LENGTH);
        let notify = |message: &str| {
            if let Some(callback) = &on_progress {
                callback(message);
            }
        };

        let mut stage = Stage::Extraction;
        match self
            .run_stages(candidate_id, text, role_title, &mut stage, &notify)
            .await
        {
            Ok(()) => {
                notify("Complete!");
                info!("Resume processing complete for candidate {candidate_id}");
                ProcessingResult {
                    candidate_id,
                    status: ProcessingStatus::Completed,
                    stage: Stage::Done,
                    error: None,
                }
            }
            Err(e) => {
                error!("Resume processing failed for candidate {candidate_id} at {stage:?}: {e}");
                self.mark_for_manual_review(candidate_id).await;
                ProcessingResult {
                    candidate_id,
                    status: ProcessingStatus::Failed,
                    stage,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn run_stages(
        &self,
        candidate_id: i64,
        text: &str,
        role_title: &str,
        stage: &mut Stage,
        notify: &(dyn Fn(&str) + Sync),
    ) -> Result<(), PipelineError> {
        let llm = self.llm.as_ref();
        let store = self.store.as_ref();

        // Stage 1: basic info
        *stage = Stage::Extraction;
        notify("Extracting candidate information...");
        let basic_info = run_with_retry(&self.policy, "extract_basic_info", || {
            extract_basic_info(llm, text)
        })
        .await?;
        store
            .update_candidate(candidate_id, &basic_info_update(basic_info))
            .await?;
        info!("Stage 1 complete for candidate {candidate_id}");

        // Stage 2: skills
        *stage = Stage::Skills;
        notify("Analyzing technical skills...");
        let skills =
            run_with_retry(&self.policy, "extract_skills", || extract_skills(llm, text)).await?;
        for skill in skills.iter().take(MAX_SKILLS) {
            store
                .add_skill(candidate_id, &skill.name, skill.proficiency.round() as i64)
                .await?;
        }
        info!(
            "Stage 2 complete for candidate {candidate_id}: {} skills stored",
            skills.len().min(MAX_SKILLS)
        );

        // Stage 3: assessment, built from what was committed above
        *stage = Stage::Assessment;
        notify("Generating AI assessment...");
        let draft = run_with_retry(&self.policy, "generate_assessment", || async move {
            let candidate = store
                .get_candidate(candidate_id)
                .await?
                .ok_or(PipelineError::CandidateMissing(candidate_id))?;
            let skills = store.get_skills(candidate_id).await?;
            generate_assessment(
                llm,
                AssessmentInput {
                    candidate: &candidate,
                    skills: &skills,
                    resume_text: text,
                    role_title,
                },
            )
            .await
        })
        .await?;

        let overall_score = draft.overall_score();
        info!("Overall score for candidate {candidate_id}: {overall_score}");
        store
            .update_candidate(
                candidate_id,
                &CandidateUpdate {
                    score: Some(overall_score),
                    ..CandidateUpdate::default()
                },
            )
            .await?;

        store
            .create_assessment(&NewAssessment {
                candidate_id,
                technical_score: draft.technical_score.round() as i64,
                experience_score: draft.experience_score.round() as i64,
                education_score: draft.education_score.round() as i64,
                cultural_score: draft.cultural_score.round() as i64,
                recommendation: draft.recommendation.as_str().to_string(),
                detailed_comments: draft.detailed_comments.clone(),
                strengths: serde_json::to_string(&draft.strengths)?,
                weaknesses: serde_json::to_string(&draft.weaknesses)?,
            })
            .await?;

        *stage = Stage::Done;
        Ok(())
    }

    /// A failed run must never leave the candidate in an ambiguous state.
    async fn mark_for_manual_review(&self, candidate_id: i64) {
        let update = CandidateUpdate {
            status: Some(CandidateStatus::InReview),
            ..CandidateUpdate::default()
        };
        if let Err(e) = self.store.update_candidate(candidate_id, &update).await {
            error!("Failed to reset status for candidate {candidate_id}: {e:#}");
        }
    }
}

/// Contact and headline fields are always overwritten, even with null.
/// Name and email are only replaced by non-empty values.
fn basic_info_update(info: BasicInfo) -> CandidateUpdate {
    let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    CandidateUpdate {
        name: non_empty(info.name),
        email: non_empty(info.email),
        phone: Some(info.phone),
        location: Some(info.location),
        experience: Some(info.experience),
        education: Some(info.education),
        current_role: Some(info.current_role),
        ..CandidateUpdate::default()
    }
}
