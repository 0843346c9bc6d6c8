//! Test doubles shared by unit tests: a scripted model, an in-memory store,
//! and a fully wired `AppState` for router tests.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDateTime;
use serde_json::Value;

use crate::config::{Config, SettingsStore};
use crate::db;
use crate::llm_client::{LlmError, TextGenerator};
use crate::models::candidate::{Candidate, Skill, PLACEHOLDER_EMAIL, PLACEHOLDER_NAME};
use crate::pipeline::ResumePipeline;
use crate::rate_limit::InMemoryRateLimiter;
use crate::state::AppState;
use crate::store::{CandidateStore, CandidateUpdate, NewAssessment, SqliteStore};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
    Hang,
}

/// Answers each pipeline stage from its own script. The last reply of a
/// script repeats forever; earlier ones are consumed in order.
#[derive(Default)]
pub struct ScriptedGenerator {
    scripts: Mutex<HashMap<&'static str, VecDeque<Reply>>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_basic_info(self, text: &str) -> Self {
        self.set("basic", Reply::Text(text.to_string()))
    }

    pub fn then_basic_info(self, text: &str) -> Self {
        self.push("basic", Reply::Text(text.to_string()))
    }

    pub fn hang_on_basic_info(self) -> Self {
        self.set("basic", Reply::Hang)
    }

    pub fn on_skills(self, text: &str) -> Self {
        self.set("skills", Reply::Text(text.to_string()))
    }

    pub fn fail_on_skills(self, message: &str) -> Self {
        self.set("skills", Reply::Fail(message.to_string()))
    }

    pub fn on_assessment(self, text: &str) -> Self {
        self.set("assessment", Reply::Text(text.to_string()))
    }

    pub fn fail_on_assessment(self, message: &str) -> Self {
        self.set("assessment", Reply::Fail(message.to_string()))
    }

    /// Number of model calls made for a stage ("basic", "skills", "assessment").
    pub fn calls(&self, stage: &str) -> usize {
        self.calls.lock().unwrap().get(stage).copied().unwrap_or(0)
    }

    /// Every prompt received, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn set(self, stage: &'static str, reply: Reply) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(stage, VecDeque::from([reply]));
        self
    }

    fn push(self, stage: &'static str, reply: Reply) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(stage)
            .or_default()
            .push_back(reply);
        self
    }

    fn stage_of(prompt: &str) -> &'static str {
        if prompt.starts_with("Extract basic information") {
            "basic"
        } else if prompt.starts_with("Analyze this resume") {
            "skills"
        } else {
            "assessment"
        }
    }

    fn next_reply(&self, stage: &'static str) -> Option<Reply> {
        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts.get_mut(stage)?;
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let stage = Self::stage_of(prompt);
        *self.calls.lock().unwrap().entry(stage).or_default() += 1;
        self.prompts.lock().unwrap().push(prompt.to_string());

        match self.next_reply(stage) {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => Err(LlmError::Api {
                status: 503,
                message,
            }),
            Some(Reply::Hang) => {
                std::future::pending::<()>().await;
                Err(LlmError::EmptyContent)
            }
            None => Err(LlmError::EmptyContent),
        }
    }
}

pub fn candidate_fixture(id: i64) -> Candidate {
    Candidate {
        id,
        role_id: 1,
        name: PLACEHOLDER_NAME.to_string(),
        email: PLACEHOLDER_EMAIL.to_string(),
        phone: None,
        location: None,
        experience: None,
        education: None,
        current_role: None,
        resume_path: Some(format!("/uploads/resumes/{id}.pdf")),
        status: "in-review".to_string(),
        score: 0,
        applied_date: NaiveDateTime::default(),
    }
}

#[derive(Default)]
struct MemoryState {
    candidates: HashMap<i64, Candidate>,
    skills: Vec<Skill>,
    assessments: Vec<NewAssessment>,
}

/// `CandidateStore` over plain collections. Updates to unknown ids are no-ops,
/// like an UPDATE matching zero rows.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn with_candidate(id: i64) -> Self {
        let store = Self::default();
        store
            .state
            .lock()
            .unwrap()
            .candidates
            .insert(id, candidate_fixture(id));
        store
    }

    pub fn candidate(&self, id: i64) -> Candidate {
        self.state.lock().unwrap().candidates[&id].clone()
    }

    pub fn skills(&self, candidate_id: i64) -> Vec<Skill> {
        self.state
            .lock()
            .unwrap()
            .skills
            .iter()
            .filter(|s| s.candidate_id == candidate_id)
            .cloned()
            .collect()
    }

    pub fn assessments(&self) -> Vec<NewAssessment> {
        self.state.lock().unwrap().assessments.clone()
    }
}

/// Wraps a `MemoryStore` and rejects selected writes, like a full disk or a
/// dropped connection would.
pub struct FailingStore {
    inner: MemoryStore,
    fail_skill_writes: bool,
    fail_status_writes: bool,
}

impl FailingStore {
    pub fn wrapping(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_skill_writes: false,
            fail_status_writes: false,
        }
    }

    pub fn fail_skill_writes(mut self) -> Self {
        self.fail_skill_writes = true;
        self
    }

    /// Rejects any update that sets `status`.
    pub fn fail_status_writes(mut self) -> Self {
        self.fail_status_writes = true;
        self
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl CandidateStore for FailingStore {
    async fn get_candidate(&self, id: i64) -> Result<Option<Candidate>> {
        self.inner.get_candidate(id).await
    }

    async fn update_candidate(&self, id: i64, update: &CandidateUpdate) -> Result<()> {
        if self.fail_status_writes && update.status.is_some() {
            anyhow::bail!("status write rejected");
        }
        self.inner.update_candidate(id, update).await
    }

    async fn get_skills(&self, candidate_id: i64) -> Result<Vec<Skill>> {
        self.inner.get_skills(candidate_id).await
    }

    async fn add_skill(&self, candidate_id: i64, name: &str, proficiency: i64) -> Result<()> {
        if self.fail_skill_writes {
            anyhow::bail!("disk I/O error");
        }
        self.inner.add_skill(candidate_id, name, proficiency).await
    }

    async fn create_assessment(&self, assessment: &NewAssessment) -> Result<i64> {
        self.inner.create_assessment(assessment).await
    }
}

fn apply(update: &CandidateUpdate, candidate: &mut Candidate) {
    if let Some(name) = &update.name {
        candidate.name = name.clone();
    }
    if let Some(email) = &update.email {
        candidate.email = email.clone();
    }
    if let Some(phone) = &update.phone {
        candidate.phone = phone.clone();
    }
    if let Some(location) = &update.location {
        candidate.location = location.clone();
    }
    if let Some(experience) = &update.experience {
        candidate.experience = experience.clone();
    }
    if let Some(education) = &update.education {
        candidate.education = education.clone();
    }
    if let Some(current_role) = &update.current_role {
        candidate.current_role = current_role.clone();
    }
    if let Some(status) = update.status {
        candidate.status = status.as_str().to_string();
    }
    if let Some(score) = update.score {
        candidate.score = score;
    }
}

#[async_trait]
impl CandidateStore for MemoryStore {
    async fn get_candidate(&self, id: i64) -> Result<Option<Candidate>> {
        Ok(self.state.lock().unwrap().candidates.get(&id).cloned())
    }

    async fn update_candidate(&self, id: i64, update: &CandidateUpdate) -> Result<()> {
        if let Some(candidate) = self.state.lock().unwrap().candidates.get_mut(&id) {
            apply(update, candidate);
        }
        Ok(())
    }

    async fn get_skills(&self, candidate_id: i64) -> Result<Vec<Skill>> {
        Ok(self.skills(candidate_id))
    }

    async fn add_skill(&self, candidate_id: i64, name: &str, proficiency: i64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let id = state.skills.len() as i64 + 1;
        state.skills.push(Skill {
            id,
            candidate_id,
            skill_name: name.to_string(),
            proficiency,
        });
        Ok(())
    }

    async fn create_assessment(&self, assessment: &NewAssessment) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        state.assessments.push(assessment.clone());
        Ok(state.assessments.len() as i64)
    }
}

/// App state over an in-memory database, with uploads and settings under `dir`.
/// The pipeline makes a single attempt per stage.
pub async fn test_app_state(dir: &Path, llm: ScriptedGenerator) -> AppState {
    let upload_dir = dir.join("uploads");
    std::fs::create_dir_all(&upload_dir).unwrap();

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        gemini_api_key: "test-key".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        upload_dir,
        settings_path: dir.join("config.json"),
        pipeline_max_attempts: 1,
        pipeline_attempt_timeout_secs: 5,
    };

    let db = db::test_pool().await;
    let pipeline = ResumePipeline::new(
        Arc::new(llm),
        Arc::new(SqliteStore::new(db.clone())),
        config.retry_policy(),
    );

    AppState {
        db,
        settings: Arc::new(SettingsStore::new(config.settings_path.clone())),
        rate_limiter: Arc::new(InMemoryRateLimiter::new()),
        pipeline: Arc::new(pipeline),
        config,
    }
}

pub async fn read_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
