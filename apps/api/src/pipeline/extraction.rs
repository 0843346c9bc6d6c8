//! The three model-backed extraction stages.
//!
//! Each stage is a pure function of its inputs: build a prompt, make one model
//! call, decode the first JSON value of the expected shape. Timeouts and retries
//! are composed around these calls by the orchestrator.

use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::llm_client::decode::{decode_first, JsonKind};
use crate::llm_client::TextGenerator;
use crate::models::candidate::{Candidate, Recommendation, Skill};
use crate::pipeline::prompts::{
    fill_template, ASSESSMENT_PROMPT, BASIC_INFO_PROMPT, SKILLS_PROMPT,
};
use crate::pipeline::{char_prefix, ModelStage, PipelineError};

const BASIC_INFO_CHARS: usize = 1000;
const SKILLS_CHARS: usize = 3000;
const ASSESSMENT_CHARS: usize = 2000;

pub const MAX_SKILLS: usize = 15;
pub const MAX_STRENGTHS: usize = 4;
pub const MAX_WEAKNESSES: usize = 3;

/// Stage 1 output. Any field the model leaves out is treated as null.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BasicInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub current_role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractedSkill {
    pub name: String,
    #[serde(deserialize_with = "percentage")]
    pub proficiency: f64,
}

/// Stage 3 output, already truncated to the strength/weakness caps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentDraft {
    #[serde(deserialize_with = "percentage")]
    pub technical_score: f64,
    #[serde(deserialize_with = "percentage")]
    pub experience_score: f64,
    #[serde(deserialize_with = "percentage")]
    pub education_score: f64,
    #[serde(deserialize_with = "percentage")]
    pub cultural_score: f64,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub detailed_comments: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

impl AssessmentDraft {
    /// Unweighted mean of the four sub-scores, rounded half up.
    pub fn overall_score(&self) -> i64 {
        let sum = self.technical_score
            + self.experience_score
            + self.education_score
            + self.cultural_score;
        (sum / 4.0 + 0.5).floor() as i64
    }
}

/// Accepts integer or fractional numbers and clamps them into 0–100.
fn percentage<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(value.clamp(0.0, 100.0))
}

/// Stage 1: name, contact details and headline facts from the top of the resume.
pub async fn extract_basic_info(
    llm: &dyn TextGenerator,
    resume_text: &str,
) -> Result<BasicInfo, PipelineError> {
    let prompt = fill_template(
        BASIC_INFO_PROMPT,
        &[("resume_text", char_prefix(resume_text, BASIC_INFO_CHARS))],
    );

    let text = llm.generate(&prompt).await?;
    debug!("extract_basic_info: response received, length {}", text.len());

    decode_first(&text, JsonKind::Object).map_err(|source| PipelineError::Extraction {
        stage: ModelStage::BasicInfo,
        source,
    })
}

/// Stage 2: skill list with proficiency estimates, capped at `MAX_SKILLS`.
pub async fn extract_skills(
    llm: &dyn TextGenerator,
    resume_text: &str,
) -> Result<Vec<ExtractedSkill>, PipelineError> {
    let prompt = fill_template(
        SKILLS_PROMPT,
        &[("resume_text", char_prefix(resume_text, SKILLS_CHARS))],
    );

    let text = llm.generate(&prompt).await?;

    let mut skills: Vec<ExtractedSkill> =
        decode_first(&text, JsonKind::Array).map_err(|source| PipelineError::Extraction {
            stage: ModelStage::Skills,
            source,
        })?;
    debug!("extract_skills: model returned {} skills", skills.len());

    skills.truncate(MAX_SKILLS);
    Ok(skills)
}

/// Inputs for stage 3. Candidate and skills must be the persisted rows.
pub struct AssessmentInput<'a> {
    pub candidate: &'a Candidate,
    pub skills: &'a [Skill],
    pub resume_text: &'a str,
    pub role_title: &'a str,
}

/// Stage 3: scored assessment of the candidate against the role.
pub async fn generate_assessment(
    llm: &dyn TextGenerator,
    input: AssessmentInput<'_>,
) -> Result<AssessmentDraft, PipelineError> {
    let prompt = build_assessment_prompt(&input);

    let text = llm.generate(&prompt).await?;

    let mut draft: AssessmentDraft =
        decode_first(&text, JsonKind::Object).map_err(|source| PipelineError::Extraction {
            stage: ModelStage::Assessment,
            source,
        })?;
    debug!(
        "generate_assessment: recommendation {}",
        draft.recommendation.as_str()
    );

    draft.strengths.truncate(MAX_STRENGTHS);
    draft.weaknesses.truncate(MAX_WEAKNESSES);
    Ok(draft)
}

fn build_assessment_prompt(input: &AssessmentInput<'_>) -> String {
    let skills = input
        .skills
        .iter()
        .map(|s| format!("{} ({}%)", s.skill_name, s.proficiency))
        .collect::<Vec<_>>()
        .join(", ");

    fill_template(
        ASSESSMENT_PROMPT,
        &[
            ("role_title", input.role_title),
            ("name", input.candidate.name.as_str()),
            (
                "experience",
                input.candidate.experience.as_deref().unwrap_or(""),
            ),
            (
                "education",
                input.candidate.education.as_deref().unwrap_or(""),
            ),
            ("skills", skills.as_str()),
            (
                "resume_text",
                char_prefix(input.resume_text, ASSESSMENT_CHARS),
            ),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{candidate_fixture, ScriptedGenerator};

    #[tokio::test]
    async fn test_basic_info_decodes_nulls_and_camel_case() {
        let llm = ScriptedGenerator::new().on_basic_info(
            r#"```json
            {"name":"Jane Doe","email":"jane@x.com","phone":null,"location":"Austin, TX",
             "experience":"6 years","education":"BSc CS","currentRole":"Engineer at Acme"}
            ```"#,
        );

        let info = extract_basic_info(&llm, "Jane Doe resume").await.unwrap();
        assert_eq!(info.name.as_deref(), Some("Jane Doe"));
        assert_eq!(info.email.as_deref(), Some("jane@x.com"));
        assert!(info.phone.is_none());
        assert_eq!(info.current_role.as_deref(), Some("Engineer at Acme"));
    }

    #[tokio::test]
    async fn test_basic_info_prompt_sees_only_first_1000_chars() {
        let llm = ScriptedGenerator::new().on_basic_info(r#"{"name": "X"}"#);
        let resume = format!("{}{}", "a".repeat(1000), "TAIL_MARKER");

        extract_basic_info(&llm, &resume).await.unwrap();

        let prompt = llm.prompts().pop().unwrap();
        assert!(prompt.contains(&"a".repeat(1000)));
        assert!(!prompt.contains("TAIL_MARKER"));
    }

    #[tokio::test]
    async fn test_basic_info_without_json_fails_naming_stage() {
        let llm = ScriptedGenerator::new().on_basic_info("I could not find any details.");
        let err = extract_basic_info(&llm, "resume").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to extract basic info");
    }

    #[tokio::test]
    async fn test_skills_capped_at_fifteen_and_clamped() {
        let mut items: Vec<String> = (0..20)
            .map(|i| format!(r#"{{"name": "Skill{i}", "proficiency": {}}}"#, 50 + i))
            .collect();
        items[0] = r#"{"name": "Overclaimed", "proficiency": 140.0}"#.to_string();
        let llm = ScriptedGenerator::new().on_skills(&format!("[{}]", items.join(",")));

        let skills = extract_skills(&llm, "resume").await.unwrap();
        assert_eq!(skills.len(), MAX_SKILLS);
        assert_eq!(skills[0].proficiency, 100.0);
        assert_eq!(skills[14].name, "Skill14");
    }

    #[tokio::test]
    async fn test_skills_require_array() {
        let llm = ScriptedGenerator::new().on_skills(r#"{"name": "Rust", "proficiency": 80}"#);
        let err = extract_skills(&llm, "resume").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to extract skills");
    }

    #[tokio::test]
    async fn test_assessment_prompt_uses_persisted_state_and_truncates_lists() {
        let llm = ScriptedGenerator::new().on_assessment(
            r#"{"technicalScore": 80, "experienceScore": 70, "educationScore": 90,
                "culturalScore": 60, "recommendation": "Hire",
                "detailedComments": "Strong systems background.",
                "strengths": ["a", "b", "c", "d", "e"], "weaknesses": ["x", "y", "z", "w"]}"#,
        );
        let mut candidate = candidate_fixture(1);
        candidate.name = "Jane Doe".to_string();
        candidate.experience = Some("6 years".to_string());
        let skills = vec![Skill {
            id: 1,
            candidate_id: 1,
            skill_name: "Rust".to_string(),
            proficiency: 90,
        }];

        let draft = generate_assessment(
            &llm,
            AssessmentInput {
                candidate: &candidate,
                skills: &skills,
                resume_text: "resume body",
                role_title: "Platform Engineer",
            },
        )
        .await
        .unwrap();

        assert_eq!(draft.strengths.len(), MAX_STRENGTHS);
        assert_eq!(draft.weaknesses.len(), MAX_WEAKNESSES);
        assert_eq!(draft.recommendation, Recommendation::Hire);
        assert_eq!(draft.overall_score(), 75);

        let prompt = llm.prompts().pop().unwrap();
        assert!(prompt.contains("Assess this candidate for: Platform Engineer"));
        assert!(prompt.contains("Candidate: Jane Doe"));
        assert!(prompt.contains("Experience: 6 years"));
        assert!(prompt.contains("Skills: Rust (90%)"));
    }

    #[test]
    fn test_assessment_prompt_does_not_expand_braces_in_values() {
        let mut candidate = candidate_fixture(1);
        candidate.name = "Jane {skills} {resume_text}".to_string();
        let skills = vec![Skill {
            id: 1,
            candidate_id: 1,
            skill_name: "Rust".to_string(),
            proficiency: 90,
        }];

        let prompt = build_assessment_prompt(&AssessmentInput {
            candidate: &candidate,
            skills: &skills,
            resume_text: "CONFIDENTIAL_BODY",
            role_title: "Role {name}",
        });

        let first_line = prompt.lines().next().unwrap();
        assert_eq!(first_line, "Assess this candidate for: Role {name}");
        assert!(prompt.contains("Candidate: Jane {skills} {resume_text}"));
        assert!(prompt.contains("Skills: Rust (90%)"));
        assert_eq!(prompt.matches("CONFIDENTIAL_BODY").count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_recommendation_is_malformed() {
        let llm = ScriptedGenerator::new().on_assessment(
            r#"{"technicalScore": 1, "experienceScore": 1, "educationScore": 1,
                "culturalScore": 1, "recommendation": "Absolutely"}"#,
        );
        let candidate = candidate_fixture(1);
        let err = generate_assessment(
            &llm,
            AssessmentInput {
                candidate: &candidate,
                skills: &[],
                resume_text: "",
                role_title: "Role",
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Failed to generate assessment");
    }

    fn draft(scores: [f64; 4]) -> AssessmentDraft {
        AssessmentDraft {
            technical_score: scores[0],
            experience_score: scores[1],
            education_score: scores[2],
            cultural_score: scores[3],
            recommendation: Recommendation::Maybe,
            detailed_comments: String::new(),
            strengths: vec![],
            weaknesses: vec![],
        }
    }

    #[test]
    fn test_overall_score_rounds_half_up() {
        assert_eq!(draft([80.0, 70.0, 90.0, 60.0]).overall_score(), 75);
        // 250 / 4 = 62.5
        assert_eq!(draft([70.0, 60.0, 60.0, 60.0]).overall_score(), 63);
        // 249 / 4 = 62.25
        assert_eq!(draft([69.0, 60.0, 60.0, 60.0]).overall_score(), 62);
        assert_eq!(draft([0.0, 0.0, 0.0, 0.0]).overall_score(), 0);
        assert_eq!(draft([100.0, 100.0, 100.0, 100.0]).overall_score(), 100);
    }
}
