// Resume pipeline LLM prompt templates.
// `{name}` placeholders are substituted by `fill_template`; other braces are literal.

pub const BASIC_INFO_PROMPT: &str = r#"Extract basic information from this resume and return as JSON:

{
  "name": "Full name",
  "email": "Email address",
  "phone": "Phone number or null",
  "location": "City, State or null",
  "experience": "X years",
  "education": "Degree, University",
  "currentRole": "Current job title and company"
}

Resume (first 1000 chars):
{resume_text}

Return ONLY valid JSON, no other text."#;

pub const SKILLS_PROMPT: &str = r#"Analyze this resume and extract technical skills with proficiency estimates.

Return as JSON array:
[
  { "name": "Skill name", "proficiency": 0-100 }
]

Base proficiency on:
- Years of experience mentioned
- Project complexity
- Depth of knowledge indicated

Resume text:
{resume_text}

Return ONLY the JSON array, max 15 skills."#;

pub const ASSESSMENT_PROMPT: &str = r#"Assess this candidate for: {role_title}

Candidate: {name}
Experience: {experience}
Education: {education}
Skills: {skills}

Resume excerpt:
{resume_text}

Provide assessment as JSON:
{
  "technicalScore": 0-100,
  "experienceScore": 0-100,
  "educationScore": 0-100,
  "culturalScore": 0-100,
  "recommendation": "Strong Hire|Hire|Maybe|No Hire",
  "detailedComments": "2-3 sentences",
  "strengths": ["max 4 strengths"],
  "weaknesses": ["max 3 concerns"]
}

Return ONLY JSON."#;

/// Substitutes `{key}` placeholders in one pass. Inserted values are never
/// rescanned, and braces that do not name a known key are copied as-is.
pub fn fill_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
