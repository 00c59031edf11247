//! # Summaries
//!
//! Survey answers folded into one prompt and handed to a text-generation service.
//!
//! ## Prompt Data
//! - Active data: answers grouped under each question still on the survey, first 100 per question.
//! - Historical data: answers keyed by question ids no longer on the survey, first 50 per id.
//!   These come from earlier versions of the survey.
//!
//! ## Model Choice
//! An ordered preference list checked against what the service reports as available.
//! If the listing itself fails, the fixed fallback is used.
//!
//! ## Failures
//! - Unknown survey: not found.
//! - No responses yet: canned "no data" text, the service is never called.
//! - Service failure: surfaced as is, no retry, no partial text.
use std::collections::HashMap;

use async_trait::async_trait;
use records::{
    Database,
    models::{Response, Survey},
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::InsightError;

pub const ACTIVE_ANSWER_LIMIT: usize = 100;
pub const HISTORICAL_ANSWER_LIMIT: usize = 50;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model ids able to generate text.
    async fn available_models(&self) -> Result<Vec<String>, InsightError>;

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, InsightError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelPreference {
    pub candidates: Vec<String>,
    pub fallback: String,
}

impl Default for ModelPreference {
    fn default() -> Self {
        Self {
            candidates: [
                "gemini-2.5-flash",
                "gemini-2.5-pro",
                "gemini-2.0-flash",
                "gemini-1.5-flash",
            ]
            .map(String::from)
            .to_vec(),
            fallback: "gemini-2.5-flash".to_string(),
        }
    }
}

impl ModelPreference {
    pub fn choose(&self, is_available: impl Fn(&str) -> bool) -> &str {
        self.candidates
            .iter()
            .find(|candidate| is_available(candidate))
            .unwrap_or(&self.fallback)
    }

    pub async fn select(&self, generator: &dyn TextGenerator) -> String {
        match generator.available_models().await {
            Ok(available) => self
                .choose(|candidate| available.iter().any(|m| m == candidate))
                .to_string(),
            Err(e) => {
                warn!("Model listing failed, using {}: {e}", self.fallback);
                self.fallback.clone()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Chinese,
}

impl Language {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "zh" | "zh-cn" | "zh-tw" => Language::Chinese,
            _ => Language::English,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Chinese => "Chinese",
        }
    }

    pub fn no_data(self) -> &'static str {
        match self {
            Language::English => "No data available.",
            Language::Chinese => "暂无数据。",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerDigest {
    pub active: String,
    pub historical: String,
}

/// Non-blank answers per question id, in first-seen order.
fn group_answers(responses: &[Response]) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for response in responses {
        for (question_id, answer) in &response.answers {
            let answer = answer.trim();
            if answer.is_empty() {
                continue;
            }

            let slot = *index.entry(question_id.clone()).or_insert_with(|| {
                groups.push((question_id.clone(), Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(answer.to_string());
        }
    }

    groups
}

fn joined(answers: &[String], limit: usize) -> String {
    answers
        .iter()
        .take(limit)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn digest(survey: &Survey, responses: &[Response]) -> AnswerDigest {
    let groups = group_answers(responses);
    let answers_for = |id: &str| {
        groups
            .iter()
            .find(|(question_id, _)| question_id == id)
            .map(|(_, answers)| answers.as_slice())
    };

    let active: Vec<String> = survey
        .questions
        .iter()
        .filter_map(|question| {
            let answers = answers_for(&question.id.to_string()).filter(|a| !a.is_empty())?;

            Some(format!(
                "Question: {}\nAnswers: {}",
                question.text,
                joined(answers, ACTIVE_ANSWER_LIMIT)
            ))
        })
        .collect();

    let historical: Vec<String> = groups
        .iter()
        .filter(|(question_id, _)| {
            !survey
                .questions
                .iter()
                .any(|question| question.id.to_string() == *question_id)
        })
        .map(|(question_id, answers)| {
            format!(
                "Retired question (ID: {question_id}): {}",
                joined(answers, HISTORICAL_ANSWER_LIMIT)
            )
        })
        .collect();

    AnswerDigest {
        active: if active.is_empty() {
            "No active data.".to_string()
        } else {
            active.join("\n\n")
        },
        historical: if historical.is_empty() {
            "No historical data.".to_string()
        } else {
            historical.join("\n\n")
        },
    }
}

pub fn build_prompt(survey_name: &str, digest: &AnswerDigest, language: Language) -> String {
    format!(
        r#"You are an experienced restaurant business consultant. Review the customer survey results for "{survey_name}".

CURRENT QUESTIONS AND ANSWERS:
{active}

ANSWERS TO RETIRED QUESTIONS (earlier versions of the survey):
{historical}

Write the report in {language}, formatted as Markdown, with exactly these sections:

### 1. Customer Persona & Growth Strategy
- **Persona**: who the typical customer is, based on the answers.
- **Growth Strategy**: concrete ways to attract more customers like them.

### 2. Performance Diagnosis
- **Overall Satisfaction**: the general sentiment in a few sentences.
- **Strengths**: what customers like most.
- **Weaknesses**: the most frequent complaints and their likely root causes.

### 3. Suggested New Survey Questions
- Propose **3 new questions** that dig into the weaknesses above.
- For each, explain what it would reveal.
"#,
        active = digest.active,
        historical = digest.historical,
        language = language.name(),
    )
}

pub async fn summarize(
    db: &Database,
    generator: Option<&dyn TextGenerator>,
    preference: &ModelPreference,
    survey_id: Uuid,
    language: &str,
) -> Result<String, InsightError> {
    let generator = generator.ok_or(InsightError::NotConfigured)?;
    let language = Language::from_code(language);

    let survey = db
        .get_survey(survey_id)
        .await?
        .ok_or(InsightError::NotFound("Survey"))?;

    let responses = db.list_responses(Some(survey_id)).await?;
    if responses.is_empty() {
        return Ok(language.no_data().to_string());
    }

    let prompt = build_prompt(&survey.name, &digest(&survey, &responses), language);
    let model = preference.select(generator).await;

    info!(
        "Summarizing survey {survey_id} from {} responses with {model}",
        responses.len()
    );
    generator.generate(&model, &prompt).await
}
