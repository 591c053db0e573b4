use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::core::config::Settings;

#[derive(Debug, Error)]
pub(crate) enum BankError {
    #[error("question bank unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QuestionOption {
    #[serde(alias = "optionId")]
    pub(crate) option_id: String,
    pub(crate) text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) subject: Option<String>,
    #[serde(default = "default_marks")]
    pub(crate) marks: u32,
    pub(crate) options: Vec<QuestionOption>,
    #[serde(alias = "correctOptionId")]
    pub(crate) correct_option_id: String,
}

fn default_marks() -> u32 {
    1
}

/// Read-only collaborator supplying question content and answer correctness.
/// The orchestration engine never blocks a state transition on it; a lookup
/// failure leaves the score pending.
pub(crate) trait QuestionBank: Send + Sync {
    fn question(&self, index: u32) -> Result<Option<Question>, BankError>;
    fn correct_option(&self, question_id: &str) -> Result<Option<String>, BankError>;
    fn total(&self) -> usize;
}

pub(crate) struct StaticQuestionBank {
    questions: Vec<Question>,
    correct_by_id: HashMap<String, String>,
}

impl StaticQuestionBank {
    pub(crate) fn from_questions(questions: Vec<Question>) -> Self {
        let correct_by_id = questions
            .iter()
            .map(|question| (question.id.clone(), question.correct_option_id.clone()))
            .collect();
        Self { questions, correct_by_id }
    }

    pub(crate) fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let questions: Vec<Question> = serde_json::from_str(&raw)?;
        Ok(Self::from_questions(questions))
    }

    /// Loads the bank configured in settings. A missing file is tolerated in
    /// non-strict environments so the orchestration engine can run without
    /// content; lookups then return empty results.
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let path = Path::new(settings.question_bank().path.as_str());
        if path.is_file() {
            let bank = Self::from_path(path)?;
            tracing::info!(path = %path.display(), questions = bank.total(), "Question bank loaded");
            return Ok(bank);
        }

        if settings.runtime().strict_config {
            anyhow::bail!("question bank file not found: {}", path.display());
        }

        tracing::warn!(path = %path.display(), "Question bank file missing; serving empty bank");
        Ok(Self::from_questions(Vec::new()))
    }
}

impl QuestionBank for StaticQuestionBank {
    fn question(&self, index: u32) -> Result<Option<Question>, BankError> {
        Ok(self.questions.get(index as usize).cloned())
    }

    fn correct_option(&self, question_id: &str) -> Result<Option<String>, BankError> {
        Ok(self.correct_by_id.get(question_id).cloned())
    }

    fn total(&self) -> usize {
        self.questions.len()
    }
}

/// Correct answers among the recorded ones. Fails only if the collaborator
/// itself fails; unknown question ids simply do not score.
pub(crate) fn score_answers(
    bank: &dyn QuestionBank,
    answers: &HashMap<String, String>,
) -> Result<u32, BankError> {
    let mut score = 0;
    for (question_id, option_id) in answers {
        if let Some(correct) = bank.correct_option(question_id)? {
            if &correct == option_id {
                score += 1;
            }
        }
    }
    Ok(score)
}
