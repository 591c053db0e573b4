use serde::Serialize;

use crate::services::question_bank::Question;

/// Public run overview, safe to show before joining.
#[derive(Debug, Serialize)]
pub(crate) struct ExamActiveResponse {
    pub(crate) is_exam_active: bool,
    pub(crate) countdown_active: bool,
    pub(crate) total_questions: u32,
    pub(crate) question_time_limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) countdown_start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) countdown_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) current_question_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) exam_start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) exam_end_time: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionOptionView {
    pub(crate) option_id: String,
    pub(crate) text: String,
}

/// Question content as shown to a participant. The correct option never
/// crosses this boundary.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionView {
    pub(crate) id: String,
    pub(crate) text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) subject: Option<String>,
    pub(crate) marks: u32,
    pub(crate) options: Vec<QuestionOptionView>,
}

impl From<Question> for QuestionView {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            text: question.text,
            subject: question.subject,
            marks: question.marks,
            options: question
                .options
                .into_iter()
                .map(|option| QuestionOptionView { option_id: option.option_id, text: option.text })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) question: QuestionView,
    pub(crate) question_index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) selected_answer: Option<String>,
    pub(crate) remaining_seconds: i64,
    pub(crate) question_remaining_seconds: i64,
}
