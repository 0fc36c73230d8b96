//! Question bank management and quiz question selection.

use chrono::{NaiveDateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::db::{
    NewQuestion, Page, Question, QuestionChanges, QuestionType, QuizRepository, Tag, TaggedQuestion,
};
use crate::services::ServiceError;
use crate::services::game::check_page;

/// Tag key holding a question's subject.
pub const SUBJECT_TAG_KEY: &str = "môn_học";

/// Questions per quiz by default.
pub const DEFAULT_GAME_LIMIT: i64 = 10;

/// Most questions a single quiz may draw.
pub const MAX_GAME_LIMIT: i64 = 50;

/// Questions per tag search by default.
pub const DEFAULT_TAG_LIMIT: i64 = 10;

/// Questions per admin listing page by default.
pub const DEFAULT_LIST_LIMIT: i64 = 100;

/// Difficulty reported for quiz questions.
pub const DEFAULT_DIFFICULTY: u8 = 1;

/// Points reported for quiz questions.
pub const DEFAULT_POINTS: u8 = 5;

/// Tag as supplied by admins; both parts are required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagInput {
    tag_key: Option<String>,
    tag_value: Option<String>,
}

impl TagInput {
    /// Creates a tag input.
    pub fn new(tag_key: impl Into<String>, tag_value: impl Into<String>) -> Self {
        Self {
            tag_key: Some(tag_key.into()),
            tag_value: Some(tag_value.into()),
        }
    }
}

/// Fields for creating or updating a question.
///
/// On create every field except `explanation` and `is_premium` is required; on
/// update absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionInput {
    /// Question body; an object, or a string holding JSON.
    pub content_json: Option<Value>,
    /// Expected answer.
    pub correct_answer: Option<String>,
    /// One of the [`QuestionType`] names.
    #[serde(rename = "type", alias = "question_type")]
    pub question_type: Option<String>,
    /// Shown after answering.
    pub explanation: Option<String>,
    /// Boolean, or 0/1.
    pub is_premium: Option<Value>,
    /// Classification tags.
    pub tags: Option<Vec<TagInput>>,
}

/// A question as returned to admins and the public bank listing.
#[derive(Debug, Clone, Getters, Serialize)]
pub struct QuestionView {
    id: i32,
    content_json: Value,
    correct_answer: String,
    #[serde(rename = "type")]
    question_type: String,
    explanation: Option<String>,
    is_premium: bool,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    tags: Vec<Tag>,
}

impl From<TaggedQuestion> for QuestionView {
    fn from((question, tags): TaggedQuestion) -> Self {
        Self {
            id: *question.id(),
            content_json: decode_content(&question),
            correct_answer: question.correct_answer().clone(),
            question_type: question.question_type().clone(),
            explanation: question.explanation().clone(),
            is_premium: *question.is_premium(),
            created_at: *question.created_at(),
            updated_at: *question.updated_at(),
            tags,
        }
    }
}

/// One answer option of a quiz question.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize)]
pub struct AnswerOption {
    id: String,
    text: String,
}

/// Display content of a quiz question.
#[derive(Debug, Clone, Getters, Serialize)]
pub struct GameContent {
    question_text: String,
    options: Vec<AnswerOption>,
    question_type: String,
}

/// A question formatted for play.
#[derive(Debug, Clone, Getters, Serialize)]
pub struct GameQuestion {
    id: i32,
    content: GameContent,
    correct_answer: String,
    #[serde(rename = "type")]
    question_type: String,
    explanation: Option<String>,
    is_premium: bool,
    difficulty_level: u8,
    points: u8,
}

impl From<TaggedQuestion> for GameQuestion {
    fn from((question, _tags): TaggedQuestion) -> Self {
        let content = decode_content(&question);
        let question_text = content
            .get("question")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let options = content
            .get("options")
            .and_then(Value::as_array)
            .map(|opts| {
                opts.iter()
                    .zip('A'..='Z')
                    .map(|(opt, letter)| AnswerOption {
                        id: letter.to_string(),
                        text: match opt {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        },
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: *question.id(),
            content: GameContent {
                question_text,
                options,
                question_type: QuestionType::MultipleChoice.to_string(),
            },
            correct_answer: question.correct_answer().clone(),
            question_type: question.question_type().clone(),
            explanation: question.explanation().clone(),
            is_premium: *question.is_premium(),
            difficulty_level: DEFAULT_DIFFICULTY,
            points: DEFAULT_POINTS,
        }
    }
}

fn decode_content(question: &Question) -> Value {
    serde_json::from_str(question.content_json()).unwrap_or_else(|e| {
        warn!(question_id = question.id(), error = %e, "Stored content_json is not JSON");
        Value::String(question.content_json().clone())
    })
}

/// Normalises `content_json` to the JSON text to store.
#[track_caller]
fn encode_content(value: Value) -> Result<String, ServiceError> {
    match value {
        Value::Null => Err(ServiceError::bad_request("content_json is required")),
        Value::String(raw) => serde_json::from_str::<Value>(&raw)
            .map(|_| raw)
            .map_err(|_| ServiceError::bad_request("content_json must be valid JSON")),
        other => Ok(other.to_string()),
    }
}

#[track_caller]
fn parse_type(raw: &str) -> Result<QuestionType, ServiceError> {
    raw.parse().map_err(|_| {
        let names: Vec<String> = QuestionType::ALL.iter().map(ToString::to_string).collect();
        ServiceError::bad_request(format!("Invalid type. Must be one of: {}", names.join(", ")))
    })
}

#[track_caller]
fn parse_tags(tags: Option<Vec<TagInput>>) -> Result<Vec<Tag>, ServiceError> {
    let tags = match tags {
        Some(t) if !t.is_empty() => t,
        _ => {
            return Err(ServiceError::bad_request(
                "tags array is required and must not be empty",
            ));
        }
    };
    tags.into_iter()
        .map(|t| match (t.tag_key, t.tag_value) {
            (Some(k), Some(v)) if !k.is_empty() && !v.is_empty() => Ok(Tag::new(k, v)),
            _ => Err(ServiceError::bad_request(
                "Each tag must have tag_key and tag_value",
            )),
        })
        .collect()
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.as_str(), "1" | "true"),
        _ => false,
    }
}

/// Service layer for the question bank.
#[derive(Debug, Clone)]
pub struct QuestionService {
    repository: QuizRepository,
}

impl QuestionService {
    /// Creates a new question service.
    #[instrument(skip(repository))]
    pub fn new(repository: QuizRepository) -> Self {
        info!("Creating QuestionService");
        Self { repository }
    }

    /// Validates and stores a question with its tags.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] naming the first invalid field.
    #[instrument(skip(self, input))]
    pub fn create(&self, input: QuestionInput) -> Result<QuestionView, ServiceError> {
        let content = input
            .content_json
            .ok_or_else(|| ServiceError::bad_request("content_json is required"))?;
        let correct_answer = input
            .correct_answer
            .filter(|a| !a.is_empty())
            .ok_or_else(|| ServiceError::bad_request("correct_answer is required"))?;
        let raw_type = input.question_type.filter(|t| !t.is_empty()).ok_or_else(|| {
            ServiceError::bad_request(
                "type is required (matching_pair, multiple_choice, true_false, fill_blank)",
            )
        })?;
        let question_type = parse_type(&raw_type)?;
        let tags = parse_tags(input.tags)?;
        let content_json = encode_content(content)?;

        let question = NewQuestion::new(
            content_json,
            correct_answer,
            question_type.to_string(),
            input.explanation.filter(|e| !e.is_empty()),
            input.is_premium.as_ref().is_some_and(truthy),
        );
        let created = self.repository.create_question(question, &tags)?;

        info!(question_id = created.0.id(), tags = tags.len(), "✅ Question created");
        Ok(created.into())
    }

    /// Applies the supplied fields to a question; given tags replace all tags.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] for invalid fields or an unknown question.
    #[instrument(skip(self, input))]
    pub fn update(&self, question_id: i32, input: QuestionInput) -> Result<QuestionView, ServiceError> {
        let content_json = input.content_json.map(encode_content).transpose()?;
        let question_type = input
            .question_type
            .as_deref()
            .map(parse_type)
            .transpose()?
            .map(|t| t.to_string());
        let tags = match input.tags {
            Some(tags) => Some(parse_tags(Some(tags))?),
            None => None,
        };
        if input.correct_answer.as_deref() == Some("") {
            return Err(ServiceError::bad_request("correct_answer must not be empty"));
        }

        let changes = QuestionChanges::new(
            content_json,
            input.correct_answer,
            question_type,
            input.explanation.map(|e| Some(e).filter(|e| !e.is_empty())),
            input.is_premium.as_ref().map(truthy),
            Some(Utc::now().naive_utc()),
        );

        let updated = self
            .repository
            .update_question(question_id, changes, tags.as_deref())?
            .ok_or_else(|| ServiceError::not_found("Question not found"))?;

        info!(question_id, "✅ Question updated");
        Ok(updated.into())
    }

    /// Deletes a question and its tags.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the question does not exist.
    #[instrument(skip(self))]
    pub fn delete(&self, question_id: i32) -> Result<(), ServiceError> {
        if !self.repository.delete_question(question_id)? {
            return Err(ServiceError::not_found("Question not found"));
        }
        info!(question_id, "🗑️ Question deleted");
        Ok(())
    }

    /// Fetches one question with its tags.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the question does not exist.
    #[instrument(skip(self))]
    pub fn get(&self, question_id: i32) -> Result<QuestionView, ServiceError> {
        self.repository
            .get_question(question_id)?
            .map(QuestionView::from)
            .ok_or_else(|| ServiceError::not_found("Question not found"))
    }

    /// Lists the whole bank, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the page is invalid.
    #[instrument(skip(self))]
    pub fn list_all(&self, page: Page) -> Result<Vec<QuestionView>, ServiceError> {
        check_page(&page)?;
        Ok(self
            .repository
            .list_questions(page)?
            .into_iter()
            .map(QuestionView::from)
            .collect())
    }

    /// Lists questions carrying tag value `tag`, optionally under `tag_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if `limit` is not positive.
    #[instrument(skip(self))]
    pub fn by_tag(
        &self,
        tag: Option<&str>,
        tag_key: Option<&str>,
        limit: i64,
    ) -> Result<Vec<QuestionView>, ServiceError> {
        if limit <= 0 {
            return Err(ServiceError::bad_request("limit must be positive"));
        }
        let tag = tag.filter(|t| !t.is_empty());
        let tag_key = tag_key.filter(|k| !k.is_empty());
        if tag.is_none() && tag_key.is_some() {
            debug!("tag_key given without tag, ignoring");
        }

        Ok(self
            .repository
            .questions_by_tag(tag_key, tag, limit)?
            .into_iter()
            .map(QuestionView::from)
            .collect())
    }

    /// Draws a random quiz, optionally filtered by subject and game type.
    ///
    /// `limit` is capped at [`MAX_GAME_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if `limit` is not positive.
    #[instrument(skip(self))]
    pub fn for_game(
        &self,
        subject: Option<&str>,
        game_type: Option<&str>,
        limit: i64,
    ) -> Result<Vec<GameQuestion>, ServiceError> {
        if limit <= 0 {
            return Err(ServiceError::bad_request("limit must be positive"));
        }
        let limit = limit.min(MAX_GAME_LIMIT);

        let questions = self.repository.random_questions(
            SUBJECT_TAG_KEY,
            subject.filter(|s| !s.is_empty()),
            game_type.filter(|g| !g.is_empty()),
            limit,
        )?;

        debug!(count = questions.len(), limit, "🎮 Quiz drawn");
        Ok(questions.into_iter().map(GameQuestion::from).collect())
    }
}
