//! Database models and domain types.

use chrono::{NaiveDate, NaiveDateTime};
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::instrument;
use vuot_rewards::{ProgressState, RewardSummary};

use crate::db::{DbError, schema};

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Anonymous account created by the guest-first flow.
    Guest,
    /// Registered learner.
    Student,
    /// Manages the question bank.
    Admin,
}

/// Kind of question in the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Match pairs of cards.
    MatchingPair,
    /// Pick one option.
    MultipleChoice,
    /// True or false.
    TrueFalse,
    /// Fill in the blank.
    FillBlank,
}

impl QuestionType {
    /// All accepted question types, in display order.
    pub const ALL: [Self; 4] = [
        Self::MatchingPair,
        Self::MultipleChoice,
        Self::TrueFalse,
        Self::FillBlank,
    ];
}

/// Kind of shop item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Profile picture.
    Avatar,
    /// Colour theme.
    Theme,
    /// Streak freeze shield.
    FreezeStreak,
    /// Temporary boost.
    Boost,
}

/// Availability of a shop item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Can be bought.
    Active,
    /// Hidden from the catalogue.
    Inactive,
    /// Out of stock.
    SoldOut,
}

/// Stock value meaning the item never runs out.
pub const UNLIMITED_STOCK: i32 = -1;

/// User account database model.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters, Serialize)]
#[diesel(table_name = schema::users)]
pub struct User {
    id: i32,
    email: Option<String>,
    #[serde(skip_serializing)]
    password_hash: Option<String>,
    full_name: Option<String>,
    avatar_url: Option<String>,
    role: String,
    is_anonymous: bool,
    stars_balance: i32,
    current_streak: i32,
    max_streak: i32,
    freeze_streaks: i32,
    last_learnt_date: Option<NaiveDate>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl User {
    /// Parses the stored role.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the column holds an unknown role.
    #[instrument(skip(self), fields(user_id = self.id, role = %self.role))]
    pub fn parse_role(&self) -> Result<Role, DbError> {
        self.role
            .parse()
            .map_err(|_| DbError::new(format!("Invalid role: '{}'", self.role)))
    }

    /// Whether this account is an anonymous guest.
    pub fn is_guest(&self) -> bool {
        self.is_anonymous && self.role == Role::Guest.as_ref()
    }

    /// Reads the reward counters into the engine's state type.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a stored counter is negative.
    #[instrument(skip(self), fields(user_id = self.id))]
    pub fn progress(&self) -> Result<ProgressState, DbError> {
        Ok(ProgressState::new(
            u32::try_from(self.stars_balance)?,
            u32::try_from(self.current_streak)?,
            u32::try_from(self.max_streak)?,
            u32::try_from(self.freeze_streaks)?,
            self.last_learnt_date,
        ))
    }
}

/// Insertable user model for guests, students and admins.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::users)]
pub struct NewUser {
    email: Option<String>,
    password_hash: Option<String>,
    full_name: Option<String>,
    role: String,
    is_anonymous: bool,
    stars_balance: i32,
    freeze_streaks: i32,
}

/// Credentials attached when a guest upgrades or a student registers.
#[derive(Debug, Clone, AsChangeset, new)]
#[diesel(table_name = schema::users)]
pub struct Credentials {
    email: String,
    password_hash: String,
    full_name: Option<String>,
    role: String,
    is_anonymous: bool,
    updated_at: NaiveDateTime,
}

/// Reward counters written back after a submission.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = schema::users)]
pub struct ProgressUpdate {
    stars_balance: i32,
    current_streak: i32,
    max_streak: i32,
    freeze_streaks: i32,
    last_learnt_date: Option<NaiveDate>,
    updated_at: NaiveDateTime,
}

impl ProgressUpdate {
    /// Converts engine state into a row update stamped with `now`.
    ///
    /// Counters saturate at the column bound `i32::MAX`.
    #[instrument(skip(state))]
    pub fn from_state(state: &ProgressState, now: NaiveDateTime) -> Self {
        Self {
            stars_balance: saturate_column(*state.stars_balance()),
            current_streak: saturate_column(*state.current_streak()),
            max_streak: saturate_column(*state.max_streak()),
            freeze_streaks: saturate_column(*state.freeze_streaks()),
            last_learnt_date: *state.last_learnt_date(),
            updated_at: now,
        }
    }
}

fn saturate_column(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// A submitted quiz attempt.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters, Serialize)]
#[diesel(table_name = schema::exam_results)]
#[diesel(belongs_to(User))]
pub struct ExamResult {
    id: i32,
    user_id: i32,
    exam_type: String,
    score: i32,
    details_json: Option<String>,
    created_at: NaiveDateTime,
}

/// Insertable quiz attempt.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::exam_results)]
pub struct NewExamResult {
    user_id: i32,
    exam_type: String,
    score: i32,
    details_json: Option<String>,
}

/// Aggregate figures over a user's attempts.
#[derive(Debug, Clone, PartialEq, Getters, Serialize)]
pub struct ExamStats {
    total_exams: i64,
    avg_score: f64,
    max_score: Option<i32>,
    min_score: Option<i32>,
    days_active: i64,
}

impl ExamStats {
    /// Computes the figures from a user's attempts.
    #[instrument(skip(results), fields(count = results.len()))]
    pub fn from_results(results: &[ExamResult]) -> Self {
        let total = results.len() as i64;
        let sum: i64 = results.iter().map(|r| i64::from(r.score)).sum();
        let avg_score = if total == 0 {
            0.0
        } else {
            sum as f64 / total as f64
        };
        let mut days: Vec<NaiveDate> = results.iter().map(|r| r.created_at.date()).collect();
        days.sort_unstable();
        days.dedup();

        Self {
            total_exams: total,
            avg_score,
            max_score: results.iter().map(|r| r.score).max(),
            min_score: results.iter().map(|r| r.score).min(),
            days_active: days.len() as i64,
        }
    }
}

/// Aggregate figures for one exam type.
#[derive(Debug, Clone, PartialEq, Getters, Serialize)]
pub struct ExamTypeStats {
    exam_type: String,
    count: i64,
    avg_score: f64,
    max_score: i32,
}

impl ExamTypeStats {
    /// Groups attempts by exam type, ordered by type name.
    #[instrument(skip(results), fields(count = results.len()))]
    pub fn group(results: &[ExamResult]) -> Vec<Self> {
        let mut grouped: std::collections::BTreeMap<&str, Vec<i32>> = Default::default();
        for r in results {
            grouped.entry(r.exam_type.as_str()).or_default().push(r.score);
        }
        grouped
            .into_iter()
            .map(|(exam_type, scores)| {
                let count = scores.len() as i64;
                let sum: i64 = scores.iter().copied().map(i64::from).sum();
                Self {
                    exam_type: exam_type.to_string(),
                    count,
                    avg_score: sum as f64 / count as f64,
                    max_score: scores.into_iter().max().unwrap_or_default(),
                }
            })
            .collect()
    }
}

/// Question bank entry.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::questions)]
pub struct Question {
    id: i32,
    content_json: String,
    correct_answer: String,
    question_type: String,
    explanation: Option<String>,
    is_premium: bool,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// Insertable question.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::questions)]
pub struct NewQuestion {
    content_json: String,
    correct_answer: String,
    question_type: String,
    explanation: Option<String>,
    is_premium: bool,
}

/// Partial question update; `None` fields keep their stored value.
#[derive(Debug, Clone, Default, AsChangeset, new)]
#[diesel(table_name = schema::questions)]
pub struct QuestionChanges {
    content_json: Option<String>,
    correct_answer: Option<String>,
    question_type: Option<String>,
    explanation: Option<Option<String>>,
    is_premium: Option<bool>,
    updated_at: Option<NaiveDateTime>,
}

/// Key/value tag attached to a question.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::question_tags)]
#[diesel(belongs_to(Question))]
pub struct QuestionTag {
    id: i32,
    question_id: i32,
    tag_key: String,
    tag_value: String,
}

/// A tag as supplied by callers, before it is tied to a question.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, new)]
pub struct Tag {
    tag_key: String,
    tag_value: String,
}

impl From<QuestionTag> for Tag {
    fn from(tag: QuestionTag) -> Self {
        Self {
            tag_key: tag.tag_key,
            tag_value: tag.tag_value,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::question_tags)]
pub(crate) struct NewQuestionTag<'a> {
    pub(crate) question_id: i32,
    pub(crate) tag_key: &'a str,
    pub(crate) tag_value: &'a str,
}

/// Shop catalogue entry.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters, Serialize)]
#[diesel(table_name = schema::shop_items)]
pub struct ShopItem {
    id: i32,
    item_name: String,
    item_description: Option<String>,
    item_type: String,
    star_cost: i32,
    stock_quantity: i32,
    image_url: Option<String>,
    display_order: i32,
    status: String,
    #[serde(skip_serializing)]
    created_at: NaiveDateTime,
    #[serde(skip_serializing)]
    updated_at: NaiveDateTime,
}

impl ShopItem {
    /// Whether the item has no stock limit.
    pub fn is_unlimited(&self) -> bool {
        self.stock_quantity == UNLIMITED_STOCK
    }
}

/// Insertable purchase record.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::user_purchases)]
pub struct NewPurchase {
    user_id: i32,
    shop_item_id: i32,
    stars_spent: i32,
    quantity: i32,
    status: String,
}

/// Stored purchase record.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters, Serialize)]
#[diesel(table_name = schema::user_purchases)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(ShopItem))]
pub struct Purchase {
    id: i32,
    user_id: i32,
    shop_item_id: i32,
    stars_spent: i32,
    quantity: i32,
    status: String,
    created_at: NaiveDateTime,
}

/// Purchase joined with the item it bought.
#[derive(Debug, Clone, Getters, Serialize, new)]
pub struct PurchaseRecord {
    id: i32,
    stars_spent: i32,
    quantity: i32,
    status: String,
    created_at: NaiveDateTime,
    item_name: String,
    item_description: Option<String>,
    item_type: String,
}

/// Owned quantity of one item.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, new)]
pub struct InventoryEntry {
    item_name: String,
    item_type: String,
    item_description: Option<String>,
    total_quantity: i64,
    purchase_count: i64,
}

/// Outcome of a successful purchase.
#[derive(Debug, Clone, Getters, Serialize, new)]
pub struct PurchaseReceipt {
    purchase_id: i32,
    item_name: String,
    quantity: i32,
    stars_spent: i32,
    #[serde(rename = "new_total_stars")]
    new_stars_balance: i32,
}

/// Why a purchase was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseRejection {
    /// No item has the requested id.
    UnknownItem,
    /// Item is not active.
    Unavailable,
    /// Finite stock is lower than the requested quantity.
    InsufficientStock,
    /// Star balance is below the total cost.
    NotEnoughStars {
        /// Total cost of the order.
        required: i32,
        /// Current balance.
        current: i32,
    },
}

/// Result of attempting a purchase inside the store transaction.
#[derive(Debug, Clone)]
pub enum PurchaseOutcome {
    /// Stars deducted and purchase recorded.
    Completed(PurchaseReceipt),
    /// Nothing was written.
    Rejected(PurchaseRejection),
}

/// Limit/offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, new)]
pub struct Page {
    limit: i64,
    offset: i64,
}

/// Everything written by one result submission.
#[derive(Debug, Clone, Getters)]
pub struct Submission {
    exam_result: ExamResult,
    user: User,
    summary: RewardSummary,
}

impl Submission {
    pub(crate) fn new(exam_result: ExamResult, user: User, summary: RewardSummary) -> Self {
        Self {
            exam_result,
            user,
            summary,
        }
    }
}
