//! Database repository for accounts, results, questions and the shop.

use chrono::Utc;
use diesel::connection::SimpleConnection;
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::Integer;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument, warn};
use vuot_rewards::{ProgressState, RewardSummary};

use crate::db::models::NewQuestionTag;
use crate::db::{
    Credentials, DbError, ExamResult, InventoryEntry, ItemStatus, NewExamResult, NewPurchase,
    NewQuestion, NewUser, Page, ProgressUpdate, Purchase, PurchaseOutcome, PurchaseReceipt,
    PurchaseRecord, PurchaseRejection, Question, QuestionChanges, QuestionTag, Role, ShopItem,
    Submission, Tag, User, schema,
};

/// Schema migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// A question together with its tags.
pub type TaggedQuestion = (Question, Vec<Tag>);

/// Database repository for every persisted entity.
///
/// Each operation opens its own connection; SQLite serialises writers, and the
/// multi-statement operations run inside immediate transactions.
#[derive(Debug, Clone)]
pub struct QuizRepository {
    db_path: String,
}

impl QuizRepository {
    /// Creates a new repository for the database file at the given path.
    ///
    /// Every operation opens a fresh connection, so `":memory:"` would give each
    /// call its own empty database. Use a file path.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.trim().is_empty() {
            return Err(DbError::new("Database path is empty"));
        }
        info!(path = %db_path, "Creating QuizRepository");
        Ok(Self { db_path })
    }

    /// Establishes a database connection with foreign keys enforced.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.db_path).map_err(|e| {
            DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e))
        })?;
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
        Ok(conn)
    }

    /// Applies pending migrations and switches the file to WAL mode.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a migration fails.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<usize, DbError> {
        let mut conn = self.connection()?;
        conn.batch_execute("PRAGMA journal_mode = WAL;")?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migration failed: {}", e)))?;
        info!(count = applied.len(), "Migrations applied");
        Ok(applied.len())
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Inserts a new user.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] with a conflict kind if the email is taken.
    #[instrument(skip(self, new_user))]
    pub fn create_user(&self, new_user: NewUser) -> Result<User, DbError> {
        let mut conn = self.connection()?;

        let user = diesel::insert_into(schema::users::table)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result(&mut conn)?;

        info!(user_id = user.id(), role = %user.role(), "User created");
        Ok(user)
    }

    /// Gets a user by id. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_user(&self, user_id: i32) -> Result<Option<User>, DbError> {
        let mut conn = self.connection()?;

        let user = schema::users::table
            .find(user_id)
            .select(User::as_select())
            .first(&mut conn)
            .optional()?;

        if user.is_none() {
            debug!(user_id, "User not found");
        }
        Ok(user)
    }

    /// Gets a user by email. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let mut conn = self.connection()?;

        let user = schema::users::table
            .filter(schema::users::email.eq(email))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(user)
    }

    /// Attaches credentials to a guest account, keeping its stars and streak.
    ///
    /// Returns `None` when `guest_id` does not name an anonymous guest.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] with a conflict kind if the email is taken.
    #[instrument(skip(self, credentials))]
    pub fn upgrade_guest(
        &self,
        guest_id: i32,
        credentials: Credentials,
    ) -> Result<Option<User>, DbError> {
        let mut conn = self.connection()?;

        conn.immediate_transaction(|conn| {
            let guest = schema::users::table
                .filter(schema::users::id.eq(guest_id))
                .filter(schema::users::role.eq(Role::Guest.as_ref()))
                .filter(schema::users::is_anonymous.eq(true))
                .select(User::as_select())
                .first(conn)
                .optional()?;

            let Some(guest) = guest else {
                debug!(guest_id, "No guest account to upgrade");
                return Ok(None);
            };

            let user = diesel::update(schema::users::table.find(guest.id()))
                .set(&credentials)
                .returning(User::as_returning())
                .get_result(conn)?;

            info!(
                user_id = user.id(),
                stars = user.stars_balance(),
                streak = user.current_streak(),
                "Guest upgraded"
            );
            Ok(Some(user))
        })
    }

    // ------------------------------------------------------------------
    // Exam results
    // ------------------------------------------------------------------

    /// Records an attempt and applies its reward in one transaction.
    ///
    /// `settle` receives the user's stored progress and returns the new
    /// progress; both the attempt row and the user update commit together.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] with a not-found kind if the user does not exist.
    #[instrument(skip(self, result, settle), fields(user_id = result.user_id(), exam_type = %result.exam_type(), score = result.score()))]
    pub fn record_submission<F>(&self, result: NewExamResult, settle: F) -> Result<Submission, DbError>
    where
        F: FnOnce(&ProgressState) -> (ProgressState, RewardSummary),
    {
        debug!("Recording submission");
        let mut conn = self.connection()?;

        conn.immediate_transaction(|conn| {
            let user = schema::users::table
                .find(*result.user_id())
                .select(User::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| DbError::not_found(format!("User {} not found", result.user_id())))?;

            let exam_result = diesel::insert_into(schema::exam_results::table)
                .values(&result)
                .returning(ExamResult::as_returning())
                .get_result(conn)?;

            let (next, summary) = settle(&user.progress()?);
            let update = ProgressUpdate::from_state(&next, Utc::now().naive_utc());

            let user = diesel::update(schema::users::table.find(user.id()))
                .set(&update)
                .returning(User::as_returning())
                .get_result(conn)?;

            info!(
                exam_result_id = exam_result.id(),
                stars_balance = user.stars_balance(),
                current_streak = user.current_streak(),
                "Submission recorded"
            );
            Ok(Submission::new(exam_result, user, summary))
        })
    }

    /// Lists a user's attempts, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_results(&self, user_id: i32, page: Page) -> Result<Vec<ExamResult>, DbError> {
        let mut conn = self.connection()?;

        let results = schema::exam_results::table
            .filter(schema::exam_results::user_id.eq(user_id))
            .order((
                schema::exam_results::created_at.desc(),
                schema::exam_results::id.desc(),
            ))
            .limit(*page.limit())
            .offset(*page.offset())
            .select(ExamResult::as_select())
            .load(&mut conn)?;

        debug!(count = results.len(), "Results loaded");
        Ok(results)
    }

    /// Loads every attempt of a user, for aggregation.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn all_results(&self, user_id: i32) -> Result<Vec<ExamResult>, DbError> {
        let mut conn = self.connection()?;

        let results = schema::exam_results::table
            .filter(schema::exam_results::user_id.eq(user_id))
            .select(ExamResult::as_select())
            .load(&mut conn)?;

        Ok(results)
    }

    // ------------------------------------------------------------------
    // Question bank
    // ------------------------------------------------------------------

    /// Inserts a question and its tags atomically.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, question, tags), fields(tag_count = tags.len()))]
    pub fn create_question(
        &self,
        question: NewQuestion,
        tags: &[Tag],
    ) -> Result<TaggedQuestion, DbError> {
        let mut conn = self.connection()?;

        conn.immediate_transaction(|conn| {
            let created = diesel::insert_into(schema::questions::table)
                .values(&question)
                .returning(Question::as_returning())
                .get_result(conn)?;

            insert_tags(conn, *created.id(), tags)?;
            let tags = load_tags(conn, *created.id())?;

            info!(question_id = created.id(), tags = tags.len(), "Question created");
            Ok((created, tags))
        })
    }

    /// Applies a partial update, replacing all tags when `tags` is given.
    ///
    /// Returns `None` if the question does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, changes, tags))]
    pub fn update_question(
        &self,
        question_id: i32,
        changes: QuestionChanges,
        tags: Option<&[Tag]>,
    ) -> Result<Option<TaggedQuestion>, DbError> {
        let mut conn = self.connection()?;

        conn.immediate_transaction(|conn| {
            let updated = diesel::update(schema::questions::table.find(question_id))
                .set(&changes)
                .returning(Question::as_returning())
                .get_result(conn)
                .optional()?;

            let Some(updated) = updated else {
                debug!(question_id, "Question not found for update");
                return Ok(None);
            };

            if let Some(tags) = tags {
                diesel::delete(
                    schema::question_tags::table
                        .filter(schema::question_tags::question_id.eq(question_id)),
                )
                .execute(conn)?;
                insert_tags(conn, question_id, tags)?;
            }

            let tags = load_tags(conn, question_id)?;
            info!(question_id, "Question updated");
            Ok(Some((updated, tags)))
        })
    }

    /// Deletes a question and its tags. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn delete_question(&self, question_id: i32) -> Result<bool, DbError> {
        let mut conn = self.connection()?;

        conn.immediate_transaction(|conn| {
            diesel::delete(
                schema::question_tags::table
                    .filter(schema::question_tags::question_id.eq(question_id)),
            )
            .execute(conn)?;

            let removed = diesel::delete(schema::questions::table.find(question_id)).execute(conn)?;
            info!(question_id, removed, "Question deleted");
            Ok(removed > 0)
        })
    }

    /// Gets one question with its tags.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_question(&self, question_id: i32) -> Result<Option<TaggedQuestion>, DbError> {
        let mut conn = self.connection()?;

        let question = schema::questions::table
            .find(question_id)
            .select(Question::as_select())
            .first(&mut conn)
            .optional()?;

        match question {
            Some(q) => {
                let tags = load_tags(&mut conn, *q.id())?;
                Ok(Some((q, tags)))
            }
            None => Ok(None),
        }
    }

    /// Lists the whole bank, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_questions(&self, page: Page) -> Result<Vec<TaggedQuestion>, DbError> {
        let mut conn = self.connection()?;

        let questions = schema::questions::table
            .order((schema::questions::created_at.desc(), schema::questions::id.desc()))
            .limit(*page.limit())
            .offset(*page.offset())
            .select(Question::as_select())
            .load(&mut conn)?;

        attach_tags(&mut conn, questions)
    }

    /// Lists questions carrying a tag value (optionally under a specific key),
    /// newest first. With no value every question qualifies.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn questions_by_tag(
        &self,
        tag_key: Option<&str>,
        tag_value: Option<&str>,
        limit: i64,
    ) -> Result<Vec<TaggedQuestion>, DbError> {
        let mut conn = self.connection()?;

        let mut query = schema::questions::table.into_boxed();
        if let Some(value) = tag_value {
            let mut tagged = schema::question_tags::table
                .filter(schema::question_tags::tag_value.eq(value.to_string()))
                .select(schema::question_tags::question_id)
                .into_boxed();
            if let Some(key) = tag_key {
                tagged = tagged.filter(schema::question_tags::tag_key.eq(key.to_string()));
            }
            query = query.filter(schema::questions::id.eq_any(tagged));
        }

        let questions = query
            .order((schema::questions::created_at.desc(), schema::questions::id.desc()))
            .limit(limit)
            .select(Question::as_select())
            .load(&mut conn)?;

        debug!(count = questions.len(), "Questions matched tag filter");
        attach_tags(&mut conn, questions)
    }

    /// Draws up to `limit` random questions, filtered by the subject and
    /// game-type tags when given.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn random_questions(
        &self,
        subject_key: &str,
        subject: Option<&str>,
        game_type: Option<&str>,
        limit: i64,
    ) -> Result<Vec<TaggedQuestion>, DbError> {
        let mut conn = self.connection()?;

        let mut query = schema::questions::table.into_boxed();
        if let Some(subject) = subject {
            query = query.filter(
                schema::questions::id.eq_any(
                    schema::question_tags::table
                        .filter(schema::question_tags::tag_key.eq(subject_key.to_string()))
                        .filter(schema::question_tags::tag_value.eq(subject.to_string()))
                        .select(schema::question_tags::question_id),
                ),
            );
        }
        if let Some(game_type) = game_type {
            query = query.filter(
                schema::questions::id.eq_any(
                    schema::question_tags::table
                        .filter(schema::question_tags::tag_key.eq("game_type"))
                        .filter(schema::question_tags::tag_value.eq(game_type.to_string()))
                        .select(schema::question_tags::question_id),
                ),
            );
        }

        let questions = query
            .order(sql::<Integer>("RANDOM()"))
            .limit(limit)
            .select(Question::as_select())
            .load(&mut conn)?;

        info!(count = questions.len(), "Random questions drawn");
        attach_tags(&mut conn, questions)
    }

    // ------------------------------------------------------------------
    // Shop
    // ------------------------------------------------------------------

    /// Lists catalogue items with the given status, in display order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_items(&self, status: &str, item_type: Option<&str>) -> Result<Vec<ShopItem>, DbError> {
        let mut conn = self.connection()?;

        let mut query = schema::shop_items::table
            .filter(schema::shop_items::status.eq(status.to_string()))
            .into_boxed();
        if let Some(item_type) = item_type {
            query = query.filter(schema::shop_items::item_type.eq(item_type.to_string()));
        }

        let items = query
            .order((schema::shop_items::display_order.asc(), schema::shop_items::id.asc()))
            .select(ShopItem::as_select())
            .load(&mut conn)?;

        debug!(count = items.len(), "Shop items loaded");
        Ok(items)
    }

    /// Buys `quantity` of an item for a user.
    ///
    /// Inside one transaction: checks availability, stock and balance, deducts
    /// stars, decrements finite stock and records the purchase. A rejection
    /// writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] with a not-found kind if the user is missing.
    #[instrument(skip(self))]
    pub fn purchase(
        &self,
        user_id: i32,
        item_id: i32,
        quantity: i32,
    ) -> Result<PurchaseOutcome, DbError> {
        let mut conn = self.connection()?;

        conn.immediate_transaction(|conn| {
            let item = schema::shop_items::table
                .find(item_id)
                .select(ShopItem::as_select())
                .first(conn)
                .optional()?;

            let Some(item) = item else {
                debug!(item_id, "Item not found");
                return Ok(PurchaseOutcome::Rejected(PurchaseRejection::UnknownItem));
            };

            if item.status() != ItemStatus::Active.as_ref() {
                warn!(item_id, status = %item.status(), "Item not purchasable");
                return Ok(PurchaseOutcome::Rejected(PurchaseRejection::Unavailable));
            }

            if !item.is_unlimited() && *item.stock_quantity() < quantity {
                warn!(item_id, stock = item.stock_quantity(), quantity, "Insufficient stock");
                return Ok(PurchaseOutcome::Rejected(PurchaseRejection::InsufficientStock));
            }

            let user = schema::users::table
                .find(user_id)
                .select(User::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| DbError::not_found(format!("User {} not found", user_id)))?;

            let total_cost = item.star_cost().checked_mul(quantity).unwrap_or(i32::MAX);
            if *user.stars_balance() < total_cost {
                debug!(balance = user.stars_balance(), total_cost, "Not enough stars");
                return Ok(PurchaseOutcome::Rejected(PurchaseRejection::NotEnoughStars {
                    required: total_cost,
                    current: *user.stars_balance(),
                }));
            }

            let now = Utc::now().naive_utc();
            let new_balance: i32 = diesel::update(schema::users::table.find(user_id))
                .set((
                    schema::users::stars_balance.eq(schema::users::stars_balance - total_cost),
                    schema::users::updated_at.eq(now),
                ))
                .returning(schema::users::stars_balance)
                .get_result(conn)?;

            if !item.is_unlimited() {
                diesel::update(schema::shop_items::table.find(item_id))
                    .set((
                        schema::shop_items::stock_quantity
                            .eq(schema::shop_items::stock_quantity - quantity),
                        schema::shop_items::updated_at.eq(now),
                    ))
                    .execute(conn)?;
            }

            let purchase = diesel::insert_into(schema::user_purchases::table)
                .values(&NewPurchase::new(
                    user_id,
                    item_id,
                    total_cost,
                    quantity,
                    "completed".to_string(),
                ))
                .returning(Purchase::as_returning())
                .get_result(conn)?;

            info!(
                purchase_id = purchase.id(),
                item = %item.item_name(),
                total_cost,
                new_balance,
                "Purchase completed"
            );

            Ok(PurchaseOutcome::Completed(PurchaseReceipt::new(
                *purchase.id(),
                item.item_name().clone(),
                quantity,
                total_cost,
                new_balance,
            )))
        })
    }

    /// Lists a user's purchases with item details, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_purchases(&self, user_id: i32, page: Page) -> Result<Vec<PurchaseRecord>, DbError> {
        let mut conn = self.connection()?;

        let rows = schema::user_purchases::table
            .inner_join(schema::shop_items::table)
            .filter(schema::user_purchases::user_id.eq(user_id))
            .order((
                schema::user_purchases::created_at.desc(),
                schema::user_purchases::id.desc(),
            ))
            .limit(*page.limit())
            .offset(*page.offset())
            .select((Purchase::as_select(), ShopItem::as_select()))
            .load::<(Purchase, ShopItem)>(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(p, item)| {
                PurchaseRecord::new(
                    *p.id(),
                    *p.stars_spent(),
                    *p.quantity(),
                    p.status().clone(),
                    *p.created_at(),
                    item.item_name().clone(),
                    item.item_description().clone(),
                    item.item_type().clone(),
                )
            })
            .collect())
    }

    /// Counts all purchases of a user.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn count_purchases(&self, user_id: i32) -> Result<i64, DbError> {
        let mut conn = self.connection()?;

        let count = schema::user_purchases::table
            .filter(schema::user_purchases::user_id.eq(user_id))
            .count()
            .get_result(&mut conn)?;

        Ok(count)
    }

    /// Sums completed purchases per item, largest holdings first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn inventory(&self, user_id: i32) -> Result<Vec<InventoryEntry>, DbError> {
        let mut conn = self.connection()?;

        let rows = schema::user_purchases::table
            .inner_join(schema::shop_items::table)
            .filter(schema::user_purchases::user_id.eq(user_id))
            .filter(schema::user_purchases::status.eq("completed"))
            .select((Purchase::as_select(), ShopItem::as_select()))
            .load::<(Purchase, ShopItem)>(&mut conn)?;

        let mut grouped: std::collections::BTreeMap<i32, (ShopItem, i64, i64)> = Default::default();
        for (purchase, item) in rows {
            let entry = grouped.entry(*item.id()).or_insert((item, 0, 0));
            entry.1 += i64::from(*purchase.quantity());
            entry.2 += 1;
        }

        let mut inventory: Vec<InventoryEntry> = grouped
            .into_values()
            .map(|(item, total_quantity, purchase_count)| {
                InventoryEntry::new(
                    item.item_name().clone(),
                    item.item_type().clone(),
                    item.item_description().clone(),
                    total_quantity,
                    purchase_count,
                )
            })
            .collect();
        inventory.sort_by(|a, b| b.total_quantity().cmp(a.total_quantity()));

        info!(user_id, items = inventory.len(), "Inventory computed");
        Ok(inventory)
    }
}

fn insert_tags(conn: &mut SqliteConnection, question_id: i32, tags: &[Tag]) -> Result<(), DbError> {
    let rows: Vec<NewQuestionTag<'_>> = tags
        .iter()
        .map(|t| NewQuestionTag {
            question_id,
            tag_key: t.tag_key(),
            tag_value: t.tag_value(),
        })
        .collect();

    if !rows.is_empty() {
        diesel::insert_into(schema::question_tags::table)
            .values(&rows)
            .execute(conn)?;
    }
    Ok(())
}

fn load_tags(conn: &mut SqliteConnection, question_id: i32) -> Result<Vec<Tag>, DbError> {
    let tags = schema::question_tags::table
        .filter(schema::question_tags::question_id.eq(question_id))
        .order(schema::question_tags::id.asc())
        .select(QuestionTag::as_select())
        .load(conn)?;

    Ok(tags.into_iter().map(Tag::from).collect())
}

fn attach_tags(
    conn: &mut SqliteConnection,
    questions: Vec<Question>,
) -> Result<Vec<TaggedQuestion>, DbError> {
    let tags = QuestionTag::belonging_to(&questions)
        .order(schema::question_tags::id.asc())
        .select(QuestionTag::as_select())
        .load(conn)?;

    let grouped = tags.grouped_by(&questions);
    Ok(questions
        .into_iter()
        .zip(grouped)
        .map(|(q, tags)| (q, tags.into_iter().map(Tag::from).collect()))
        .collect())
}
