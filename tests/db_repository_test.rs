//! Tests for database repository operations.

use chrono::{NaiveDate, Utc};
use diesel::{Connection, RunQueryDsl, SqliteConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tempfile::NamedTempFile;

use vuot_vu_mon::{
    Credentials, DbErrorKind, NewExamResult, NewQuestion, NewUser, Page, ProgressState,
    PurchaseOutcome, PurchaseRejection, QuestionChanges, QuizRepository, Role, Score, Tag, User,
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Creates a temporary database file with schema applied, returns the file
/// handle (must stay in scope to keep the file alive) and a ready repository.
fn setup_test_db() -> (NamedTempFile, QuizRepository) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let mut conn = SqliteConnection::establish(&db_path).expect("Failed to connect");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Migrations failed");

    let repo = QuizRepository::new(db_path).expect("Failed to create repository");
    (db_file, repo)
}

fn raw_sql(db: &NamedTempFile, sql: &str) {
    let mut conn = SqliteConnection::establish(db.path().to_str().expect("Invalid path"))
        .expect("Failed to connect");
    diesel::sql_query(sql).execute(&mut conn).expect("SQL failed");
}

fn guest(repo: &QuizRepository) -> User {
    repo.create_user(NewUser::new(None, None, None, Role::Guest.to_string(), true, 0, 2))
        .expect("Create guest failed")
}

fn student(repo: &QuizRepository, email: &str, stars: i32) -> User {
    repo.create_user(NewUser::new(
        Some(email.to_string()),
        Some("hash".to_string()),
        None,
        Role::Student.to_string(),
        false,
        stars,
        2,
    ))
    .expect("Create student failed")
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, d).expect("valid date")
}

#[test]
fn test_empty_path_is_rejected() {
    assert!(QuizRepository::new("  ".to_string()).is_err());
}

#[test]
fn test_run_migrations_is_idempotent() {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let repo = QuizRepository::new(db_file.path().to_str().expect("Invalid path").to_string())
        .expect("Failed to create repository");
    assert_eq!(repo.run_migrations().expect("First run failed"), 2);
    assert_eq!(repo.run_migrations().expect("Second run failed"), 0);
}

#[test]
fn test_create_guest_defaults() {
    let (_db, repo) = setup_test_db();
    let user = guest(&repo);
    assert!(*user.id() > 0);
    assert!(user.is_guest());
    assert_eq!(user.parse_role().expect("role"), Role::Guest);
    assert_eq!(*user.stars_balance(), 0);
    assert_eq!(*user.current_streak(), 0);
    assert_eq!(*user.freeze_streaks(), 2);
    assert!(user.last_learnt_date().is_none());
}

#[test]
fn test_duplicate_email_is_conflict() {
    let (_db, repo) = setup_test_db();
    student(&repo, "a@example.com", 0);
    let err = repo
        .create_user(NewUser::new(
            Some("a@example.com".to_string()),
            None,
            None,
            Role::Student.to_string(),
            false,
            0,
            2,
        ))
        .expect_err("Duplicate email should fail");
    assert_eq!(err.kind, DbErrorKind::Conflict);
}

#[test]
fn test_get_user_by_email() {
    let (_db, repo) = setup_test_db();
    let created = student(&repo, "b@example.com", 0);
    let found = repo
        .get_user_by_email("b@example.com")
        .expect("Query failed")
        .expect("User missing");
    assert_eq!(found.id(), created.id());
    assert!(repo.get_user_by_email("nobody@example.com").expect("Query failed").is_none());
}

#[test]
fn test_upgrade_guest_keeps_progress() {
    let (_db, repo) = setup_test_db();
    let g = guest(&repo);
    repo.record_submission(NewExamResult::new(*g.id(), "quiz".into(), 95, None), |state| {
        vuot_rewards::settle(state, day(1), Score::new(95).expect("score"))
    })
    .expect("Submission failed");

    let upgraded = repo
        .upgrade_guest(
            *g.id(),
            Credentials::new(
                "kid@example.com".into(),
                "hash".into(),
                Some("Bé Na".into()),
                Role::Student.to_string(),
                false,
                Utc::now().naive_utc(),
            ),
        )
        .expect("Upgrade failed")
        .expect("Guest missing");

    assert_eq!(upgraded.id(), g.id());
    assert_eq!(upgraded.email().as_deref(), Some("kid@example.com"));
    assert!(!upgraded.is_anonymous());
    assert_eq!(*upgraded.stars_balance(), 5);
    assert_eq!(*upgraded.current_streak(), 1);
}

#[test]
fn test_upgrade_non_guest_returns_none() {
    let (_db, repo) = setup_test_db();
    let s = student(&repo, "c@example.com", 0);
    let result = repo
        .upgrade_guest(
            *s.id(),
            Credentials::new(
                "d@example.com".into(),
                "hash".into(),
                None,
                Role::Student.to_string(),
                false,
                Utc::now().naive_utc(),
            ),
        )
        .expect("Query failed");
    assert!(result.is_none());
}

#[test]
fn test_record_submission_writes_result_and_progress() {
    let (_db, repo) = setup_test_db();
    let g = guest(&repo);

    let submission = repo
        .record_submission(
            NewExamResult::new(*g.id(), "math".into(), 90, Some("{\"correct\":9}".into())),
            |state| vuot_rewards::settle(state, day(10), Score::new(90).expect("score")),
        )
        .expect("Submission failed");

    assert_eq!(*submission.exam_result().score(), 90);
    assert_eq!(*submission.user().stars_balance(), 5);
    assert_eq!(*submission.user().current_streak(), 1);
    assert_eq!(*submission.user().last_learnt_date(), Some(day(10)));
    assert_eq!(*submission.summary().stars_earned(), 5);

    let stored = repo.get_user(*g.id()).expect("Query failed").expect("User missing");
    assert_eq!(
        stored.progress().expect("progress"),
        ProgressState::new(5, 1, 1, 2, Some(day(10)))
    );
}

#[test]
fn test_record_submission_unknown_user_is_not_found() {
    let (_db, repo) = setup_test_db();
    let err = repo
        .record_submission(NewExamResult::new(999, "math".into(), 50, None), |state| {
            vuot_rewards::settle(state, day(1), Score::new(50).expect("score"))
        })
        .expect_err("Unknown user should fail");
    assert_eq!(err.kind, DbErrorKind::NotFound);
}

#[test]
fn test_record_submission_rolls_back_attempt_when_user_update_fails() {
    let (db, repo) = setup_test_db();
    let g = guest(&repo);
    raw_sql(
        &db,
        "CREATE TRIGGER freeze_progress BEFORE UPDATE OF stars_balance ON users \
         BEGIN SELECT RAISE(ABORT, 'progress locked'); END;",
    );

    repo.record_submission(NewExamResult::new(*g.id(), "math".into(), 90, None), |state| {
        vuot_rewards::settle(state, day(3), Score::new(90).expect("score"))
    })
    .expect_err("Blocked update should fail the submission");

    assert!(repo.all_results(*g.id()).expect("Query failed").is_empty());
    let stored = repo.get_user(*g.id()).expect("Query failed").expect("User missing");
    assert_eq!(
        stored.progress().expect("progress"),
        ProgressState::new(0, 0, 0, 2, None)
    );
}

#[test]
fn test_record_submission_saturates_star_balance() {
    let (db, repo) = setup_test_db();
    let g = guest(&repo);
    raw_sql(
        &db,
        &format!("UPDATE users SET stars_balance = 2147483645 WHERE id = {}", g.id()),
    );

    let submission = repo
        .record_submission(NewExamResult::new(*g.id(), "math".into(), 90, None), |state| {
            vuot_rewards::settle(state, day(3), Score::new(90).expect("score"))
        })
        .expect("Submission near the balance bound failed");

    assert_eq!(*submission.user().stars_balance(), i32::MAX);
    assert_eq!(*submission.user().current_streak(), 1);
    assert_eq!(repo.all_results(*g.id()).expect("Query failed").len(), 1);
}

#[test]
fn test_list_results_pages_newest_first() {
    let (_db, repo) = setup_test_db();
    let g = guest(&repo);
    for score in [10, 20, 30] {
        repo.record_submission(NewExamResult::new(*g.id(), "quiz".into(), score, None), |s| {
            vuot_rewards::settle(s, day(1), Score::new(i64::from(score)).expect("score"))
        })
        .expect("Submission failed");
    }

    let first = repo.list_results(*g.id(), Page::new(2, 0)).expect("Query failed");
    assert_eq!(first.len(), 2);
    assert_eq!(*first[0].score(), 30);
    assert_eq!(*first[1].score(), 20);

    let rest = repo.list_results(*g.id(), Page::new(2, 2)).expect("Query failed");
    assert_eq!(rest.len(), 1);
    assert_eq!(*rest[0].score(), 10);

    assert_eq!(repo.all_results(*g.id()).expect("Query failed").len(), 3);
}

fn tagged(repo: &QuizRepository, text: &str, tags: &[(&str, &str)]) -> i32 {
    let tags: Vec<Tag> = tags
        .iter()
        .map(|(k, v)| Tag::new(k.to_string(), v.to_string()))
        .collect();
    let (question, stored) = repo
        .create_question(
            NewQuestion::new(
                format!("{{\"question\":\"{}\",\"options\":[\"1\",\"2\"]}}", text),
                "1".into(),
                "multiple_choice".into(),
                None,
                false,
            ),
            &tags,
        )
        .expect("Create question failed");
    assert_eq!(stored.len(), tags.len());
    *question.id()
}

#[test]
fn test_question_crud_with_tags() {
    let (_db, repo) = setup_test_db();
    let id = tagged(&repo, "1+0?", &[("môn_học", "toán"), ("lớp", "1")]);

    let (q, tags) = repo.get_question(id).expect("Query failed").expect("Missing");
    assert_eq!(q.question_type(), "multiple_choice");
    assert_eq!(tags[0], Tag::new("môn_học".into(), "toán".into()));

    let changes = QuestionChanges::new(
        None,
        Some("2".into()),
        None,
        Some(Some("vì vậy".into())),
        Some(true),
        Some(Utc::now().naive_utc()),
    );
    let replacement = [Tag::new("lớp".into(), "2".into())];
    let (updated, tags) = repo
        .update_question(id, changes, Some(&replacement))
        .expect("Update failed")
        .expect("Missing");
    assert_eq!(updated.correct_answer(), "2");
    assert_eq!(updated.explanation().as_deref(), Some("vì vậy"));
    assert!(*updated.is_premium());
    assert_eq!(tags, replacement.to_vec());

    assert!(repo.delete_question(id).expect("Delete failed"));
    assert!(repo.get_question(id).expect("Query failed").is_none());
    assert!(!repo.delete_question(id).expect("Delete failed"));
}

#[test]
fn test_update_missing_question_returns_none() {
    let (_db, repo) = setup_test_db();
    let result = repo
        .update_question(
            42,
            QuestionChanges::new(None, None, None, None, None, Some(Utc::now().naive_utc())),
            None,
        )
        .expect("Query failed");
    assert!(result.is_none());
}

#[test]
fn test_questions_by_tag_filters_value_and_key() {
    let (_db, repo) = setup_test_db();
    tagged(&repo, "a", &[("môn_học", "toán")]);
    tagged(&repo, "b", &[("chủ_đề", "toán")]);
    tagged(&repo, "c", &[("môn_học", "tiếng việt")]);

    let by_value = repo.questions_by_tag(None, Some("toán"), 10).expect("Query failed");
    assert_eq!(by_value.len(), 2);

    let by_key = repo
        .questions_by_tag(Some("môn_học"), Some("toán"), 10)
        .expect("Query failed");
    assert_eq!(by_key.len(), 1);

    let everything = repo.questions_by_tag(None, None, 10).expect("Query failed");
    assert_eq!(everything.len(), 3);
    assert_eq!(repo.list_questions(Page::new(2, 0)).expect("Query failed").len(), 2);
}

#[test]
fn test_random_questions_combines_subject_and_game_type() {
    let (_db, repo) = setup_test_db();
    let both = tagged(&repo, "a", &[("môn_học", "toán"), ("game_type", "quiz")]);
    tagged(&repo, "b", &[("môn_học", "toán")]);
    tagged(&repo, "c", &[("game_type", "quiz")]);

    let drawn = repo
        .random_questions("môn_học", Some("toán"), Some("quiz"), 10)
        .expect("Query failed");
    assert_eq!(drawn.len(), 1);
    assert_eq!(*drawn[0].0.id(), both);

    let subject_only = repo
        .random_questions("môn_học", Some("toán"), None, 10)
        .expect("Query failed");
    assert_eq!(subject_only.len(), 2);

    let limited = repo.random_questions("môn_học", None, None, 2).expect("Query failed");
    assert_eq!(limited.len(), 2);
}

#[test]
fn test_list_items_in_display_order() {
    let (_db, repo) = setup_test_db();
    let items = repo.list_items("active", None).expect("Query failed");
    assert_eq!(items.len(), 5);
    let orders: Vec<i32> = items.iter().map(|i| *i.display_order()).collect();
    assert_eq!(orders, vec![1, 2, 3, 4, 5]);

    let themes = repo.list_items("active", Some("theme")).expect("Query failed");
    assert_eq!(themes.len(), 2);
    assert!(repo.list_items("inactive", None).expect("Query failed").is_empty());
}

#[test]
fn test_purchase_deducts_stars_and_records() {
    let (_db, repo) = setup_test_db();
    let buyer = student(&repo, "buyer@example.com", 120);

    let outcome = repo.purchase(*buyer.id(), 3, 2).expect("Purchase failed");
    let PurchaseOutcome::Completed(receipt) = outcome else {
        panic!("expected completed purchase");
    };
    assert_eq!(*receipt.stars_spent(), 100);
    assert_eq!(*receipt.new_stars_balance(), 20);
    assert_eq!(receipt.item_name(), "Freeze Streak Shield");

    let stored = repo.get_user(*buyer.id()).expect("Query failed").expect("Missing");
    assert_eq!(*stored.stars_balance(), 20);
    assert_eq!(*stored.freeze_streaks(), 2);

    let history = repo.list_purchases(*buyer.id(), Page::new(20, 0)).expect("Query failed");
    assert_eq!(history.len(), 1);
    assert_eq!(*history[0].quantity(), 2);
    assert_eq!(repo.count_purchases(*buyer.id()).expect("Query failed"), 1);
}

#[test]
fn test_purchase_not_enough_stars_writes_nothing() {
    let (_db, repo) = setup_test_db();
    let buyer = student(&repo, "poor@example.com", 40);

    let outcome = repo.purchase(*buyer.id(), 1, 1).expect("Purchase failed");
    assert!(matches!(
        outcome,
        PurchaseOutcome::Rejected(PurchaseRejection::NotEnoughStars { required: 100, current: 40 })
    ));
    assert_eq!(repo.count_purchases(*buyer.id()).expect("Query failed"), 0);
    let stored = repo.get_user(*buyer.id()).expect("Query failed").expect("Missing");
    assert_eq!(*stored.stars_balance(), 40);
}

#[test]
fn test_purchase_finite_stock_and_inactive_items() {
    let (db, repo) = setup_test_db();
    let buyer = student(&repo, "rich@example.com", 10_000);
    raw_sql(&db, "UPDATE shop_items SET stock_quantity = 1 WHERE id = 2");
    raw_sql(&db, "UPDATE shop_items SET status = 'inactive' WHERE id = 4");

    assert!(matches!(
        repo.purchase(*buyer.id(), 2, 2).expect("Purchase failed"),
        PurchaseOutcome::Rejected(PurchaseRejection::InsufficientStock)
    ));
    assert!(matches!(
        repo.purchase(*buyer.id(), 2, 1).expect("Purchase failed"),
        PurchaseOutcome::Completed(_)
    ));
    assert!(matches!(
        repo.purchase(*buyer.id(), 2, 1).expect("Purchase failed"),
        PurchaseOutcome::Rejected(PurchaseRejection::InsufficientStock)
    ));
    assert!(matches!(
        repo.purchase(*buyer.id(), 4, 1).expect("Purchase failed"),
        PurchaseOutcome::Rejected(PurchaseRejection::Unavailable)
    ));

    assert!(matches!(
        repo.purchase(*buyer.id(), 999, 1).expect("Purchase failed"),
        PurchaseOutcome::Rejected(PurchaseRejection::UnknownItem)
    ));

    let err = repo.purchase(999, 1, 1).expect_err("Unknown user should fail");
    assert_eq!(err.kind, DbErrorKind::NotFound);
}

#[test]
fn test_inventory_groups_by_item() {
    let (_db, repo) = setup_test_db();
    let buyer = student(&repo, "collector@example.com", 10_000);
    repo.purchase(*buyer.id(), 3, 2).expect("Purchase failed");
    repo.purchase(*buyer.id(), 3, 3).expect("Purchase failed");
    repo.purchase(*buyer.id(), 1, 1).expect("Purchase failed");

    let inventory = repo.inventory(*buyer.id()).expect("Query failed");
    assert_eq!(inventory.len(), 2);
    assert_eq!(inventory[0].item_name(), "Freeze Streak Shield");
    assert_eq!(*inventory[0].total_quantity(), 5);
    assert_eq!(*inventory[0].purchase_count(), 2);
    assert_eq!(*inventory[1].total_quantity(), 1);
}
