//! Vượt Vũ Môn - quiz, star and streak backend for young learners.
//!
//! Children take quizzes drawn from a tagged question bank, earn stars for
//! strong scores, keep a daily learning streak (protected by freeze credits),
//! and spend stars in a small shop. Anyone can start as an anonymous guest and
//! later register without losing progress.
//!
//! # Architecture
//!
//! - **db**: Diesel/SQLite persistence with embedded migrations
//! - **auth**: Argon2id password hashing and HS256 bearer tokens
//! - **services**: business operations over the repository
//! - **api**: axum routes, extractors and the JSON envelope
//! - **vuot_rewards**: the pure star/streak engine (separate crate)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vuot_vu_mon::{AppState, QuizRepository, SystemClock, TokenIssuer, router};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let repository = QuizRepository::new("vuot_vu_mon.db".to_string())?;
//! repository.run_migrations()?;
//!
//! let state = AppState::new(
//!     repository,
//!     TokenIssuer::new("change-me", 30),
//!     Arc::new(SystemClock),
//!     false,
//! );
//! let app = router(state, "http://localhost:5173")?;
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:5000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod api;
mod auth;
mod clock;
mod config;
mod db;
mod services;
mod state;

// Crate-level exports - HTTP surface
pub use api::{
    AdminUser, ApiError, ApiResponse, AuthUser, BearerToken, IdPath, JsonBody, MaybeAuthUser,
    QueryParams, router,
};

// Crate-level exports - Authentication
pub use auth::{AuthError, AuthErrorKind, Claims, TokenIssuer, hash_password, verify_password};

// Crate-level exports - Time
pub use clock::{Clock, FixedClock, SystemClock};

// Crate-level exports - Configuration
pub use config::{BootstrapAdmin, ConfigError, ServerConfig};

// Crate-level exports - Persistence
pub use db::{
    Credentials, DbError, DbErrorKind, ExamResult, ExamStats, ExamTypeStats, InventoryEntry,
    ItemStatus, ItemType, MIGRATIONS, NewExamResult, NewPurchase, NewQuestion, NewUser, Page,
    ProgressUpdate, Purchase, PurchaseOutcome, PurchaseReceipt, PurchaseRecord,
    PurchaseRejection, Question, QuestionChanges, QuestionTag, QuestionType, QuizRepository,
    Role, ShopItem, Submission, Tag, TaggedQuestion, UNLIMITED_STOCK, User,
};

// Crate-level exports - Business operations
pub use services::{
    ADMIN_FREEZE_STREAKS, ADMIN_STARS, AccountService, AnswerOption, AuthSession,
    DEFAULT_GAME_LIMIT, DEFAULT_HISTORY_LIMIT, DEFAULT_LIST_LIMIT, DEFAULT_TAG_LIMIT,
    GameContent, GameQuestion, GameService, GameStats, HistoryEntry, HistoryPage, LoginRequest,
    MAX_GAME_LIMIT, MAX_PURCHASE_QUANTITY, MIN_PASSWORD_LEN, Profile, ProgressSnapshot,
    ProgressView, PurchaseHistory, PurchaseRequest, QuestionInput, QuestionService,
    QuestionView, RegisterRequest, SUBJECT_TAG_KEY, STARTING_FREEZE_STREAKS, ServiceError,
    ServiceErrorKind, ShopService, StreakStatus, SubmitOutcome, SubmitRequest, TagInput,
    UserSummary, is_valid_email,
};

// Crate-level exports - Application state
pub use state::AppState;

// Crate-level exports - Reward engine
pub use vuot_rewards::{ProgressState, RewardSummary, Score, StreakChange};
