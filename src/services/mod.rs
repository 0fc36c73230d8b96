//! Business operations over the repository.

mod accounts;
mod error;
pub(crate) mod game;
mod questions;
mod shop;

pub use accounts::{
    ADMIN_FREEZE_STREAKS, ADMIN_STARS, AccountService, AuthSession, LoginRequest,
    MIN_PASSWORD_LEN, Profile, RegisterRequest, STARTING_FREEZE_STREAKS, UserSummary,
    is_valid_email,
};
pub use error::{ServiceError, ServiceErrorKind};
pub use game::{
    DEFAULT_HISTORY_LIMIT, GameService, GameStats, HistoryEntry, HistoryPage, ProgressSnapshot,
    ProgressView, StreakStatus, SubmitOutcome, SubmitRequest,
};
pub use questions::{
    AnswerOption, DEFAULT_GAME_LIMIT, DEFAULT_LIST_LIMIT, DEFAULT_TAG_LIMIT, GameContent,
    GameQuestion, MAX_GAME_LIMIT, QuestionInput, QuestionService, QuestionView, SUBJECT_TAG_KEY,
    TagInput,
};
pub use shop::{MAX_PURCHASE_QUANTITY, PurchaseHistory, PurchaseRequest, ShopService};
