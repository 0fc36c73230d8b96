//! Database persistence layer for accounts, attempts, questions and the shop.

mod error;
mod models;
mod repository;
mod schema;

pub use error::{DbError, DbErrorKind};
pub use models::{
    Credentials, ExamResult, ExamStats, ExamTypeStats, InventoryEntry, ItemStatus, ItemType,
    NewExamResult, NewPurchase, NewQuestion, NewUser, Page, ProgressUpdate, Purchase,
    PurchaseOutcome, PurchaseReceipt, PurchaseRecord, PurchaseRejection, Question,
    QuestionChanges, QuestionTag, QuestionType, Role, ShopItem, Submission, Tag, UNLIMITED_STOCK,
    User,
};
pub use repository::{MIGRATIONS, QuizRepository, TaggedQuestion};
