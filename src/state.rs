//! Shared application state handed to every request handler.

use std::sync::Arc;

use derive_getters::Getters;
use tracing::{info, instrument};

use crate::auth::TokenIssuer;
use crate::clock::Clock;
use crate::db::QuizRepository;
use crate::services::{AccountService, GameService, QuestionService, ShopService};

/// Services wired to one repository.
#[derive(Debug, Clone, Getters)]
pub struct AppState {
    accounts: AccountService,
    game: GameService,
    questions: QuestionService,
    shop: ShopService,
    /// Include internal error detail in 500 responses.
    expose_errors: bool,
}

impl AppState {
    /// Builds every service over `repository`.
    #[instrument(skip(repository, tokens, clock))]
    pub fn new(
        repository: QuizRepository,
        tokens: TokenIssuer,
        clock: Arc<dyn Clock>,
        expose_errors: bool,
    ) -> Self {
        info!("Building application state");
        Self {
            accounts: AccountService::new(repository.clone(), tokens),
            game: GameService::new(repository.clone(), clock),
            questions: QuestionService::new(repository.clone()),
            shop: ShopService::new(repository),
            expose_errors,
        }
    }
}
