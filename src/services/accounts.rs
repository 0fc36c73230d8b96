//! Accounts: guests, registration, login and profiles.

use chrono::Utc;
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::auth::{TokenIssuer, hash_password, verify_password};
use crate::db::{Credentials, DbErrorKind, NewUser, QuizRepository, Role, User};
use crate::services::ServiceError;

/// Freeze credits granted to every new guest or student.
pub const STARTING_FREEZE_STREAKS: i32 = 2;

/// Freeze credits granted to bootstrapped admins.
pub const ADMIN_FREEZE_STREAKS: i32 = 5;

/// Star balance granted to bootstrapped admins.
pub const ADMIN_STARS: i32 = 1000;

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// A user together with a freshly issued bearer token.
#[derive(Debug, Clone, Getters, Serialize)]
pub struct AuthSession {
    user: User,
    token: String,
    /// Whether a guest account was converted rather than a new one created.
    #[serde(skip_serializing_if = "Option::is_none")]
    upgraded: Option<bool>,
}

/// Registration input. The guest token may also arrive as the bearer header.
#[derive(Clone, Default, Deserialize, new)]
pub struct RegisterRequest {
    email: Option<String>,
    password: Option<String>,
    full_name: Option<String>,
    #[serde(alias = "guestToken")]
    guest_token: Option<String>,
}

impl RegisterRequest {
    /// Uses `token` as the guest token when the body carries none.
    pub fn or_guest_token(mut self, token: Option<String>) -> Self {
        if self.guest_token.is_none() {
            self.guest_token = token;
        }
        self
    }
}

/// Login input.
#[derive(Clone, Default, Deserialize, new)]
pub struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

/// Attempt totals shown on the profile.
#[derive(Debug, Clone, PartialEq, Getters, Serialize)]
pub struct UserSummary {
    total_exams: i64,
    avg_score: f64,
    max_score: Option<i32>,
}

/// Current user with attempt totals.
#[derive(Debug, Clone, Getters, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    user: User,
    stats: UserSummary,
}

/// Checks `local@domain.tld` shape: one `@`, no whitespace, a dot inside the domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Service layer for account operations.
///
/// Wraps [`QuizRepository`] with credential checks and token issuance.
#[derive(Debug, Clone)]
pub struct AccountService {
    repository: QuizRepository,
    tokens: TokenIssuer,
}

impl AccountService {
    /// Creates a new account service.
    #[instrument(skip(repository, tokens))]
    pub fn new(repository: QuizRepository, tokens: TokenIssuer) -> Self {
        info!("Creating AccountService");
        Self { repository, tokens }
    }

    /// Creates an anonymous guest with the starting freeze credits.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the account cannot be stored.
    #[instrument(skip(self))]
    pub fn create_guest(&self) -> Result<AuthSession, ServiceError> {
        let user = self.repository.create_user(NewUser::new(
            None,
            None,
            None,
            Role::Guest.to_string(),
            true,
            0,
            STARTING_FREEZE_STREAKS,
        ))?;
        let token = self.tokens.issue(*user.id())?;

        info!(user_id = user.id(), "✅ Guest created");
        Ok(AuthSession {
            user,
            token,
            upgraded: None,
        })
    }

    /// Registers a student, converting the guest named by the guest token when
    /// it verifies and still belongs to an anonymous guest.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] for missing fields, a malformed email, a short
    /// password, or an email already in use.
    #[instrument(skip(self, request), fields(email = ?request.email))]
    pub fn register(&self, request: RegisterRequest) -> Result<AuthSession, ServiceError> {
        let (email, password) = match (request.email, request.password) {
            (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => (e, p),
            _ => return Err(ServiceError::bad_request("Email and password are required")),
        };
        if !is_valid_email(&email) {
            return Err(ServiceError::bad_request("Invalid email format"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::bad_request(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.repository.get_user_by_email(&email)?.is_some() {
            return Err(ServiceError::conflict("Email already exists"));
        }

        let password_hash = hash_password(&password)?;
        let full_name = request.full_name.filter(|n| !n.trim().is_empty());

        let guest_id = request.guest_token.as_deref().and_then(|token| {
            match self.tokens.verify(token) {
                Ok(claims) => Some(*claims.user_id()),
                Err(e) => {
                    warn!(error = %e, "Guest token rejected, registering a new account");
                    None
                }
            }
        });

        if let Some(guest_id) = guest_id {
            let credentials = Credentials::new(
                email.clone(),
                password_hash.clone(),
                full_name.clone(),
                Role::Student.to_string(),
                false,
                Utc::now().naive_utc(),
            );
            if let Some(user) = self
                .repository
                .upgrade_guest(guest_id, credentials)
                .map_err(email_conflict)?
            {
                let token = self.tokens.issue(*user.id())?;
                info!(user_id = user.id(), "✅ Guest upgraded to student");
                return Ok(AuthSession {
                    user,
                    token,
                    upgraded: Some(true),
                });
            }
            debug!(guest_id, "Token does not name a guest, registering a new account");
        }

        let user = self
            .repository
            .create_user(NewUser::new(
                Some(email),
                Some(password_hash),
                full_name,
                Role::Student.to_string(),
                false,
                0,
                STARTING_FREEZE_STREAKS,
            ))
            .map_err(email_conflict)?;
        let token = self.tokens.issue(*user.id())?;

        info!(user_id = user.id(), "✅ Student registered");
        Ok(AuthSession {
            user,
            token,
            upgraded: Some(false),
        })
    }

    /// Logs in a registered account. Anonymous accounts cannot log in.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] with an unauthenticated kind on any mismatch.
    #[instrument(skip(self, request), fields(email = ?request.email))]
    pub fn login(&self, request: LoginRequest) -> Result<AuthSession, ServiceError> {
        let (email, password) = match (request.email, request.password) {
            (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => (e, p),
            _ => return Err(ServiceError::bad_request("Email and password are required")),
        };

        let user = self
            .repository
            .get_user_by_email(&email)?
            .filter(|u| !u.is_anonymous())
            .ok_or_else(|| ServiceError::unauthenticated("Invalid email or password"))?;

        let stored = user
            .password_hash()
            .as_deref()
            .ok_or_else(|| ServiceError::unauthenticated("Invalid email or password"))?;
        if !verify_password(&password, stored)? {
            warn!(user_id = user.id(), "Password mismatch");
            return Err(ServiceError::unauthenticated("Invalid email or password"));
        }

        let token = self.tokens.issue(*user.id())?;
        info!(user_id = user.id(), "✅ Login successful");
        Ok(AuthSession {
            user,
            token,
            upgraded: None,
        })
    }

    /// Resolves a bearer token to its account.
    ///
    /// # Errors
    ///
    /// Returns a forbidden [`ServiceError`] for a bad token and not-found when
    /// the account no longer exists.
    #[instrument(skip(self, token))]
    pub fn authenticate(&self, token: &str) -> Result<User, ServiceError> {
        let claims = self.tokens.verify(token)?;
        self.repository
            .get_user(*claims.user_id())?
            .ok_or_else(|| ServiceError::not_found("User not found"))
    }

    /// Returns the user with attempt totals.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the user does not exist.
    #[instrument(skip(self))]
    pub fn profile(&self, user_id: i32) -> Result<Profile, ServiceError> {
        let user = self
            .repository
            .get_user(user_id)?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;
        let results = self.repository.all_results(user_id)?;

        let total_exams = results.len() as i64;
        let avg_score = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| f64::from(*r.score())).sum::<f64>() / total_exams as f64
        };
        let max_score = results.iter().map(|r| *r.score()).max();

        Ok(Profile {
            user,
            stats: UserSummary {
                total_exams,
                avg_score,
                max_score,
            },
        })
    }

    /// Creates the admin account unless the email is already registered.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if hashing or storage fails.
    #[instrument(skip(self, password))]
    pub fn ensure_admin(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<User, ServiceError> {
        if let Some(existing) = self.repository.get_user_by_email(email)? {
            if existing.parse_role()? != Role::Admin {
                warn!(user_id = existing.id(), "Bootstrap email belongs to a non-admin account");
            }
            debug!(user_id = existing.id(), "Admin already present");
            return Ok(existing);
        }

        let user = self.repository.create_user(NewUser::new(
            Some(email.to_string()),
            Some(hash_password(password)?),
            Some(full_name.to_string()),
            Role::Admin.to_string(),
            false,
            ADMIN_STARS,
            ADMIN_FREEZE_STREAKS,
        ))?;
        info!(user_id = user.id(), "✅ Admin account created");
        Ok(user)
    }
}

#[track_caller]
fn email_conflict(err: crate::db::DbError) -> ServiceError {
    if err.kind == DbErrorKind::Conflict {
        ServiceError::conflict("Email already exists")
    } else {
        ServiceError::from(err)
    }
}
