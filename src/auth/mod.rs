//! Password hashing and bearer tokens.

mod error;
mod password;
mod token;

pub use error::{AuthError, AuthErrorKind};
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenIssuer};
