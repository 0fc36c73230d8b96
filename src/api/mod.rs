//! HTTP surface: JSON envelope, extractors and route handlers.

mod admin;
mod auth;
mod error;
mod extract;
mod game;
mod questions;
mod response;
mod routes;
mod shop;
mod system;

pub use error::ApiError;
pub use extract::{AdminUser, AuthUser, BearerToken, IdPath, JsonBody, MaybeAuthUser, QueryParams};
pub use response::ApiResponse;
pub use routes::router;
