use crate::state::AppState;
use axum::Router;

pub mod bootstrap;
pub mod dto;
pub(crate) mod extractors;
pub mod handlers;
mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use dto::{CreateUserRequest, UsersResponse};
pub use repo_types::User;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::user_routes())
}
