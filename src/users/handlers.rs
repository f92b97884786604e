use axum::{
    extract::State,
    http::{Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use super::{
    dto::{CreateUserRequest, UsersResponse},
    extractors::{JsonBody, UserId},
    repo_types::User,
    services,
};
use crate::{
    error::{ApiError, StoreError},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            post(create_user).get(list_users).fallback(method_not_allowed),
        )
        .route(
            "/users/:id",
            get(get_user)
                .put(update_user)
                .delete(delete_user)
                .fallback(method_not_allowed),
        )
}

async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("method {method} not allowed"),
    )
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(mut payload): JsonBody<CreateUserRequest>,
) -> Result<Json<User>, ApiError> {
    if let Err(msg) = services::validate(&mut payload, true) {
        warn!(email = %payload.user.email, reason = msg, "rejected new user");
        return Err(ApiError::bad_request(format!("cannot create user: {msg}")));
    }

    // every failure here is reported as a client error
    let user = services::create_user(&state.db, payload)
        .await
        .map_err(|e| {
            warn!(error = %e, "create user failed");
            ApiError::bad_request(format!("cannot create user: {e}"))
        })?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UsersResponse>, ApiError> {
    let users = services::list_users(&state.db).await.map_err(|e| {
        error!(error = %e, "list users failed");
        ApiError::internal(format!("cannot list users: {e}"))
    })?;
    Ok(Json(UsersResponse { users }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    UserId(id): UserId,
) -> Result<Json<User>, ApiError> {
    match services::get_user(&state.db, id).await {
        Ok(Some(user)) => Ok(Json(user)),
        Ok(None) => Err(ApiError::not_found("cannot get user: not found")),
        Err(e) => {
            error!(error = %e, user_id = id, "get user failed");
            Err(ApiError::internal(format!("cannot get user: {e}")))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    UserId(id): UserId,
    JsonBody(mut payload): JsonBody<CreateUserRequest>,
) -> Result<Json<User>, ApiError> {
    if let Err(msg) = services::validate(&mut payload, false) {
        warn!(user_id = id, reason = msg, "rejected user update");
        return Err(ApiError::bad_request(format!("cannot update user: {msg}")));
    }

    let user = services::update_user(&state.db, id, payload)
        .await
        .map_err(|e| store_error("cannot update user", id, e))?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    UserId(id): UserId,
) -> Result<StatusCode, ApiError> {
    services::delete_user(&state.db, id)
        .await
        .map_err(|e| store_error("cannot delete user", id, e))?;
    info!(user_id = id, "delete user");
    Ok(StatusCode::OK)
}

fn store_error(context: &str, id: i64, e: StoreError) -> ApiError {
    let message = format!("{context}: {e}");
    match e {
        StoreError::NotFound => ApiError::not_found(message),
        StoreError::DuplicateEmail => {
            warn!(user_id = id, "email already in use");
            ApiError::bad_request(message)
        }
        _ => {
            error!(error = %e, user_id = id, "{context}");
            ApiError::internal(message)
        }
    }
}
