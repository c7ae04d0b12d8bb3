//! Users service routes

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde_json::json;

use crate::{
    error::ApiError,
    import,
    models::{NewUser, UserChanges, UserRecord, UserResponse},
    search::UserSearch,
    state::AppState,
};

/// Create the router for the users service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/user/create", post(create_user))
        .route("/user/update/:id", patch(update_user))
        .route("/user/search", post(search_users))
        .route("/user/import", post(import_users))
        .route("/user/seed-data", post(seed_users))
        .route("/user/username/:username", get(get_user_by_username))
        .route("/user/:id", get(get_user).delete(delete_user))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "users-service"
    }))
}

/// Create a new user
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_repository.create(&payload).await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Partially update a user
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(changes): Json<UserChanges>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_repository.update(&id, &changes).await?;

    Ok(Json(UserResponse::from(user)))
}

/// Delete a user, returning the removed record
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_repository.delete(&id).await?;

    Ok(Json(UserResponse::from(user)))
}

/// Get a user by ID
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_repository.get_by_id(&id).await?;

    Ok(Json(UserResponse::from(user)))
}

/// Get a user by username
pub async fn get_user_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_repository.get_by_username(&username).await?;

    Ok(Json(UserResponse::from(user)))
}

/// Search users by first name, last name or username
pub async fn search_users(
    State(state): State<AppState>,
    Json(search): Json<UserSearch>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.user_repository.search(&search).await?;

    Ok(Json(into_responses(users)))
}

/// Import a batch of rows supplied in the request body
pub async fn import_users(
    State(state): State<AppState>,
    Json(rows): Json<Vec<NewUser>>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.user_repository.import_batch(&rows).await?;

    Ok((StatusCode::CREATED, Json(into_responses(users))))
}

/// Import the configured seed file
pub async fn seed_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = import::read_seed_file(&state.seed_file).await?;
    let users = state.user_repository.import_batch(&rows).await?;

    Ok((StatusCode::CREATED, Json(into_responses(users))))
}

fn into_responses(users: Vec<UserRecord>) -> Vec<UserResponse> {
    users.into_iter().map(UserResponse::from).collect()
}
