//! User handlers.
//!
//! Responses are built with `EntityStore::to_dict`, so the JSON shape of a
//! user is exactly its column set.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};
use uuid::Uuid;

use common::{AppError, AppResult};
use entity_access::{criteria, Page, Patch};

use crate::entities::UserActiveModel;
use crate::state::AppState;

/// Set once on insert; dropped from update bodies.
const IMMUTABLE_FIELDS: &[&str] = &["created_at"];

type UserBody = Json<Map<String, JsonValue>>;

/// User creation request
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
}

impl CreateUserRequest {
    fn validate(&self) -> AppResult<()> {
        validate_email(&self.email)?;
        validate_name(&self.name)
    }
}

fn validate_email(email: &str) -> AppResult<()> {
    if !email.contains('@') {
        return Err(AppError::validation("Invalid email format"));
    }
    Ok(())
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("Name cannot be empty"));
    }
    Ok(())
}

/// Create user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).patch(update_user).delete(delete_user))
}

/// List users, windowed by `offset` and `limit`
pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> AppResult<Json<Vec<Map<String, JsonValue>>>> {
    let users = state.users.find_all(page).await?;
    let body = users
        .iter()
        .map(|user| state.users.to_dict(user))
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(body))
}

/// Get user by ID
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<UserBody> {
    let user = state.users.find_by_id(id).await?;
    Ok(Json(state.users.to_dict(&user)?))
}

/// Register a new user
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, UserBody)> {
    req.validate()?;
    state
        .users
        .ensure_absent(&criteria! { email => req.email.as_str() }.labeled("email address"))
        .await?;

    let now = Utc::now();
    let user = state
        .users
        .save(UserActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(req.email),
            name: Set(req.name),
            bio: Set(req.bio),
            created_at: Set(now),
            updated_at: Set(now),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(state.users.to_dict(&user)?)))
}

/// Partially update a user.
///
/// Unknown fields and attempts to change the ID are rejected.
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<JsonValue>,
) -> AppResult<UserBody> {
    let user = state.users.find_by_id(id).await?;

    if let Some(name) = body.get("name").and_then(JsonValue::as_str) {
        validate_name(name)?;
    }
    if let Some(email) = body.get("email").and_then(JsonValue::as_str) {
        validate_email(email)?;
        state
            .users
            .ensure_no_conflict(id, &criteria! { email => email }.labeled("email address"))
            .await?;
    }

    let patch = IMMUTABLE_FIELDS
        .iter()
        .fold(Patch::from_json(body)?.strict(), |patch, field| {
            patch.exclude(*field)
        })
        .set("updated_at", json!(Utc::now()));

    let updated = state.users.update(&user, &patch).await?;
    Ok(Json(state.users.to_dict(&updated)?))
}

/// Delete user by ID
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.users.delete_by_id(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
