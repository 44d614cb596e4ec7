use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extractors::{Json, Path};
use crate::models::Role;
use crate::services::event::{self, CreateEvent, UpdateEvent};
use crate::state::AppState;

#[derive(Serialize)]
struct CreatedEvent {
    id: Uuid,
}

pub async fn create_event(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateEvent>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_role(Role::Admin)?;
    payload.validate().map_err(ApiError::validation)?;
    let event = event::create(&state.db, payload, user.id).await?;
    Ok((StatusCode::CREATED, Json(CreatedEvent { id: event.id })))
}

pub async fn get_event(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let event = event::get(&state.db, event_id).await?;
    Ok(Json(event))
}

pub async fn list_events(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let events = event::get_all(&state.db).await?;
    Ok(Json(events))
}

pub async fn update_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<UpdateEvent>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_role(Role::Admin)?;
    payload.validate().map_err(ApiError::validation)?;
    let event = event::update(&state.db, &state.queue, event_id, payload).await?;
    Ok(Json(event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_role(Role::Admin)?;
    event::remove(&state.db, &state.queue, event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
