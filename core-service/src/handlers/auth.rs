use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use validator::Validate;

use crate::error::ApiError;
use crate::extractors::Json;
use crate::services::auth::{self, Login, SignUp};
use crate::state::AppState;

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignUp>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(ApiError::validation)?;
    auth::signup(&state.db, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User created successfully",
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Login>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(ApiError::validation)?;
    let response = auth::login(&state.db, &state.config.auth, payload).await?;
    Ok(Json(response))
}
