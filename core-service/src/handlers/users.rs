use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::services::user;
use crate::state::AppState;

pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let profile = user::me(&state.db, &auth_user).await?;
    Ok(Json(profile))
}
