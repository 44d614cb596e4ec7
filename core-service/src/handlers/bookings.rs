use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extractors::{Json, Path};
use crate::models::Role;
use crate::services::booking;
use crate::state::AppState;

/// Upper bound on tickets per booking request.
pub const MAX_TICKETS_PER_BOOKING: i32 = 100;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
    #[validate(range(min = 1, max = MAX_TICKETS_PER_BOOKING))]
    pub ticket_count: i32,
}

pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<CreateBooking>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_role(Role::Customer)?;
    payload.validate().map_err(ApiError::validation)?;
    let created =
        booking::create(&state.db, &state.queue, event_id, &user, payload.ticket_count).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_booking(
    State(state): State<AppState>,
    _user: AuthUser,
    Path((event_id, booking_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let found = booking::get(&state.db, event_id, booking_id).await?;
    Ok(Json(found))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path((event_id, booking_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_role(Role::Customer)?;
    booking::remove(&state.db, &state.queue, event_id, booking_id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_count_must_be_positive() {
        let payload = CreateBooking { ticket_count: 0 };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn ticket_count_is_capped() {
        let payload = CreateBooking {
            ticket_count: MAX_TICKETS_PER_BOOKING + 1,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn ticket_count_within_bounds_passes() {
        for count in [1, 2, MAX_TICKETS_PER_BOOKING] {
            let payload = CreateBooking {
                ticket_count: count,
            };
            assert!(payload.validate().is_ok());
        }
    }
}
