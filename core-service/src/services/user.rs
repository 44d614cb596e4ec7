use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::Role;

/// A user's booking joined with a summary of its event.
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    pub id: Uuid,
    pub ticket_count: i32,
    pub event_id: Uuid,
    pub event_name: String,
    pub event_date: DateTime<Utc>,
    pub event_venue: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub bookings: Vec<BookingSummary>,
}

pub async fn me(db: &PgPool, user: &AuthUser) -> Result<UserProfile, ApiError> {
    let bookings = sqlx::query_as::<_, BookingSummary>(
        "SELECT b.id, b.ticket_count,
                e.id AS event_id, e.name AS event_name,
                e.date AS event_date, e.venue AS event_venue
         FROM bookings b
         JOIN events e ON e.id = b.event_id
         WHERE b.user_id = $1
         ORDER BY b.created_at",
    )
    .bind(user.id)
    .fetch_all(db)
    .await?;

    Ok(UserProfile {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role,
        bookings,
    })
}
