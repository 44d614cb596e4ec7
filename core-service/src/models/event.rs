use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub venue: String,
    pub total_tickets: i32,
    pub available_tickets: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Tickets already sold; always equals the sum of ticket counts over the
    /// event's live bookings.
    pub fn sold_tickets(&self) -> i32 {
        self.total_tickets - self.available_tickets
    }
}
