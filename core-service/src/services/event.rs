use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{EmailJob, EmailType, JobQueue};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ErrorCode};
use crate::models::Event;
use crate::notifier;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvent {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    pub date: DateTime<Utc>,
    #[validate(length(min = 1))]
    pub venue: String,
    #[validate(range(min = 1))]
    pub total_tickets: i32,
}

/// Partial update; absent fields keep their current values. A new total
/// ticket count never carries a client-supplied availability with it.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEvent {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    #[validate(length(min = 1))]
    pub venue: Option<String>,
    #[validate(range(min = 1))]
    pub total_tickets: Option<i32>,
}

/// A live booking joined with its booker, for update/delete notifications.
#[derive(Debug, sqlx::FromRow)]
struct EventBooker {
    booking_id: Uuid,
    ticket_count: i32,
    user_name: String,
    user_email: String,
}

pub async fn create(db: &PgPool, data: CreateEvent, user_id: Uuid) -> Result<Event, ApiError> {
    let event = sqlx::query_as::<_, Event>(
        "INSERT INTO events
             (id, name, description, date, venue, total_tickets, available_tickets, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $6, $7)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.date)
    .bind(&data.venue)
    .bind(data.total_tickets)
    .bind(user_id)
    .fetch_one(db)
    .await?;

    info!(event_id = %event.id, created_by = %user_id, "event created");
    Ok(event)
}

pub async fn get(db: &PgPool, event_id: Uuid) -> Result<Event, ApiError> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::not_found(ErrorCode::EventNotFound, "Event not found"))
}

pub async fn get_all(db: &PgPool) -> Result<Vec<Event>, ApiError> {
    let events = sqlx::query_as::<_, Event>("SELECT * FROM events ORDER BY date")
        .fetch_all(db)
        .await?;
    Ok(events)
}

/// Update an event, reconciling capacity changes against sold tickets.
///
/// Runs under a row lock so concurrent bookings cannot slip between the sold
/// count read and the write. When the date or venue changes, every booker is
/// notified after commit, each enqueue independently fire-and-forget.
pub async fn update(
    db: &PgPool,
    queue: &JobQueue,
    event_id: Uuid,
    patch: UpdateEvent,
) -> Result<Event, ApiError> {
    let mut tx = db.begin().await?;

    let existing = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found(ErrorCode::EventNotFound, "Event not found"))?;

    reject_past_event(&existing)?;

    let sold = existing.sold_tickets();
    let (new_total, new_available) = match patch.total_tickets {
        Some(total) => (total, reconcile_available(total, sold)?),
        None => (existing.total_tickets, existing.available_tickets),
    };

    let notify = requires_notification(&existing, &patch);

    let updated = sqlx::query_as::<_, Event>(
        "UPDATE events
         SET name = $2, description = $3, date = $4, venue = $5,
             total_tickets = $6, available_tickets = $7, updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(event_id)
    .bind(patch.name.as_deref().unwrap_or(&existing.name))
    .bind(patch.description.as_deref().unwrap_or(&existing.description))
    .bind(patch.date.unwrap_or(existing.date))
    .bind(patch.venue.as_deref().unwrap_or(&existing.venue))
    .bind(new_total)
    .bind(new_available)
    .fetch_one(&mut *tx)
    .await?;

    let bookers = if notify {
        load_bookers(&mut tx, event_id).await?
    } else {
        Vec::new()
    };

    tx.commit().await?;

    info!(event_id = %event_id, notify, "event updated");

    for booker in bookers {
        notifier::enqueue_in_background(queue, booker_job(EmailType::EventUpdatedByAdmin, &updated, booker));
    }

    Ok(updated)
}

/// Delete a future event; its bookings go with it (FK cascade) and every
/// former booker gets a deletion notice after commit.
pub async fn remove(db: &PgPool, queue: &JobQueue, event_id: Uuid) -> Result<(), ApiError> {
    let mut tx = db.begin().await?;

    let existing = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found(ErrorCode::EventNotFound, "Event not found"))?;

    reject_past_event(&existing)?;

    let bookers = load_bookers(&mut tx, event_id).await?;

    sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(event_id = %event_id, bookings = bookers.len(), "event deleted");

    for booker in bookers {
        notifier::enqueue_in_background(queue, booker_job(EmailType::EventDeletedByAdmin, &existing, booker));
    }

    Ok(())
}

fn reject_past_event(event: &Event) -> Result<(), ApiError> {
    if event.date <= Utc::now() {
        Err(ApiError::conflict(
            ErrorCode::EventIsInThePast,
            "Past events cannot be modified",
        ))
    } else {
        Ok(())
    }
}

/// Availability after a capacity change is always recomputed from the sold
/// count; a new total below what is already sold is rejected.
fn reconcile_available(new_total: i32, sold: i32) -> Result<i32, ApiError> {
    if new_total < sold {
        return Err(ApiError::conflict(
            ErrorCode::InsufficientTicketCount,
            "Total tickets cannot be lower than the number of tickets already sold",
        ));
    }
    Ok(new_total - sold)
}

/// Bookers are notified only when the patch moves the event in time or place.
fn requires_notification(existing: &Event, patch: &UpdateEvent) -> bool {
    patch.date.is_some_and(|date| date != existing.date)
        || patch
            .venue
            .as_deref()
            .is_some_and(|venue| venue != existing.venue)
}

async fn load_bookers(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
) -> Result<Vec<EventBooker>, ApiError> {
    let bookers = sqlx::query_as::<_, EventBooker>(
        "SELECT b.id AS booking_id, b.ticket_count, u.name AS user_name, u.email AS user_email
         FROM bookings b
         JOIN users u ON u.id = b.user_id
         WHERE b.event_id = $1",
    )
    .bind(event_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(bookers)
}

fn booker_job(email_type: EmailType, event: &Event, booker: EventBooker) -> EmailJob {
    EmailJob {
        recipient: booker.user_email,
        email_type,
        user_name: booker.user_name,
        event_name: event.name.clone(),
        event_venue: event.venue.clone(),
        event_time: event.date,
        ticket_count: booker.ticket_count,
        booking_id: Some(booker.booking_id),
    }
}
