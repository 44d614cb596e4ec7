use shared::{EmailJob, EmailType, JobQueue};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ErrorCode};
use crate::models::{Booking, Event};
use crate::notifier;

/// Book tickets on an event.
///
/// The notification job is enqueued only after commit and its failure never
/// reaches the caller.
pub async fn create(
    db: &PgPool,
    queue: &JobQueue,
    event_id: Uuid,
    user: &AuthUser,
    ticket_count: i32,
) -> Result<Booking, ApiError> {
    let (booking, event) = apply_create(db, event_id, user.id, ticket_count).await?;

    info!(
        user_id = %user.id,
        event_id = %event_id,
        booking_id = %booking.id,
        ticket_count,
        "booking created"
    );

    notifier::enqueue_in_background(
        queue,
        EmailJob {
            recipient: user.email.clone(),
            email_type: EmailType::BookingCreatedSuccessful,
            user_name: user.name.clone(),
            event_name: event.name,
            event_venue: event.venue,
            event_time: event.date,
            ticket_count: booking.ticket_count,
            booking_id: Some(booking.id),
        },
    );

    Ok(booking)
}

/// The booking transaction: availability check, decrement and insert.
///
/// The availability check and the decrement are one conditional UPDATE, so two
/// transactions racing for the last tickets serialize on the event row and at
/// most one can pass; overselling is impossible.
async fn apply_create(
    db: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
    ticket_count: i32,
) -> Result<(Booking, Event), ApiError> {
    let mut tx = db.begin().await?;

    let event = sqlx::query_as::<_, Event>(
        "UPDATE events
         SET available_tickets = available_tickets - $2, updated_at = now()
         WHERE id = $1 AND available_tickets >= $2
         RETURNING *",
    )
    .bind(event_id)
    .bind(ticket_count)
    .fetch_optional(&mut *tx)
    .await?;

    let event = match event {
        Some(event) => event,
        None => {
            // The guarded update matched nothing: either the event does not
            // exist or it has too few tickets left. Look again to tell which;
            // dropping the transaction rolls it back.
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM events WHERE id = $1)",
            )
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await?;
            return Err(if exists {
                ApiError::conflict(ErrorCode::NotEnoughTicket, "Not enough tickets available")
            } else {
                ApiError::not_found(ErrorCode::EventNotFound, "Event not found")
            });
        }
    };

    let booking = sqlx::query_as::<_, Booking>(
        "INSERT INTO bookings (id, user_id, event_id, ticket_count)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(event_id)
    .bind(ticket_count)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok((booking, event))
}

/// Point lookup scoped by both ids so a booking id cannot be probed across
/// events.
pub async fn get(db: &PgPool, event_id: Uuid, booking_id: Uuid) -> Result<Booking, ApiError> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 AND event_id = $2")
        .bind(booking_id)
        .bind(event_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::not_found(ErrorCode::BookingNotFound, "Booking not found"))
}

/// Cancel a booking, returning its tickets to the event's availability in the
/// same transaction. Scoped to the calling user's own bookings.
pub async fn remove(
    db: &PgPool,
    queue: &JobQueue,
    event_id: Uuid,
    booking_id: Uuid,
    user: &AuthUser,
) -> Result<(), ApiError> {
    let (booking, event) = apply_remove(db, event_id, booking_id, user.id).await?;

    info!(
        user_id = %user.id,
        event_id = %event_id,
        booking_id = %booking_id,
        "booking canceled"
    );

    notifier::enqueue_in_background(
        queue,
        EmailJob {
            recipient: user.email.clone(),
            email_type: EmailType::BookingDeletedSuccessful,
            user_name: user.name.clone(),
            event_name: event.name,
            event_venue: event.venue,
            event_time: event.date,
            ticket_count: booking.ticket_count,
            booking_id: Some(booking.id),
        },
    );

    Ok(())
}

/// The cancellation transaction: delete the booking and return its tickets.
async fn apply_remove(
    db: &PgPool,
    event_id: Uuid,
    booking_id: Uuid,
    user_id: Uuid,
) -> Result<(Booking, Event), ApiError> {
    let mut tx = db.begin().await?;

    let booking = sqlx::query_as::<_, Booking>(
        "DELETE FROM bookings
         WHERE id = $1 AND event_id = $2 AND user_id = $3
         RETURNING *",
    )
    .bind(booking_id)
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::not_found(ErrorCode::BookingNotFound, "Booking not found"))?;

    let event = sqlx::query_as::<_, Event>(
        "UPDATE events
         SET available_tickets = available_tickets + $2, updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(event_id)
    .bind(booking.ticket_count)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok((booking, event))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed_user(pool: &PgPool, email: &str, role: &str) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role)
             VALUES ($1, 'Test User', $2, 'not-a-real-hash', $3)",
        )
        .bind(id)
        .bind(email)
        .bind(role)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    async fn seed_event(pool: &PgPool, created_by: Uuid, total: i32, available: i32) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO events
                 (id, name, description, date, venue, total_tickets, available_tickets, created_by)
             VALUES
                 ($1, 'Concert in the Park', 'An outdoor concert.',
                  now() + interval '30 days', 'Central Park', $2, $3, $4)",
        )
        .bind(id)
        .bind(total)
        .bind(available)
        .bind(created_by)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    async fn available_tickets(pool: &PgPool, event_id: Uuid) -> i32 {
        sqlx::query_scalar("SELECT available_tickets FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn booking_count(pool: &PgPool, event_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT count(*) FROM bookings WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    async fn concurrent_creates_for_last_tickets_sell_exactly_once(pool: PgPool) {
        let admin = seed_user(&pool, "admin@example.com", "ADMIN").await;
        let event_id = seed_event(&pool, admin, 100, 2).await;
        let first = seed_user(&pool, "first@example.com", "CUSTOMER").await;
        let second = seed_user(&pool, "second@example.com", "CUSTOMER").await;

        let (a, b) = tokio::join!(
            apply_create(&pool, event_id, first, 2),
            apply_create(&pool, event_id, second, 2),
        );

        let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);

        let conflict = if a.is_err() {
            a.unwrap_err()
        } else {
            b.unwrap_err()
        };
        assert_eq!(conflict.code(), ErrorCode::NotEnoughTicket);
        assert_eq!(conflict.status_code(), axum::http::StatusCode::CONFLICT);

        assert_eq!(available_tickets(&pool, event_id).await, 0);
        assert_eq!(booking_count(&pool, event_id).await, 1);
    }

    #[sqlx::test]
    async fn create_then_cancel_restores_availability(pool: PgPool) {
        let admin = seed_user(&pool, "admin@example.com", "ADMIN").await;
        let event_id = seed_event(&pool, admin, 100, 40).await;
        let customer = seed_user(&pool, "customer@example.com", "CUSTOMER").await;

        let (booking, event) = apply_create(&pool, event_id, customer, 3).await.unwrap();
        assert_eq!(booking.ticket_count, 3);
        assert_eq!(event.available_tickets, 37);
        assert_eq!(available_tickets(&pool, event_id).await, 37);

        apply_remove(&pool, event_id, booking.id, customer)
            .await
            .unwrap();
        assert_eq!(available_tickets(&pool, event_id).await, 40);
        assert_eq!(booking_count(&pool, event_id).await, 0);

        // Cancelling again finds nothing.
        let err = apply_remove(&pool, event_id, booking.id, customer)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BookingNotFound);
    }

    #[sqlx::test]
    async fn failed_capacity_check_leaves_availability_untouched(pool: PgPool) {
        let admin = seed_user(&pool, "admin@example.com", "ADMIN").await;
        let event_id = seed_event(&pool, admin, 100, 1).await;
        let customer = seed_user(&pool, "customer@example.com", "CUSTOMER").await;

        let err = apply_create(&pool, event_id, customer, 2).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotEnoughTicket);

        assert_eq!(available_tickets(&pool, event_id).await, 1);
        assert_eq!(booking_count(&pool, event_id).await, 0);
    }

    #[sqlx::test]
    async fn booking_a_missing_event_is_not_found(pool: PgPool) {
        let customer = seed_user(&pool, "customer@example.com", "CUSTOMER").await;

        let err = apply_create(&pool, Uuid::new_v4(), customer, 1)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::EventNotFound);
    }

    #[sqlx::test]
    async fn cancel_is_scoped_to_the_booking_owner(pool: PgPool) {
        let admin = seed_user(&pool, "admin@example.com", "ADMIN").await;
        let event_id = seed_event(&pool, admin, 100, 10).await;
        let owner = seed_user(&pool, "owner@example.com", "CUSTOMER").await;
        let other = seed_user(&pool, "other@example.com", "CUSTOMER").await;

        let (booking, _) = apply_create(&pool, event_id, owner, 2).await.unwrap();

        let err = apply_remove(&pool, event_id, booking.id, other)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BookingNotFound);
        assert_eq!(available_tickets(&pool, event_id).await, 8);
    }
}
