use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Default number of delivery attempts before a job is dead-lettered.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// The kind of email a job asks the worker to send.
///
/// Unknown types must fail deserialization rather than fall through to some
/// default template, so this is a closed enum on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailType {
    BookingCreatedSuccessful,
    BookingDeletedSuccessful,
    EventUpdatedByAdmin,
    EventDeletedByAdmin,
}

impl EmailType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailType::BookingCreatedSuccessful => "booking_created_successful",
            EmailType::BookingDeletedSuccessful => "booking_deleted_successful",
            EmailType::EventUpdatedByAdmin => "event_updated_by_admin",
            EmailType::EventDeletedByAdmin => "event_deleted_by_admin",
        }
    }
}

impl std::fmt::Display for EmailType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a single notification job.
///
/// Field names are the queue wire contract; both services must agree on them.
/// Delivery is at-least-once and jobs carry no idempotency key, so duplicate
/// sends are possible and acceptable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailJob {
    pub recipient: String,
    pub email_type: EmailType,
    pub user_name: String,
    pub event_name: String,
    pub event_venue: String,
    pub event_time: DateTime<Utc>,
    pub ticket_count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<Uuid>,
}

/// Queue-level envelope around a job payload.
///
/// The payload stays an opaque JSON value here; the worker re-validates it
/// against [`EmailJob`] on dequeue, mirroring the producer-side validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub id: Uuid,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub data: Value,
}

impl JobEnvelope {
    pub fn new(data: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            attempts_made: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_job() -> EmailJob {
        EmailJob {
            recipient: "user@example.com".to_string(),
            email_type: EmailType::BookingCreatedSuccessful,
            user_name: "Regular User".to_string(),
            event_name: "Concert in the Park".to_string(),
            event_venue: "Central Park".to_string(),
            event_time: Utc.with_ymd_and_hms(2026, 11, 15, 18, 0, 0).unwrap(),
            ticket_count: 2,
            booking_id: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn job_serializes_with_wire_field_names() {
        let value = serde_json::to_value(sample_job()).unwrap();
        let obj = value.as_object().unwrap();

        assert_eq!(obj["emailType"], "booking_created_successful");
        assert!(obj.contains_key("recipient"));
        assert!(obj.contains_key("userName"));
        assert!(obj.contains_key("eventName"));
        assert!(obj.contains_key("eventVenue"));
        assert!(obj.contains_key("eventTime"));
        assert!(obj.contains_key("ticketCount"));
        assert!(obj.contains_key("bookingId"));
    }

    #[test]
    fn booking_id_is_optional() {
        let mut job = sample_job();
        job.booking_id = None;
        let value = serde_json::to_value(&job).unwrap();
        assert!(!value.as_object().unwrap().contains_key("bookingId"));

        let parsed: EmailJob = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.booking_id, None);
    }

    #[test]
    fn unknown_email_type_is_rejected() {
        let mut value = serde_json::to_value(sample_job()).unwrap();
        value["emailType"] = "booking_created_failed".into();
        assert!(serde_json::from_value::<EmailJob>(value).is_err());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let mut value = serde_json::to_value(sample_job()).unwrap();
        value.as_object_mut().unwrap().remove("recipient");
        assert!(serde_json::from_value::<EmailJob>(value).is_err());
    }

    #[test]
    fn envelope_round_trips() {
        let job = sample_job();
        let envelope = JobEnvelope::new(serde_json::to_value(&job).unwrap());
        let raw = serde_json::to_string(&envelope).unwrap();

        let parsed: JobEnvelope = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.id, envelope.id);
        assert_eq!(parsed.attempts_made, 0);
        assert_eq!(parsed.max_attempts, DEFAULT_MAX_ATTEMPTS);

        let inner: EmailJob = serde_json::from_value(parsed.data).unwrap();
        assert_eq!(inner, job);
    }
}
