use shared::{EmailJob, EmailType};

/// A fully rendered email, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

/// Render the subject and HTML body for a job.
///
/// Every [`EmailType`] has a template; an unknown type cannot reach this point
/// because it already fails payload deserialization in the worker.
pub fn render(job: &EmailJob) -> RenderedEmail {
    RenderedEmail {
        subject: subject_for(job.email_type).to_string(),
        body: body_for(job),
    }
}

fn subject_for(email_type: EmailType) -> &'static str {
    match email_type {
        EmailType::BookingCreatedSuccessful => "Your Booking is Confirmed",
        EmailType::BookingDeletedSuccessful => "Booking Cancellation Confirmed",
        EmailType::EventUpdatedByAdmin => "Event Details Updated",
        EmailType::EventDeletedByAdmin => "Event Cancelled",
    }
}

fn body_for(job: &EmailJob) -> String {
    let event_time = job.event_time.format("%B %-d, %Y at %H:%M UTC");
    match job.email_type {
        EmailType::BookingCreatedSuccessful => format!(
            "<p>Hi {name},</p>\
             <p>Your booking for <strong>{event}</strong> is confirmed.</p>\
             <p>{tickets} ticket(s) &mdash; {venue}, {time}.</p>",
            name = job.user_name,
            event = job.event_name,
            tickets = job.ticket_count,
            venue = job.event_venue,
            time = event_time,
        ),
        EmailType::BookingDeletedSuccessful => format!(
            "<p>Hi {name},</p>\
             <p>Your booking of {tickets} ticket(s) for <strong>{event}</strong> \
             ({venue}, {time}) has been cancelled.</p>",
            name = job.user_name,
            event = job.event_name,
            tickets = job.ticket_count,
            venue = job.event_venue,
            time = event_time,
        ),
        EmailType::EventUpdatedByAdmin => format!(
            "<p>Hi {name},</p>\
             <p>The details of <strong>{event}</strong> have changed. It now takes \
             place at {venue} on {time}.</p>\
             <p>Your booking of {tickets} ticket(s) remains valid.</p>",
            name = job.user_name,
            event = job.event_name,
            tickets = job.ticket_count,
            venue = job.event_venue,
            time = event_time,
        ),
        EmailType::EventDeletedByAdmin => format!(
            "<p>Hi {name},</p>\
             <p>We are sorry: <strong>{event}</strong> ({venue}, {time}) has been \
             cancelled by the organizer. Your booking of {tickets} ticket(s) is no \
             longer valid.</p>",
            name = job.user_name,
            event = job.event_name,
            tickets = job.ticket_count,
            venue = job.event_venue,
            time = event_time,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn job(email_type: EmailType) -> EmailJob {
        EmailJob {
            recipient: "user@example.com".to_string(),
            email_type,
            user_name: "Regular User".to_string(),
            event_name: "Concert in the Park".to_string(),
            event_venue: "Central Park".to_string(),
            event_time: Utc.with_ymd_and_hms(2026, 11, 15, 18, 0, 0).unwrap(),
            ticket_count: 2,
            booking_id: None,
        }
    }

    #[test]
    fn every_type_renders_subject_and_body() {
        for email_type in [
            EmailType::BookingCreatedSuccessful,
            EmailType::BookingDeletedSuccessful,
            EmailType::EventUpdatedByAdmin,
            EmailType::EventDeletedByAdmin,
        ] {
            let rendered = render(&job(email_type));
            assert!(!rendered.subject.is_empty());
            assert!(rendered.body.contains("Regular User"));
            assert!(rendered.body.contains("Concert in the Park"));
            assert!(rendered.body.contains("Central Park"));
        }
    }

    #[test]
    fn booking_confirmation_mentions_ticket_count() {
        let rendered = render(&job(EmailType::BookingCreatedSuccessful));
        assert_eq!(rendered.subject, "Your Booking is Confirmed");
        assert!(rendered.body.contains("2 ticket(s)"));
    }

    #[test]
    fn event_deletion_has_distinct_subject() {
        let rendered = render(&job(EmailType::EventDeletedByAdmin));
        assert_eq!(rendered.subject, "Event Cancelled");
    }
}
