use async_trait::async_trait;
use dao::notification_outbox::{NotificationOutboxDao, NotificationOutboxEntity};
use minijinja::{context, Environment};
use service::{
    booking::Booking,
    clock::ClockService,
    mechanic::MechanicService,
    notification::{BookingEventKind, NotificationService},
    permission::Authentication,
    uuid_service::UuidService,
    ServiceError,
};

use crate::gen_service_impl;

gen_service_impl! {
    struct NotificationServiceImpl: NotificationService = NotificationServiceDeps {
        NotificationOutboxDao: NotificationOutboxDao = notification_outbox_dao,
        MechanicService: MechanicService<Context = Self::Context, Transaction = Self::Transaction> = mechanic_service,
        ClockService: ClockService = clock_service,
        UuidService: UuidService = uuid_service,
    }
}

const NOTIFICATION_SERVICE_PROCESS: &str = "notification-service";

fn templates(kind: BookingEventKind) -> (&'static str, &'static str) {
    match kind {
        BookingEventKind::Created => (
            "Booking request received",
            "Hi {{ customer }}, we received your booking for {{ date }} at {{ time }}. \
             We will confirm it shortly.",
        ),
        BookingEventKind::Confirmed => (
            "Booking confirmed",
            "Hi {{ customer }}, your booking on {{ date }} at {{ time }} is confirmed.",
        ),
        BookingEventKind::Cancelled { .. } => (
            "Booking cancelled",
            "The booking on {{ date }} at {{ time }} was cancelled by the {{ cancelled_by }}.\
             {% if reason %} Reason: {{ reason }}{% endif %}",
        ),
        BookingEventKind::Completed => (
            "Service completed",
            "Hi {{ customer }}, your service on {{ date }} is completed. \
             We would love to read your review.",
        ),
        BookingEventKind::Rescheduled => (
            "Booking rescheduled",
            "Hi {{ customer }}, your booking moved to {{ date }} at {{ time }}.",
        ),
        BookingEventKind::MarkedNoShow => (
            "Missed appointment",
            "Hi {{ customer }}, you missed your booking on {{ date }} at {{ time }}.",
        ),
    }
}

#[async_trait]
impl<Deps: NotificationServiceDeps> NotificationService for NotificationServiceImpl<Deps> {
    async fn booking_event(
        &self,
        kind: BookingEventKind,
        booking: &Booking,
    ) -> Result<(), ServiceError> {
        let (subject, body_template) = templates(kind);
        let cancelled_by = match kind {
            BookingEventKind::Cancelled { cancelled_by } => Some(cancelled_by.as_str()),
            _ => None,
        };
        let environment = Environment::new();
        let body = environment
            .render_str(
                body_template,
                context! {
                    customer => booking.customer.as_ref(),
                    date => booking.booking_date.to_string(),
                    time => format!(
                        "{:02}:{:02}",
                        booking.booking_time.hour(),
                        booking.booking_time.minute()
                    ),
                    cancelled_by => cancelled_by,
                    reason => booking.cancellation_reason.as_deref(),
                },
            )
            .map_err(|_| ServiceError::InternalError)?;

        // Cancellations go to both sides of the appointment.
        let mut recipients = vec![booking.customer.clone()];
        if matches!(kind, BookingEventKind::Cancelled { .. }) {
            if let Some(mechanic_user) = self
                .mechanic_service
                .get_assigned_user(booking.mechanic_id, Authentication::Full, None)
                .await?
            {
                recipients.push(mechanic_user);
            }
        }

        for recipient in recipients {
            let entity = NotificationOutboxEntity {
                id: self.uuid_service.new_uuid("notification-id"),
                booking_id: booking.id,
                event_kind: kind.as_str().into(),
                recipient,
                subject: subject.into(),
                body: body.as_str().into(),
                created: self.clock_service.date_time_now(),
            };
            self.notification_outbox_dao
                .enqueue(&entity, NOTIFICATION_SERVICE_PROCESS)
                .await?;
        }
        tracing::info!("Enqueued {} for booking {}", kind.as_str(), booking.id);
        Ok(())
    }
}
