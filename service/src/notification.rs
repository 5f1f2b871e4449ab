use async_trait::async_trait;
use mockall::automock;

use crate::booking::{ActorRole, Booking};
use crate::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookingEventKind {
    Created,
    Confirmed,
    Cancelled { cancelled_by: ActorRole },
    Completed,
    Rescheduled,
    MarkedNoShow,
}
impl BookingEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "booking_created",
            Self::Confirmed => "booking_confirmed",
            Self::Cancelled { .. } => "booking_cancelled",
            Self::Completed => "booking_completed",
            Self::Rescheduled => "booking_rescheduled",
            Self::MarkedNoShow => "booking_no_show",
        }
    }
}

/// Boundary to the notification collaborator. The engine only decides which
/// event fired; formatting and delivery live behind this trait. Callers
/// dispatch after the state change is committed and must treat failures as
/// non-fatal.
#[automock]
#[async_trait]
pub trait NotificationService {
    async fn booking_event(
        &self,
        kind: BookingEventKind,
        booking: &Booking,
    ) -> Result<(), ServiceError>;
}
