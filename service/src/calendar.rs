use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::booking::Booking;
use crate::permission::Authentication;
use crate::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u8,
}

/// Read-only projection of a mechanic's calendar: the bookings which occupy
/// slots, ordered for display.
#[automock(type Context=(); type Transaction=dao::MockTransaction;)]
#[async_trait]
pub trait MechanicCalendarService {
    type Context: Clone + Debug + PartialEq + Eq + Send + Sync + 'static;
    type Transaction: dao::Transaction;

    async fn get_calendar(
        &self,
        mechanic_id: Uuid,
        month: Option<CalendarMonth>,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[Booking]>, ServiceError>;
}
