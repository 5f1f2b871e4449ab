use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::DaoError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationOutboxEntity {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub event_kind: Arc<str>,
    pub recipient: Arc<str>,
    pub subject: Arc<str>,
    pub body: Arc<str>,
    pub created: PrimitiveDateTime,
}

/// Outbox rows are written outside the booking transaction: events are
/// enqueued only after the lifecycle mutation committed, and a failed
/// enqueue must never undo it.
#[automock]
#[async_trait]
pub trait NotificationOutboxDao {
    async fn enqueue(
        &self,
        entity: &NotificationOutboxEntity,
        process: &str,
    ) -> Result<(), DaoError>;
    async fn all(&self) -> Result<Arc<[NotificationOutboxEntity]>, DaoError>;
}
