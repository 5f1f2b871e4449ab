use std::sync::Arc;

use async_trait::async_trait;
use dao::{
    notification_outbox::{NotificationOutboxDao, NotificationOutboxEntity},
    DaoError,
};
use time::format_description::well_known::Iso8601;
use time::PrimitiveDateTime;

use crate::{uuid_from_blob, ResultDbErrorExt};

#[derive(Debug, sqlx::FromRow)]
struct NotificationOutboxDb {
    id: Vec<u8>,
    booking_id: Vec<u8>,
    event_kind: String,
    recipient: String,
    subject: String,
    body: String,
    created: String,
}
impl TryFrom<&NotificationOutboxDb> for NotificationOutboxEntity {
    type Error = DaoError;
    fn try_from(entity: &NotificationOutboxDb) -> Result<Self, Self::Error> {
        Ok(Self {
            id: uuid_from_blob(&entity.id)?,
            booking_id: uuid_from_blob(&entity.booking_id)?,
            event_kind: entity.event_kind.as_str().into(),
            recipient: entity.recipient.as_str().into(),
            subject: entity.subject.as_str().into(),
            body: entity.body.as_str().into(),
            created: PrimitiveDateTime::parse(&entity.created, &Iso8601::DATE_TIME)?,
        })
    }
}

/// Writes on its own pool connection: outbox rows are enqueued after the
/// booking transaction committed and must not join it.
pub struct NotificationOutboxDaoImpl {
    pool: Arc<sqlx::SqlitePool>,
}
impl NotificationOutboxDaoImpl {
    pub fn new(pool: Arc<sqlx::SqlitePool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationOutboxDao for NotificationOutboxDaoImpl {
    async fn enqueue(
        &self,
        entity: &NotificationOutboxEntity,
        process: &str,
    ) -> Result<(), DaoError> {
        sqlx::query(
            "INSERT INTO notification_outbox (id, booking_id, event_kind, recipient, subject, \
             body, created, update_process) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entity.id.as_bytes().to_vec())
        .bind(entity.booking_id.as_bytes().to_vec())
        .bind(entity.event_kind.as_ref())
        .bind(entity.recipient.as_ref())
        .bind(entity.subject.as_ref())
        .bind(entity.body.as_ref())
        .bind(entity.created.format(&Iso8601::DATE_TIME).map_db_error()?)
        .bind(process)
        .execute(self.pool.as_ref())
        .await
        .map_db_error()?;
        Ok(())
    }

    async fn all(&self) -> Result<Arc<[NotificationOutboxEntity]>, DaoError> {
        let rows: Vec<NotificationOutboxDb> = sqlx::query_as(
            "SELECT id, booking_id, event_kind, recipient, subject, body, created \
             FROM notification_outbox ORDER BY created",
        )
        .fetch_all(self.pool.as_ref())
        .await
        .map_db_error()?;
        rows.iter().map(NotificationOutboxEntity::try_from).collect()
    }
}
