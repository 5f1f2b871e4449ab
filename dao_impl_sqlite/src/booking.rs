use std::sync::Arc;

use async_trait::async_trait;
use dao::{
    booking::{ActorRole, BookingDao, BookingEntity, BookingStatus, RescheduleEntryEntity, ServiceLocation},
    DaoError,
};
use sqlx::Row;
use time::format_description::well_known::Iso8601;
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

use crate::{uuid_from_blob, ResultDbErrorExt, TransactionImpl, DATE_FORMAT, TIME_FORMAT};

const BOOKING_COLUMNS: &str = "id, customer, mechanic_id, vehicle_id, service_offering_id, \
    booking_date, booking_time, estimated_duration_minutes, status, service_location, \
    estimated_cost, actual_cost, customer_notes, mechanic_notes, admin_notes, \
    cancellation_reason, cancelled_by, created, created_by, update_version";

#[derive(Debug, sqlx::FromRow)]
struct BookingDb {
    id: Vec<u8>,
    customer: String,
    mechanic_id: Vec<u8>,
    vehicle_id: Vec<u8>,
    service_offering_id: Vec<u8>,
    booking_date: String,
    booking_time: String,
    estimated_duration_minutes: i64,
    status: String,
    service_location: String,
    estimated_cost: f64,
    actual_cost: Option<f64>,
    customer_notes: Option<String>,
    mechanic_notes: Option<String>,
    admin_notes: Option<String>,
    cancellation_reason: Option<String>,
    cancelled_by: Option<String>,
    created: String,
    created_by: Option<String>,
    update_version: Vec<u8>,
}
impl BookingDb {
    fn to_entity(
        &self,
        reschedule_history: Arc<[RescheduleEntryEntity]>,
    ) -> Result<BookingEntity, DaoError> {
        Ok(BookingEntity {
            id: uuid_from_blob(&self.id)?,
            customer: self.customer.as_str().into(),
            mechanic_id: uuid_from_blob(&self.mechanic_id)?,
            vehicle_id: uuid_from_blob(&self.vehicle_id)?,
            service_offering_id: uuid_from_blob(&self.service_offering_id)?,
            booking_date: Date::parse(&self.booking_date, DATE_FORMAT)?,
            booking_time: Time::parse(&self.booking_time, TIME_FORMAT)?,
            estimated_duration_minutes: self.estimated_duration_minutes as u32,
            status: BookingStatus::from_db(&self.status)?,
            service_location: ServiceLocation::from_db(&self.service_location)?,
            estimated_cost: self.estimated_cost,
            actual_cost: self.actual_cost,
            customer_notes: self.customer_notes.as_ref().map(|notes| notes.as_str().into()),
            mechanic_notes: self.mechanic_notes.as_ref().map(|notes| notes.as_str().into()),
            admin_notes: self.admin_notes.as_ref().map(|notes| notes.as_str().into()),
            cancellation_reason: self
                .cancellation_reason
                .as_ref()
                .map(|reason| reason.as_str().into()),
            cancelled_by: self.cancelled_by.as_deref().map(ActorRole::from_db).transpose()?,
            reschedule_history,
            created: PrimitiveDateTime::parse(&self.created, &Iso8601::DATE_TIME)?,
            created_by: self.created_by.as_ref().map(|user| user.as_str().into()),
            version: uuid_from_blob(&self.update_version)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RescheduleDb {
    original_date: String,
    original_time: String,
    new_date: String,
    new_time: String,
    reason: Option<String>,
    changed_by: String,
    changed_at: String,
}
impl TryFrom<&RescheduleDb> for RescheduleEntryEntity {
    type Error = DaoError;
    fn try_from(entry: &RescheduleDb) -> Result<Self, Self::Error> {
        Ok(Self {
            original_date: Date::parse(&entry.original_date, DATE_FORMAT)?,
            original_time: Time::parse(&entry.original_time, TIME_FORMAT)?,
            new_date: Date::parse(&entry.new_date, DATE_FORMAT)?,
            new_time: Time::parse(&entry.new_time, TIME_FORMAT)?,
            reason: entry.reason.as_ref().map(|reason| reason.as_str().into()),
            changed_by: entry.changed_by.as_str().into(),
            changed_at: PrimitiveDateTime::parse(&entry.changed_at, &Iso8601::DATE_TIME)?,
        })
    }
}

pub struct BookingDaoImpl {
    pub _pool: Arc<sqlx::SqlitePool>,
}
impl BookingDaoImpl {
    pub fn new(pool: Arc<sqlx::SqlitePool>) -> Self {
        Self { _pool: pool }
    }

    async fn load_history(
        &self,
        booking_id: &[u8],
        tx: &TransactionImpl,
    ) -> Result<Arc<[RescheduleEntryEntity]>, DaoError> {
        let rows: Vec<RescheduleDb> = sqlx::query_as(
            "SELECT original_date, original_time, new_date, new_time, reason, changed_by, \
             changed_at FROM booking_reschedule WHERE booking_id = ? ORDER BY position",
        )
        .bind(booking_id)
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        rows.iter().map(RescheduleEntryEntity::try_from).collect()
    }

    async fn attach_history(
        &self,
        rows: Vec<BookingDb>,
        tx: &TransactionImpl,
    ) -> Result<Arc<[BookingEntity]>, DaoError> {
        let mut entities = Vec::with_capacity(rows.len());
        for row in &rows {
            let history = self.load_history(&row.id, tx).await?;
            entities.push(row.to_entity(history)?);
        }
        Ok(entities.into())
    }

    async fn store_history(
        &self,
        entity: &BookingEntity,
        process: &str,
        tx: &TransactionImpl,
    ) -> Result<(), DaoError> {
        let id_blob = entity.id.as_bytes().to_vec();
        let row = sqlx::query("SELECT count(*) as results FROM booking_reschedule WHERE booking_id = ?")
            .bind(&id_blob)
            .fetch_one(tx.tx.lock().await.as_mut())
            .await
            .map_db_error()?;
        let persisted: i64 = row.try_get("results").map_db_error()?;

        // The history is append-only: rows already persisted are never
        // touched, only the new tail is written.
        for (position, entry) in entity
            .reschedule_history
            .iter()
            .enumerate()
            .skip(persisted as usize)
        {
            sqlx::query(
                "INSERT INTO booking_reschedule (booking_id, position, original_date, \
                 original_time, new_date, new_time, reason, changed_by, changed_at, \
                 update_process) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&id_blob)
            .bind(position as i64)
            .bind(entry.original_date.format(DATE_FORMAT).map_db_error()?)
            .bind(entry.original_time.format(TIME_FORMAT).map_db_error()?)
            .bind(entry.new_date.format(DATE_FORMAT).map_db_error()?)
            .bind(entry.new_time.format(TIME_FORMAT).map_db_error()?)
            .bind(entry.reason.as_ref().map(|reason| reason.to_string()))
            .bind(entry.changed_by.as_ref())
            .bind(entry.changed_at.format(&Iso8601::DATE_TIME).map_db_error()?)
            .bind(process)
            .execute(tx.tx.lock().await.as_mut())
            .await
            .map_db_error()?;
        }
        Ok(())
    }
}

#[async_trait]
impl BookingDao for BookingDaoImpl {
    type Transaction = TransactionImpl;

    async fn all(&self, tx: Self::Transaction) -> Result<Arc<[BookingEntity]>, DaoError> {
        let rows: Vec<BookingDb> =
            sqlx::query_as(&format!("SELECT {BOOKING_COLUMNS} FROM booking"))
                .fetch_all(tx.tx.lock().await.as_mut())
                .await
                .map_db_error()?;
        self.attach_history(rows, &tx).await
    }

    async fn find_by_id(
        &self,
        id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Option<BookingEntity>, DaoError> {
        let row: Option<BookingDb> =
            sqlx::query_as(&format!("SELECT {BOOKING_COLUMNS} FROM booking WHERE id = ?"))
                .bind(id.as_bytes().to_vec())
                .fetch_optional(tx.tx.lock().await.as_mut())
                .await
                .map_db_error()?;
        match row {
            Some(row) => {
                let history = self.load_history(&row.id, &tx).await?;
                Ok(Some(row.to_entity(history)?))
            }
            None => Ok(None),
        }
    }

    async fn find_by_customer(
        &self,
        customer: &str,
        tx: Self::Transaction,
    ) -> Result<Arc<[BookingEntity]>, DaoError> {
        let rows: Vec<BookingDb> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM booking WHERE customer = ?"
        ))
        .bind(customer)
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        self.attach_history(rows, &tx).await
    }

    async fn find_by_mechanic(
        &self,
        mechanic_id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Arc<[BookingEntity]>, DaoError> {
        let rows: Vec<BookingDb> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM booking WHERE mechanic_id = ?"
        ))
        .bind(mechanic_id.as_bytes().to_vec())
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        self.attach_history(rows, &tx).await
    }

    async fn find_active_by_mechanic(
        &self,
        mechanic_id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Arc<[BookingEntity]>, DaoError> {
        let rows: Vec<BookingDb> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM booking WHERE mechanic_id = ? \
             AND status IN ('confirmed', 'in_progress')"
        ))
        .bind(mechanic_id.as_bytes().to_vec())
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        self.attach_history(rows, &tx).await
    }

    async fn create(
        &self,
        entity: &BookingEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        sqlx::query(
            "INSERT INTO booking (id, customer, mechanic_id, vehicle_id, service_offering_id, \
             booking_date, booking_time, estimated_duration_minutes, status, service_location, \
             estimated_cost, actual_cost, customer_notes, mechanic_notes, admin_notes, \
             cancellation_reason, cancelled_by, created, created_by, update_version, \
             update_process) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entity.id.as_bytes().to_vec())
        .bind(entity.customer.as_ref())
        .bind(entity.mechanic_id.as_bytes().to_vec())
        .bind(entity.vehicle_id.as_bytes().to_vec())
        .bind(entity.service_offering_id.as_bytes().to_vec())
        .bind(entity.booking_date.format(DATE_FORMAT).map_db_error()?)
        .bind(entity.booking_time.format(TIME_FORMAT).map_db_error()?)
        .bind(i64::from(entity.estimated_duration_minutes))
        .bind(entity.status.as_db())
        .bind(entity.service_location.as_db())
        .bind(entity.estimated_cost)
        .bind(entity.actual_cost)
        .bind(entity.customer_notes.as_ref().map(|notes| notes.to_string()))
        .bind(entity.mechanic_notes.as_ref().map(|notes| notes.to_string()))
        .bind(entity.admin_notes.as_ref().map(|notes| notes.to_string()))
        .bind(
            entity
                .cancellation_reason
                .as_ref()
                .map(|reason| reason.to_string()),
        )
        .bind(entity.cancelled_by.map(|role| role.as_db()))
        .bind(entity.created.format(&Iso8601::DATE_TIME).map_db_error()?)
        .bind(entity.created_by.as_ref().map(|user| user.to_string()))
        .bind(entity.version.as_bytes().to_vec())
        .bind(process)
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;

        self.store_history(entity, process, &tx).await
    }

    async fn update(
        &self,
        entity: &BookingEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        sqlx::query(
            "UPDATE booking SET booking_date = ?, booking_time = ?, status = ?, \
             estimated_cost = ?, actual_cost = ?, customer_notes = ?, mechanic_notes = ?, \
             admin_notes = ?, cancellation_reason = ?, cancelled_by = ?, update_version = ?, \
             update_process = ? WHERE id = ?",
        )
        .bind(entity.booking_date.format(DATE_FORMAT).map_db_error()?)
        .bind(entity.booking_time.format(TIME_FORMAT).map_db_error()?)
        .bind(entity.status.as_db())
        .bind(entity.estimated_cost)
        .bind(entity.actual_cost)
        .bind(entity.customer_notes.as_ref().map(|notes| notes.to_string()))
        .bind(entity.mechanic_notes.as_ref().map(|notes| notes.to_string()))
        .bind(entity.admin_notes.as_ref().map(|notes| notes.to_string()))
        .bind(
            entity
                .cancellation_reason
                .as_ref()
                .map(|reason| reason.to_string()),
        )
        .bind(entity.cancelled_by.map(|role| role.as_db()))
        .bind(entity.version.as_bytes().to_vec())
        .bind(process)
        .bind(entity.id.as_bytes().to_vec())
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;

        self.store_history(entity, process, &tx).await
    }
}
