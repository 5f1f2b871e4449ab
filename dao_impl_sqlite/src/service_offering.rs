use std::sync::Arc;

use async_trait::async_trait;
use dao::{
    service_offering::{ServiceOfferingDao, ServiceOfferingEntity},
    DaoError,
};
use time::format_description::well_known::Iso8601;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::{uuid_from_blob, ResultDbErrorExt, TransactionImpl};

const OFFERING_COLUMNS: &str = "id, name, description, base_cost, estimated_duration_minutes, \
    is_available, default_mechanic_id, booking_count, deleted, update_version";

#[derive(Debug, sqlx::FromRow)]
struct ServiceOfferingDb {
    id: Vec<u8>,
    name: String,
    description: Option<String>,
    base_cost: f64,
    estimated_duration_minutes: i64,
    is_available: bool,
    default_mechanic_id: Option<Vec<u8>>,
    booking_count: i64,
    deleted: Option<String>,
    update_version: Vec<u8>,
}
impl TryFrom<&ServiceOfferingDb> for ServiceOfferingEntity {
    type Error = DaoError;
    fn try_from(offering: &ServiceOfferingDb) -> Result<Self, Self::Error> {
        Ok(Self {
            id: uuid_from_blob(&offering.id)?,
            name: offering.name.as_str().into(),
            description: offering
                .description
                .as_ref()
                .map(|description| description.as_str().into()),
            base_cost: offering.base_cost,
            estimated_duration_minutes: offering.estimated_duration_minutes as u32,
            is_available: offering.is_available,
            default_mechanic_id: offering
                .default_mechanic_id
                .as_deref()
                .map(uuid_from_blob)
                .transpose()?,
            booking_count: offering.booking_count as u32,
            deleted: offering
                .deleted
                .as_ref()
                .map(|deleted| PrimitiveDateTime::parse(deleted, &Iso8601::DATE_TIME))
                .transpose()?,
            version: uuid_from_blob(&offering.update_version)?,
        })
    }
}

pub struct ServiceOfferingDaoImpl {
    pub _pool: Arc<sqlx::SqlitePool>,
}
impl ServiceOfferingDaoImpl {
    pub fn new(pool: Arc<sqlx::SqlitePool>) -> Self {
        Self { _pool: pool }
    }
}

#[async_trait]
impl ServiceOfferingDao for ServiceOfferingDaoImpl {
    type Transaction = TransactionImpl;

    async fn all(&self, tx: Self::Transaction) -> Result<Arc<[ServiceOfferingEntity]>, DaoError> {
        let rows: Vec<ServiceOfferingDb> = sqlx::query_as(&format!(
            "SELECT {OFFERING_COLUMNS} FROM service_offering WHERE deleted IS NULL"
        ))
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        rows.iter().map(ServiceOfferingEntity::try_from).collect()
    }

    async fn find_by_id(
        &self,
        id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Option<ServiceOfferingEntity>, DaoError> {
        let row: Option<ServiceOfferingDb> = sqlx::query_as(&format!(
            "SELECT {OFFERING_COLUMNS} FROM service_offering WHERE id = ?"
        ))
        .bind(id.as_bytes().to_vec())
        .fetch_optional(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        row.as_ref().map(ServiceOfferingEntity::try_from).transpose()
    }

    async fn create(
        &self,
        entity: &ServiceOfferingEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        let deleted = entity
            .deleted
            .as_ref()
            .map(|deleted| deleted.format(&Iso8601::DATE_TIME))
            .transpose()
            .map_db_error()?;
        sqlx::query(
            "INSERT INTO service_offering (id, name, description, base_cost, \
             estimated_duration_minutes, is_available, default_mechanic_id, booking_count, \
             deleted, update_version, update_process) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entity.id.as_bytes().to_vec())
        .bind(entity.name.as_ref())
        .bind(
            entity
                .description
                .as_ref()
                .map(|description| description.to_string()),
        )
        .bind(entity.base_cost)
        .bind(i64::from(entity.estimated_duration_minutes))
        .bind(entity.is_available)
        .bind(
            entity
                .default_mechanic_id
                .map(|id| id.as_bytes().to_vec()),
        )
        .bind(i64::from(entity.booking_count))
        .bind(deleted)
        .bind(entity.version.as_bytes().to_vec())
        .bind(process)
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(())
    }

    async fn increment_booking_count(
        &self,
        id: Uuid,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        sqlx::query(
            "UPDATE service_offering SET booking_count = booking_count + 1, update_process = ? \
             WHERE id = ?",
        )
        .bind(process)
        .bind(id.as_bytes().to_vec())
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(())
    }
}
