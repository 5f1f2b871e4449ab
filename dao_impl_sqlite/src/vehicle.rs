use std::sync::Arc;

use async_trait::async_trait;
use dao::{
    vehicle::{VehicleDao, VehicleEntity},
    DaoError,
};
use time::format_description::well_known::Iso8601;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::{uuid_from_blob, ResultDbErrorExt, TransactionImpl};

const VEHICLE_COLUMNS: &str =
    "id, owner, make, model, build_year, license_plate, deleted, update_version";

#[derive(Debug, sqlx::FromRow)]
struct VehicleDb {
    id: Vec<u8>,
    owner: String,
    make: String,
    model: String,
    build_year: i64,
    license_plate: String,
    deleted: Option<String>,
    update_version: Vec<u8>,
}
impl TryFrom<&VehicleDb> for VehicleEntity {
    type Error = DaoError;
    fn try_from(vehicle: &VehicleDb) -> Result<Self, Self::Error> {
        Ok(Self {
            id: uuid_from_blob(&vehicle.id)?,
            owner: vehicle.owner.as_str().into(),
            make: vehicle.make.as_str().into(),
            model: vehicle.model.as_str().into(),
            build_year: vehicle.build_year as i32,
            license_plate: vehicle.license_plate.as_str().into(),
            deleted: vehicle
                .deleted
                .as_ref()
                .map(|deleted| PrimitiveDateTime::parse(deleted, &Iso8601::DATE_TIME))
                .transpose()?,
            version: uuid_from_blob(&vehicle.update_version)?,
        })
    }
}

pub struct VehicleDaoImpl {
    pub _pool: Arc<sqlx::SqlitePool>,
}
impl VehicleDaoImpl {
    pub fn new(pool: Arc<sqlx::SqlitePool>) -> Self {
        Self { _pool: pool }
    }
}

#[async_trait]
impl VehicleDao for VehicleDaoImpl {
    type Transaction = TransactionImpl;

    async fn find_by_id(
        &self,
        id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Option<VehicleEntity>, DaoError> {
        let row: Option<VehicleDb> =
            sqlx::query_as(&format!("SELECT {VEHICLE_COLUMNS} FROM vehicle WHERE id = ?"))
                .bind(id.as_bytes().to_vec())
                .fetch_optional(tx.tx.lock().await.as_mut())
                .await
                .map_db_error()?;
        row.as_ref().map(VehicleEntity::try_from).transpose()
    }

    async fn find_by_owner(
        &self,
        owner: &str,
        tx: Self::Transaction,
    ) -> Result<Arc<[VehicleEntity]>, DaoError> {
        let rows: Vec<VehicleDb> = sqlx::query_as(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicle WHERE owner = ? AND deleted IS NULL"
        ))
        .bind(owner)
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        rows.iter().map(VehicleEntity::try_from).collect()
    }

    async fn create(
        &self,
        entity: &VehicleEntity,
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
            "INSERT INTO vehicle (id, owner, make, model, build_year, license_plate, deleted, \
             update_version, update_process) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entity.id.as_bytes().to_vec())
        .bind(entity.owner.as_ref())
        .bind(entity.make.as_ref())
        .bind(entity.model.as_ref())
        .bind(i64::from(entity.build_year))
        .bind(entity.license_plate.as_ref())
        .bind(deleted)
        .bind(entity.version.as_bytes().to_vec())
        .bind(process)
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(())
    }
}
