use std::sync::Arc;

use async_trait::async_trait;
use dao::{
    mechanic::{MechanicDao, MechanicEntity},
    DaoError,
};
use sqlx::Row;
use time::format_description::well_known::Iso8601;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::{uuid_from_blob, ResultDbErrorExt, TransactionImpl};

#[derive(Debug, sqlx::FromRow)]
struct MechanicDb {
    id: Vec<u8>,
    name: String,
    inactive: bool,
    deleted: Option<String>,
    update_version: Vec<u8>,
}
impl TryFrom<&MechanicDb> for MechanicEntity {
    type Error = DaoError;
    fn try_from(mechanic: &MechanicDb) -> Result<Self, Self::Error> {
        Ok(Self {
            id: uuid_from_blob(&mechanic.id)?,
            name: mechanic.name.as_str().into(),
            inactive: mechanic.inactive,
            deleted: mechanic
                .deleted
                .as_ref()
                .map(|deleted| PrimitiveDateTime::parse(deleted, &Iso8601::DATE_TIME))
                .transpose()?,
            version: uuid_from_blob(&mechanic.update_version)?,
        })
    }
}

pub struct MechanicDaoImpl {
    pub _pool: Arc<sqlx::SqlitePool>,
}
impl MechanicDaoImpl {
    pub fn new(pool: Arc<sqlx::SqlitePool>) -> Self {
        Self { _pool: pool }
    }
}

#[async_trait]
impl MechanicDao for MechanicDaoImpl {
    type Transaction = TransactionImpl;

    async fn all(&self, tx: Self::Transaction) -> Result<Arc<[MechanicEntity]>, DaoError> {
        let rows: Vec<MechanicDb> = sqlx::query_as(
            "SELECT id, name, inactive, deleted, update_version FROM mechanic WHERE deleted IS NULL",
        )
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        rows.iter().map(MechanicEntity::try_from).collect()
    }

    async fn find_by_id(
        &self,
        id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Option<MechanicEntity>, DaoError> {
        let row: Option<MechanicDb> = sqlx::query_as(
            "SELECT id, name, inactive, deleted, update_version FROM mechanic WHERE id = ?",
        )
        .bind(id.as_bytes().to_vec())
        .fetch_optional(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        row.as_ref().map(MechanicEntity::try_from).transpose()
    }

    async fn create(
        &self,
        entity: &MechanicEntity,
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
            "INSERT INTO mechanic (id, name, inactive, deleted, update_version, update_process) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entity.id.as_bytes().to_vec())
        .bind(entity.name.as_ref())
        .bind(entity.inactive)
        .bind(deleted)
        .bind(entity.version.as_bytes().to_vec())
        .bind(process)
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(())
    }

    async fn get_assigned_user(
        &self,
        mechanic_id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Option<Arc<str>>, DaoError> {
        let row = sqlx::query("SELECT user_name FROM mechanic_user WHERE mechanic_id = ?")
            .bind(mechanic_id.as_bytes().to_vec())
            .fetch_optional(tx.tx.lock().await.as_mut())
            .await
            .map_db_error()?;
        row.map(|row| {
            Ok(row
                .try_get::<String, _>("user_name")
                .map_db_error()?
                .as_str()
                .into())
        })
        .transpose()
    }

    async fn assign_to_user(
        &self,
        mechanic_id: Uuid,
        user: &str,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        sqlx::query(
            "INSERT INTO mechanic_user (mechanic_id, user_name, update_process) VALUES (?, ?, ?)",
        )
        .bind(mechanic_id.as_bytes().to_vec())
        .bind(user)
        .bind(process)
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(())
    }

    async fn find_mechanic_by_user_id(
        &self,
        user: &str,
        tx: Self::Transaction,
    ) -> Result<Option<MechanicEntity>, DaoError> {
        let row: Option<MechanicDb> = sqlx::query_as(
            "SELECT mechanic.id, mechanic.name, mechanic.inactive, mechanic.deleted, \
             mechanic.update_version FROM mechanic \
             INNER JOIN mechanic_user ON mechanic.id = mechanic_user.mechanic_id \
             WHERE mechanic_user.user_name = ? AND mechanic.deleted IS NULL",
        )
        .bind(user)
        .fetch_optional(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        row.as_ref().map(MechanicEntity::try_from).transpose()
    }
}
