use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::DaoError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VehicleEntity {
    pub id: Uuid,
    pub owner: Arc<str>,
    pub make: Arc<str>,
    pub model: Arc<str>,
    pub build_year: i32,
    pub license_plate: Arc<str>,
    pub deleted: Option<PrimitiveDateTime>,
    pub version: Uuid,
}

#[automock(type Transaction = crate::MockTransaction;)]
#[async_trait]
pub trait VehicleDao {
    type Transaction: crate::Transaction;

    async fn find_by_id(
        &self,
        id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Option<VehicleEntity>, DaoError>;
    async fn find_by_owner(
        &self,
        owner: &str,
        tx: Self::Transaction,
    ) -> Result<Arc<[VehicleEntity]>, DaoError>;
    async fn create(
        &self,
        entity: &VehicleEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;
}
