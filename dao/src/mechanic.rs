use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::DaoError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MechanicEntity {
    pub id: Uuid,
    pub name: Arc<str>,
    pub inactive: bool,
    pub deleted: Option<PrimitiveDateTime>,
    pub version: Uuid,
}

#[automock(type Transaction = crate::MockTransaction;)]
#[async_trait]
pub trait MechanicDao {
    type Transaction: crate::Transaction;

    async fn all(&self, tx: Self::Transaction) -> Result<Arc<[MechanicEntity]>, DaoError>;
    async fn find_by_id(
        &self,
        id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Option<MechanicEntity>, DaoError>;
    async fn create(
        &self,
        entity: &MechanicEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;

    async fn get_assigned_user(
        &self,
        mechanic_id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Option<Arc<str>>, DaoError>;
    async fn assign_to_user(
        &self,
        mechanic_id: Uuid,
        user: &str,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;
    async fn find_mechanic_by_user_id(
        &self,
        user: &str,
        tx: Self::Transaction,
    ) -> Result<Option<MechanicEntity>, DaoError>;
}
