use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::permission::Authentication;
use crate::ServiceError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mechanic {
    pub id: Uuid,
    pub name: Arc<str>,
    pub inactive: bool,
    pub deleted: Option<time::PrimitiveDateTime>,
    pub version: Uuid,
}
impl Mechanic {
    /// A mechanic can take bookings only while listed and active.
    pub fn is_bookable(&self) -> bool {
        !self.inactive && self.deleted.is_none()
    }
}
impl From<&dao::mechanic::MechanicEntity> for Mechanic {
    fn from(mechanic: &dao::mechanic::MechanicEntity) -> Self {
        Self {
            id: mechanic.id,
            name: mechanic.name.clone(),
            inactive: mechanic.inactive,
            deleted: mechanic.deleted,
            version: mechanic.version,
        }
    }
}
impl From<&Mechanic> for dao::mechanic::MechanicEntity {
    fn from(mechanic: &Mechanic) -> Self {
        Self {
            id: mechanic.id,
            name: mechanic.name.clone(),
            inactive: mechanic.inactive,
            deleted: mechanic.deleted,
            version: mechanic.version,
        }
    }
}
garage_utils::derive_from_reference!(dao::mechanic::MechanicEntity, Mechanic);

/// Read-only mechanic directory. Mechanic records are managed outside this
/// system; the engine only looks them up and links them to login users.
#[automock(type Context=(); type Transaction=dao::MockTransaction;)]
#[async_trait]
pub trait MechanicService {
    type Context: Clone + Debug + PartialEq + Eq + Send + Sync + 'static;
    type Transaction: dao::Transaction;

    async fn get_all(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[Mechanic]>, ServiceError>;

    async fn get(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Mechanic, ServiceError>;

    async fn exists(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<bool, ServiceError>;

    async fn get_assigned_user(
        &self,
        mechanic_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Option<Arc<str>>, ServiceError>;

    async fn get_mechanic_for_user(
        &self,
        user_id: Arc<str>,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Option<Mechanic>, ServiceError>;

    /// Succeeds when the authenticated user is the one assigned to the
    /// mechanic record.
    async fn verify_user_is_mechanic(
        &self,
        mechanic_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(), ServiceError>;
}
