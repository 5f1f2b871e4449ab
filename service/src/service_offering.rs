use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::permission::Authentication;
use crate::ServiceError;

#[derive(Clone, Debug, PartialEq)]
pub struct ServiceOffering {
    pub id: Uuid,
    pub name: Arc<str>,
    pub description: Option<Arc<str>>,
    pub base_cost: f64,
    pub estimated_duration_minutes: u32,
    pub is_available: bool,
    pub default_mechanic_id: Option<Uuid>,
    pub booking_count: u32,
    pub deleted: Option<time::PrimitiveDateTime>,
    pub version: Uuid,
}
impl From<&dao::service_offering::ServiceOfferingEntity> for ServiceOffering {
    fn from(offering: &dao::service_offering::ServiceOfferingEntity) -> Self {
        Self {
            id: offering.id,
            name: offering.name.clone(),
            description: offering.description.clone(),
            base_cost: offering.base_cost,
            estimated_duration_minutes: offering.estimated_duration_minutes,
            is_available: offering.is_available,
            default_mechanic_id: offering.default_mechanic_id,
            booking_count: offering.booking_count,
            deleted: offering.deleted,
            version: offering.version,
        }
    }
}
impl From<&ServiceOffering> for dao::service_offering::ServiceOfferingEntity {
    fn from(offering: &ServiceOffering) -> Self {
        Self {
            id: offering.id,
            name: offering.name.clone(),
            description: offering.description.clone(),
            base_cost: offering.base_cost,
            estimated_duration_minutes: offering.estimated_duration_minutes,
            is_available: offering.is_available,
            default_mechanic_id: offering.default_mechanic_id,
            booking_count: offering.booking_count,
            deleted: offering.deleted,
            version: offering.version,
        }
    }
}
garage_utils::derive_from_reference!(dao::service_offering::ServiceOfferingEntity, ServiceOffering);

/// Read-only service catalog. Bookings snapshot cost and duration from here
/// at creation time.
#[automock(type Context=(); type Transaction=dao::MockTransaction;)]
#[async_trait]
pub trait ServiceOfferingService {
    type Context: Clone + Debug + PartialEq + Eq + Send + Sync + 'static;
    type Transaction: dao::Transaction;

    async fn get_all(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[ServiceOffering]>, ServiceError>;

    async fn get(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<ServiceOffering, ServiceError>;

    /// Counts a successfully placed booking. Internal operation, requires
    /// full authentication.
    async fn record_booking(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(), ServiceError>;
}
