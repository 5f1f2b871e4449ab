use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::permission::Authentication;
use crate::ServiceError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vehicle {
    pub id: Uuid,
    pub owner: Arc<str>,
    pub make: Arc<str>,
    pub model: Arc<str>,
    pub build_year: i32,
    pub license_plate: Arc<str>,
    pub deleted: Option<time::PrimitiveDateTime>,
    pub version: Uuid,
}
impl From<&dao::vehicle::VehicleEntity> for Vehicle {
    fn from(vehicle: &dao::vehicle::VehicleEntity) -> Self {
        Self {
            id: vehicle.id,
            owner: vehicle.owner.clone(),
            make: vehicle.make.clone(),
            model: vehicle.model.clone(),
            build_year: vehicle.build_year,
            license_plate: vehicle.license_plate.clone(),
            deleted: vehicle.deleted,
            version: vehicle.version,
        }
    }
}
impl From<&Vehicle> for dao::vehicle::VehicleEntity {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            id: vehicle.id,
            owner: vehicle.owner.clone(),
            make: vehicle.make.clone(),
            model: vehicle.model.clone(),
            build_year: vehicle.build_year,
            license_plate: vehicle.license_plate.clone(),
            deleted: vehicle.deleted,
            version: vehicle.version,
        }
    }
}
garage_utils::derive_from_reference!(dao::vehicle::VehicleEntity, Vehicle);

/// Read-only vehicle directory; vehicle records are owned by an external
/// collaborator.
#[automock(type Context=(); type Transaction=dao::MockTransaction;)]
#[async_trait]
pub trait VehicleService {
    type Context: Clone + Debug + PartialEq + Eq + Send + Sync + 'static;
    type Transaction: dao::Transaction;

    async fn get(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Vehicle, ServiceError>;

    async fn get_for_current_user(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[Vehicle]>, ServiceError>;

    /// Succeeds when the authenticated user owns the vehicle.
    async fn verify_user_owns_vehicle(
        &self,
        vehicle_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(), ServiceError>;
}
