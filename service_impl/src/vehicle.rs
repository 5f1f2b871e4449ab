use std::sync::Arc;

use async_trait::async_trait;
use dao::{vehicle::VehicleDao, TransactionDao};
use service::{
    permission::{Authentication, ADMIN_PRIVILEGE},
    vehicle::{Vehicle, VehicleService},
    PermissionService, ServiceError,
};
use tokio::join;
use uuid::Uuid;

use crate::gen_service_impl;

gen_service_impl! {
    struct VehicleServiceImpl: VehicleService = VehicleServiceDeps {
        VehicleDao: VehicleDao<Transaction = Self::Transaction> = vehicle_dao,
        PermissionService: PermissionService<Context = Self::Context> = permission_service,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
    }
}

#[async_trait]
impl<Deps: VehicleServiceDeps> VehicleService for VehicleServiceImpl<Deps> {
    type Context = Deps::Context;
    type Transaction = Deps::Transaction;

    async fn get(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Vehicle, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let vehicle = self
            .vehicle_dao
            .find_by_id(id, tx.clone())
            .await?
            .filter(|entity| entity.deleted.is_none())
            .as_ref()
            .map(Vehicle::from)
            .ok_or(ServiceError::EntityNotFound(id))?;

        let (admin, owner) = join!(
            self.permission_service
                .check_permission(ADMIN_PRIVILEGE, context.clone()),
            self.permission_service
                .check_user(vehicle.owner.as_ref(), context),
        );
        admin.or(owner)?;

        self.transaction_dao.commit(tx).await?;
        Ok(vehicle)
    }

    async fn get_for_current_user(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[Vehicle]>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let Some(current_user) = self.permission_service.current_user_id(context).await? else {
            return Err(ServiceError::Forbidden);
        };
        let ret = Ok(self
            .vehicle_dao
            .find_by_owner(current_user.as_ref(), tx.clone())
            .await?
            .iter()
            .map(Vehicle::from)
            .collect());
        self.transaction_dao.commit(tx).await?;
        ret
    }

    async fn verify_user_owns_vehicle(
        &self,
        vehicle_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(), ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let vehicle = self
            .vehicle_dao
            .find_by_id(vehicle_id, tx.clone())
            .await?
            .ok_or(ServiceError::EntityNotFound(vehicle_id))?;
        self.transaction_dao.commit(tx).await?;
        self.permission_service
            .check_user(vehicle.owner.as_ref(), context)
            .await
    }
}
