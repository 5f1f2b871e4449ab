use std::sync::Arc;

use async_trait::async_trait;
use dao::{service_offering::ServiceOfferingDao, TransactionDao};
use service::{
    permission::{Authentication, ADMIN_PRIVILEGE, CUSTOMER_PRIVILEGE, MECHANIC_PRIVILEGE},
    service_offering::{ServiceOffering, ServiceOfferingService},
    PermissionService, ServiceError,
};
use tokio::join;
use uuid::Uuid;

use crate::gen_service_impl;

gen_service_impl! {
    struct ServiceOfferingServiceImpl: ServiceOfferingService = ServiceOfferingServiceDeps {
        ServiceOfferingDao: ServiceOfferingDao<Transaction = Self::Transaction> = service_offering_dao,
        PermissionService: PermissionService<Context = Self::Context> = permission_service,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
    }
}

const SERVICE_OFFERING_SERVICE_PROCESS: &str = "service-offering-service";

#[async_trait]
impl<Deps: ServiceOfferingServiceDeps> ServiceOfferingService
    for ServiceOfferingServiceImpl<Deps>
{
    type Context = Deps::Context;
    type Transaction = Deps::Transaction;

    async fn get_all(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[ServiceOffering]>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let (admin, mechanic, customer) = join!(
            self.permission_service
                .check_permission(ADMIN_PRIVILEGE, context.clone()),
            self.permission_service
                .check_permission(MECHANIC_PRIVILEGE, context.clone()),
            self.permission_service
                .check_permission(CUSTOMER_PRIVILEGE, context),
        );
        admin.or(mechanic).or(customer)?;

        let ret = Ok(self
            .service_offering_dao
            .all(tx.clone())
            .await?
            .iter()
            .map(ServiceOffering::from)
            .collect());
        self.transaction_dao.commit(tx).await?;
        ret
    }

    async fn get(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<ServiceOffering, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let (admin, mechanic, customer) = join!(
            self.permission_service
                .check_permission(ADMIN_PRIVILEGE, context.clone()),
            self.permission_service
                .check_permission(MECHANIC_PRIVILEGE, context.clone()),
            self.permission_service
                .check_permission(CUSTOMER_PRIVILEGE, context),
        );
        admin.or(mechanic).or(customer)?;

        let offering = self
            .service_offering_dao
            .find_by_id(id, tx.clone())
            .await?
            .filter(|entity| entity.deleted.is_none())
            .as_ref()
            .map(ServiceOffering::from)
            .ok_or(ServiceError::EntityNotFound(id))?;
        self.transaction_dao.commit(tx).await?;
        Ok(offering)
    }

    async fn record_booking(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(), ServiceError> {
        self.permission_service
            .check_only_full_authentication(context)
            .await?;
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.service_offering_dao
            .find_by_id(id, tx.clone())
            .await?
            .ok_or(ServiceError::EntityNotFound(id))?;
        self.service_offering_dao
            .increment_booking_count(id, SERVICE_OFFERING_SERVICE_PROCESS, tx.clone())
            .await?;
        self.transaction_dao.commit(tx).await?;
        Ok(())
    }
}
