use std::sync::Arc;

use async_trait::async_trait;
use dao::{mechanic::MechanicDao, TransactionDao};
use service::{
    mechanic::{Mechanic, MechanicService},
    permission::{Authentication, ADMIN_PRIVILEGE, CUSTOMER_PRIVILEGE, MECHANIC_PRIVILEGE},
    PermissionService, ServiceError,
};
use tokio::join;
use uuid::Uuid;

use crate::gen_service_impl;

gen_service_impl! {
    struct MechanicServiceImpl: MechanicService = MechanicServiceDeps {
        MechanicDao: MechanicDao<Transaction = Self::Transaction> = mechanic_dao,
        PermissionService: PermissionService<Context = Self::Context> = permission_service,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
    }
}

#[async_trait]
impl<Deps: MechanicServiceDeps> MechanicService for MechanicServiceImpl<Deps> {
    type Context = Deps::Context;
    type Transaction = Deps::Transaction;

    async fn get_all(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[Mechanic]>, ServiceError> {
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
            .mechanic_dao
            .all(tx.clone())
            .await?
            .iter()
            .map(Mechanic::from)
            .collect());
        self.transaction_dao.commit(tx).await?;
        ret
    }

    async fn get(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Mechanic, ServiceError> {
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

        let found = self
            .mechanic_dao
            .find_by_id(id, tx.clone())
            .await?
            .as_ref()
            .map(Mechanic::from)
            .ok_or(ServiceError::EntityNotFound(id))?;
        self.transaction_dao.commit(tx).await?;
        Ok(found)
    }

    async fn exists(
        &self,
        id: Uuid,
        _context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<bool, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let ret = Ok(self
            .mechanic_dao
            .find_by_id(id, tx.clone())
            .await
            .map(|found| found.is_some())?);
        self.transaction_dao.commit(tx).await?;
        ret
    }

    async fn get_assigned_user(
        &self,
        mechanic_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Option<Arc<str>>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(ADMIN_PRIVILEGE, context)
            .await?;
        let ret = Ok(self
            .mechanic_dao
            .get_assigned_user(mechanic_id, tx.clone())
            .await?);
        self.transaction_dao.commit(tx).await?;
        ret
    }

    async fn get_mechanic_for_user(
        &self,
        user_id: Arc<str>,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Option<Mechanic>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(ADMIN_PRIVILEGE, context)
            .await?;
        let ret = Ok(self
            .mechanic_dao
            .find_mechanic_by_user_id(&user_id, tx.clone())
            .await?
            .as_ref()
            .map(Mechanic::from));
        self.transaction_dao.commit(tx).await?;
        ret
    }

    async fn verify_user_is_mechanic(
        &self,
        mechanic_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(), ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let (Some(username), Some(mechanic_username)) = (
            self.permission_service.current_user_id(context).await?,
            self.get_assigned_user(mechanic_id, Authentication::Full, tx.clone().into())
                .await?,
        ) else {
            return Err(ServiceError::Forbidden);
        };
        self.transaction_dao.commit(tx).await?;
        if username == mechanic_username {
            Ok(())
        } else {
            Err(ServiceError::Forbidden)
        }
    }
}
