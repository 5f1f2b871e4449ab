use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

pub mod booking;
pub mod mechanic;
pub mod notification_outbox;
pub mod service_offering;
pub mod vehicle;

#[derive(Error, Debug)]
pub enum DaoError {
    #[error("Database query error: {0}")]
    DatabaseQueryError(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("Cannot parse date/time value: {0}")]
    DateTimeParse(#[from] time::error::Parse),

    #[error("Unexpected value in database: {0}")]
    UnexpectedValue(Arc<str>),
}

/// Marker for storage transactions. A transaction handed to a DAO method
/// scopes that method's reads and writes; nothing becomes visible before
/// [`TransactionDao::commit`].
pub trait Transaction {}

/// Transaction stand-in for unit tests against mocked DAOs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockTransaction;
impl Transaction for MockTransaction {}

#[automock(type Transaction = crate::MockTransaction;)]
#[async_trait]
pub trait TransactionDao {
    type Transaction: Transaction;

    async fn new_transaction(&self) -> Result<Self::Transaction, DaoError>;

    /// Reuse the given transaction or open a fresh one.
    async fn use_transaction(
        &self,
        tx: Option<Self::Transaction>,
    ) -> Result<Self::Transaction, DaoError>;

    async fn commit(&self, tx: Self::Transaction) -> Result<(), DaoError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserEntity {
    pub name: Arc<str>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleEntity {
    pub name: Arc<str>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivilegeEntity {
    pub name: Arc<str>,
}

#[automock]
#[async_trait]
pub trait PermissionDao {
    async fn has_privilege(&self, user: &str, privilege: &str) -> Result<bool, DaoError>;
    async fn privileges_for_user(&self, user: &str) -> Result<Arc<[PrivilegeEntity]>, DaoError>;

    async fn create_user(&self, user: &UserEntity, process: &str) -> Result<(), DaoError>;
    async fn all_users(&self) -> Result<Arc<[UserEntity]>, DaoError>;
    async fn find_user(&self, name: &str) -> Result<Option<UserEntity>, DaoError>;
    async fn delete_user(&self, name: &str) -> Result<(), DaoError>;

    async fn create_role(&self, role: &RoleEntity, process: &str) -> Result<(), DaoError>;
    async fn all_roles(&self) -> Result<Arc<[RoleEntity]>, DaoError>;
    async fn delete_role(&self, name: &str) -> Result<(), DaoError>;

    async fn create_privilege(
        &self,
        privilege: &PrivilegeEntity,
        process: &str,
    ) -> Result<(), DaoError>;
    async fn all_privileges(&self) -> Result<Arc<[PrivilegeEntity]>, DaoError>;
    async fn delete_privilege(&self, name: &str) -> Result<(), DaoError>;

    async fn add_user_role(&self, user: &str, role: &str, process: &str) -> Result<(), DaoError>;
    async fn delete_user_role(&self, user: &str, role: &str) -> Result<(), DaoError>;
    async fn add_role_privilege(
        &self,
        role: &str,
        privilege: &str,
        process: &str,
    ) -> Result<(), DaoError>;
    async fn delete_role_privilege(&self, role: &str, privilege: &str) -> Result<(), DaoError>;
}
