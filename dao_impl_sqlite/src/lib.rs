use std::sync::Arc;

use async_trait::async_trait;
use dao::{DaoError, PrivilegeEntity, RoleEntity, Transaction, UserEntity};
use sqlx::{Row, SqlitePool};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tokio::sync::Mutex;

pub mod booking;
pub mod mechanic;
pub mod notification_outbox;
pub mod service_offering;
pub mod vehicle;

pub(crate) const DATE_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day]");
pub(crate) const TIME_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[hour]:[minute]");

pub trait ResultDbErrorExt<T, E> {
    fn map_db_error(self) -> Result<T, DaoError>;
}
impl<T, E: std::error::Error + Send + Sync + 'static> ResultDbErrorExt<T, E> for Result<T, E> {
    fn map_db_error(self) -> Result<T, DaoError> {
        self.map_err(|err| DaoError::DatabaseQueryError(Box::new(err)))
    }
}

pub(crate) fn uuid_from_blob(blob: &[u8]) -> Result<uuid::Uuid, DaoError> {
    uuid::Uuid::from_slice(blob).map_db_error()
}

/// One SQLite transaction, shared between the DAO calls of a single service
/// operation. The conflict read and the booking write run on the same
/// handle, so two racing operations on the same mechanic serialize at the
/// database.
pub struct TransactionImpl {
    pub(crate) tx: Arc<Mutex<sqlx::Transaction<'static, sqlx::Sqlite>>>,
}
impl Transaction for TransactionImpl {}
impl Clone for TransactionImpl {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}
impl std::fmt::Debug for TransactionImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TransactionImpl")
    }
}

pub struct TransactionDaoImpl {
    pool: Arc<SqlitePool>,
}
impl TransactionDaoImpl {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}
#[async_trait]
impl dao::TransactionDao for TransactionDaoImpl {
    type Transaction = TransactionImpl;

    async fn new_transaction(&self) -> Result<Self::Transaction, DaoError> {
        let tx = self.pool.begin().await.map_db_error()?;
        Ok(TransactionImpl {
            tx: Arc::new(tx.into()),
        })
    }

    async fn use_transaction(
        &self,
        tx: Option<Self::Transaction>,
    ) -> Result<Self::Transaction, DaoError> {
        match tx {
            Some(tx) => Ok(tx),
            None => self.new_transaction().await,
        }
    }

    async fn commit(&self, transaction: Self::Transaction) -> Result<(), DaoError> {
        if let Some(tx) = Arc::into_inner(transaction.tx) {
            tx.into_inner().commit().await.map_db_error()?;
        }
        Ok(())
    }
}

pub struct PermissionDaoImpl {
    pool: Arc<SqlitePool>,
}
impl PermissionDaoImpl {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}
#[async_trait]
impl dao::PermissionDao for PermissionDaoImpl {
    async fn has_privilege(&self, user: &str, privilege: &str) -> Result<bool, DaoError> {
        let row = sqlx::query(
            r"SELECT count(*) as results FROM user
                INNER JOIN user_role ON user.name = user_role.user_name
                INNER JOIN role ON user_role.role_name = role.name
                INNER JOIN role_privilege ON role.name = role_privilege.role_name
                WHERE role_privilege.privilege_name = ? AND user.name = ?",
        )
        .bind(privilege)
        .bind(user)
        .fetch_one(self.pool.as_ref())
        .await
        .map_db_error()?;
        let results: i64 = row.try_get("results").map_db_error()?;
        Ok(results > 0)
    }

    async fn privileges_for_user(&self, user: &str) -> Result<Arc<[PrivilegeEntity]>, DaoError> {
        let rows = sqlx::query(
            r"SELECT DISTINCT role_privilege.privilege_name as name FROM user
                INNER JOIN user_role ON user.name = user_role.user_name
                INNER JOIN role ON user_role.role_name = role.name
                INNER JOIN role_privilege ON role.name = role_privilege.role_name
                WHERE user.name = ?",
        )
        .bind(user)
        .fetch_all(self.pool.as_ref())
        .await
        .map_db_error()?;
        rows.iter()
            .map(|row| {
                Ok(PrivilegeEntity {
                    name: row.try_get::<String, _>("name").map_db_error()?.into(),
                })
            })
            .collect()
    }

    async fn create_user(&self, user: &UserEntity, process: &str) -> Result<(), DaoError> {
        sqlx::query(r"INSERT INTO user (name, update_process) VALUES (?, ?)")
            .bind(user.name.as_ref())
            .bind(process)
            .execute(self.pool.as_ref())
            .await
            .map_db_error()?;
        Ok(())
    }

    async fn all_users(&self) -> Result<Arc<[UserEntity]>, DaoError> {
        let rows = sqlx::query(r"SELECT name FROM user")
            .fetch_all(self.pool.as_ref())
            .await
            .map_db_error()?;
        rows.iter()
            .map(|row| {
                Ok(UserEntity {
                    name: row.try_get::<String, _>("name").map_db_error()?.into(),
                })
            })
            .collect()
    }

    async fn find_user(&self, name: &str) -> Result<Option<UserEntity>, DaoError> {
        let row = sqlx::query(r"SELECT name FROM user WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool.as_ref())
            .await
            .map_db_error()?;
        row.map(|row| {
            Ok(UserEntity {
                name: row.try_get::<String, _>("name").map_db_error()?.into(),
            })
        })
        .transpose()
    }

    async fn delete_user(&self, name: &str) -> Result<(), DaoError> {
        sqlx::query(r"DELETE FROM user WHERE name = ?")
            .bind(name)
            .execute(self.pool.as_ref())
            .await
            .map_db_error()?;
        Ok(())
    }

    async fn create_role(&self, role: &RoleEntity, process: &str) -> Result<(), DaoError> {
        sqlx::query(r"INSERT INTO role (name, update_process) VALUES (?, ?)")
            .bind(role.name.as_ref())
            .bind(process)
            .execute(self.pool.as_ref())
            .await
            .map_db_error()?;
        Ok(())
    }

    async fn all_roles(&self) -> Result<Arc<[RoleEntity]>, DaoError> {
        let rows = sqlx::query(r"SELECT name FROM role")
            .fetch_all(self.pool.as_ref())
            .await
            .map_db_error()?;
        rows.iter()
            .map(|row| {
                Ok(RoleEntity {
                    name: row.try_get::<String, _>("name").map_db_error()?.into(),
                })
            })
            .collect()
    }

    async fn delete_role(&self, name: &str) -> Result<(), DaoError> {
        sqlx::query(r"DELETE FROM role WHERE name = ?")
            .bind(name)
            .execute(self.pool.as_ref())
            .await
            .map_db_error()?;
        Ok(())
    }

    async fn create_privilege(
        &self,
        privilege: &PrivilegeEntity,
        process: &str,
    ) -> Result<(), DaoError> {
        sqlx::query(r"INSERT INTO privilege (name, update_process) VALUES (?, ?)")
            .bind(privilege.name.as_ref())
            .bind(process)
            .execute(self.pool.as_ref())
            .await
            .map_db_error()?;
        Ok(())
    }

    async fn all_privileges(&self) -> Result<Arc<[PrivilegeEntity]>, DaoError> {
        let rows = sqlx::query(r"SELECT name FROM privilege")
            .fetch_all(self.pool.as_ref())
            .await
            .map_db_error()?;
        rows.iter()
            .map(|row| {
                Ok(PrivilegeEntity {
                    name: row.try_get::<String, _>("name").map_db_error()?.into(),
                })
            })
            .collect()
    }

    async fn delete_privilege(&self, name: &str) -> Result<(), DaoError> {
        sqlx::query(r"DELETE FROM privilege WHERE name = ?")
            .bind(name)
            .execute(self.pool.as_ref())
            .await
            .map_db_error()?;
        Ok(())
    }

    async fn add_user_role(&self, user: &str, role: &str, process: &str) -> Result<(), DaoError> {
        sqlx::query(r"INSERT INTO user_role (user_name, role_name, update_process) VALUES (?, ?, ?)")
            .bind(user)
            .bind(role)
            .bind(process)
            .execute(self.pool.as_ref())
            .await
            .map_db_error()?;
        Ok(())
    }

    async fn delete_user_role(&self, user: &str, role: &str) -> Result<(), DaoError> {
        sqlx::query(r"DELETE FROM user_role WHERE user_name = ? AND role_name = ?")
            .bind(user)
            .bind(role)
            .execute(self.pool.as_ref())
            .await
            .map_db_error()?;
        Ok(())
    }

    async fn add_role_privilege(
        &self,
        role: &str,
        privilege: &str,
        process: &str,
    ) -> Result<(), DaoError> {
        sqlx::query(
            r"INSERT INTO role_privilege (role_name, privilege_name, update_process) VALUES (?, ?, ?)",
        )
        .bind(role)
        .bind(privilege)
        .bind(process)
        .execute(self.pool.as_ref())
        .await
        .map_db_error()?;
        Ok(())
    }

    async fn delete_role_privilege(&self, role: &str, privilege: &str) -> Result<(), DaoError> {
        sqlx::query(r"DELETE FROM role_privilege WHERE role_name = ? AND privilege_name = ?")
            .bind(role)
            .bind(privilege)
            .execute(self.pool.as_ref())
            .await
            .map_db_error()?;
        Ok(())
    }
}
