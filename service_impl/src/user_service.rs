use std::sync::Arc;

use async_trait::async_trait;
use service::{user_service::UserService, ServiceError};

/// Development identity: the request context already carries the username
/// injected by the mock-auth middleware.
pub struct UserServiceDev;

#[async_trait]
impl UserService for UserServiceDev {
    type Context = Arc<str>;

    async fn current_user(&self, context: Self::Context) -> Result<Arc<str>, ServiceError> {
        Ok(context)
    }
}
