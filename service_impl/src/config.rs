use std::{env, sync::Arc};

use async_trait::async_trait;
use service::{
    config::{Config, ConfigService},
    ServiceError,
};

pub struct ConfigServiceImpl;

#[async_trait]
impl ConfigService for ConfigServiceImpl {
    async fn get_config(&self) -> Result<Config, ServiceError> {
        let bind_address = env::var("BIND_ADDRESS").unwrap_or("127.0.0.1:3000".to_string());
        let database_url =
            env::var("DATABASE_URL").unwrap_or("sqlite:./localdb.sqlite3".to_string());

        Ok(Config {
            bind_address: Arc::from(bind_address),
            database_url: Arc::from(database_url),
        })
    }
}
