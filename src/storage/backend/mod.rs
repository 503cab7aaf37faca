//! SeaORM storage backend
//!
//! This module provides database storage using SeaORM,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL.

mod analytics;
mod connection;
mod converters;
mod daily;
mod events;
pub mod retry;

use sea_orm::{ActiveModelTrait, DatabaseBackend, DatabaseConnection, EntityTrait};
use tracing::warn;

use crate::errors::{Result, TrackerError};
use crate::storage::models::Campaign;
use migration::entities::campaign;

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{campaign_to_active_model, model_to_campaign};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(TrackerError::database_config(format!(
            "Cannot infer database type from URL: {}. Supported: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    retry_config: retry::RetryConfig,
}

impl SeaOrmStorage {
    pub async fn new(database_url: &str, backend_name: &str) -> Result<Self> {
        if database_url.is_empty() {
            return Err(TrackerError::database_config("database_url is not set"));
        }

        let config = crate::config::get_config();
        let retry_config = retry::RetryConfig::from(&config.database);

        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_generic(
                database_url,
                backend_name,
                config.database.pool_size,
                config.database.timeout,
            )
            .await?
        };

        let storage = SeaOrmStorage {
            db,
            backend_name: backend_name.to_string(),
            retry_config,
        };

        run_migrations(&storage.db).await?;

        warn!(
            "{} Storage initialized.",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    /// 获取数据库连接
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn get_backend_name(&self) -> &str {
        &self.backend_name
    }

    fn db_backend(&self) -> DatabaseBackend {
        match self.backend_name.as_str() {
            "sqlite" => DatabaseBackend::Sqlite,
            "mysql" => DatabaseBackend::MySql,
            _ => DatabaseBackend::Postgres,
        }
    }

    /// 写入或整体覆盖一个实体
    ///
    /// 实体由管理系统维护，这里只提供初始化与测试数据写入。
    pub async fn upsert_campaign(&self, campaign: &Campaign) -> Result<()> {
        let active = campaign_to_active_model(campaign)?;
        let exists = campaign::Entity::find_by_id(campaign.id.clone())
            .one(&self.db)
            .await?
            .is_some();

        if exists {
            active.update(&self.db).await?;
        } else {
            campaign::Entity::insert(active)
                .exec_without_returning(&self.db)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_url() {
        assert_eq!(
            infer_backend_from_url("sqlite://adtrack.db?mode=rwc").unwrap(),
            "sqlite"
        );
        assert_eq!(infer_backend_from_url("data/events.db").unwrap(), "sqlite");
        assert_eq!(
            infer_backend_from_url("mariadb://u:p@localhost/ads").unwrap(),
            "mysql"
        );
        assert_eq!(
            infer_backend_from_url("postgresql://localhost/ads").unwrap(),
            "postgres"
        );
        assert!(infer_backend_from_url("redis://localhost").is_err());
    }
}
