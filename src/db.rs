//! Database instance module
use surrealdb::{Surreal, engine::any::Any};

use crate::config::{DatabaseAuthMethod, DatabaseConfig};

/// Shared SurrealDB handle. Cloning is cheap and shares the connection.
pub type Database = Surreal<Any>;

pub const QUEUE_TABLE: &str = "queue";
pub const SETTINGS_TABLE: &str = "settings";

const SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS queue SCHEMALESS;
DEFINE INDEX IF NOT EXISTS queue_url ON TABLE queue FIELDS url UNIQUE;
DEFINE INDEX IF NOT EXISTS queue_status ON TABLE queue FIELDS status;
DEFINE TABLE IF NOT EXISTS settings SCHEMALESS;
"#;

#[tracing::instrument(skip(config), fields(url = %config.database_url))]
pub async fn init_database(config: &DatabaseConfig) -> surrealdb::Result<Database> {
    tracing::info!("Connecting to database at {}", config.database_url);
    let db = surrealdb::engine::any::connect(config.database_url.as_str()).await?;

    match config.db_auth_method {
        DatabaseAuthMethod::Root => {
            tracing::info!("Signing in as root user");
            db.signin(surrealdb::opt::auth::Root {
                username: config.root_username.as_deref().unwrap_or("root"),
                password: config.root_password.as_deref().unwrap_or("root"),
            })
            .await?;
        }
        DatabaseAuthMethod::None => {
            tracing::info!("No authentication configured");
        }
    }

    tracing::info!(
        "Using namespace '{}' and database '{}'",
        config.db_namespace,
        config.db_database
    );
    db.use_ns(config.db_namespace.as_str())
        .use_db(config.db_database.as_str())
        .await?;

    db.query(SCHEMA).await?.check()?;

    tracing::info!("Database initialization complete");
    Ok(db)
}

/// Fresh in-memory database with the schema applied.
#[cfg(test)]
pub async fn memory() -> Database {
    init_database(&DatabaseConfig::memory())
        .await
        .expect("in-memory database")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_is_idempotent() {
        let db = memory().await;
        db.query(SCHEMA).await.unwrap().check().unwrap();
    }
}
