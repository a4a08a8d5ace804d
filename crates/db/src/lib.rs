use std::{str::FromStr, time::Duration};

use sea_orm::{DatabaseConnection, SqlxSqliteConnector};
use sea_orm::sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous,
};
use sea_orm_migration::MigratorTrait;

pub use sea_orm::DbErr;

pub mod entities;
pub mod models;
mod retry;
pub mod types;

/// Handle to the SQLite database. Constructed once at startup and cloned
/// into whatever needs it; dropping the last clone closes the pool.
#[derive(Clone)]
pub struct DBService {
    pub conn: DatabaseConnection,
}

impl DBService {
    /// Open (creating if missing) the database at `database_url` and bring
    /// the schema up to date.
    pub async fn new(database_url: &str) -> anyhow::Result<DBService> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));
        let pool = SqlitePool::connect_with(options).await?;
        let conn = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool);
        db_migration::Migrator::up(&conn, None).await?;
        Ok(DBService { conn })
    }

    /// Close the underlying pool. Pending checked-out connections finish
    /// their work first.
    pub async fn close(self) -> Result<(), DbErr> {
        self.conn.close().await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::DBService;

    /// Fresh file-backed database in the system temp dir. In-memory SQLite
    /// gives every pooled connection its own database, so tests use real
    /// files like the server does.
    pub(crate) async fn test_db() -> DBService {
        let path = std::env::temp_dir().join(format!("todo-db-test-{}.sqlite", uuid::Uuid::new_v4()));
        let url = format!("sqlite://{}", path.to_string_lossy());
        DBService::new(&url).await.expect("test database")
    }
}
