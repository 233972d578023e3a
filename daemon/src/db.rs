use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use diesel::result::DatabaseErrorKind;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use pocketd_common::errors::*;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const BUSY_TIMEOUT_MS: u32 = 5_000;

pub type Pool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

#[derive(Debug)]
struct ConnectionOptions;

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, connection: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        configure(connection).map_err(r2d2::Error::QueryError)
    }
}

fn configure(connection: &mut SqliteConnection) -> QueryResult<()> {
    connection.batch_execute(&format!(
        "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"
    ))
}

pub fn setup(url: &str) -> Result<SqliteConnection> {
    let mut connection = SqliteConnection::establish(url)
        .with_context(|| anyhow!("Failed to open database: {url:?}"))?;
    configure(&mut connection)?;
    if url != ":memory:" {
        connection.batch_execute("PRAGMA journal_mode = WAL;")?;
    }
    connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| anyhow!("Failed to run migrations: {err:#}"))?;
    Ok(connection)
}

pub fn setup_pool(url: &str) -> Result<Pool> {
    setup(url)?;

    let manager = ConnectionManager::<SqliteConnection>::new(url);
    let pool = r2d2::Pool::builder()
        .connection_customizer(Box::new(ConnectionOptions))
        .build(manager)
        .context("Failed to create pool")?;
    Ok(pool)
}

/// Lost races surface as Conflict: a busy database or a unique index that
/// refused the second writer.
pub fn contention(err: Error) -> Error {
    let contended = match err.downcast_ref::<diesel::result::Error>() {
        Some(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => true,
        Some(diesel::result::Error::DatabaseError(_, info)) => {
            info.message().contains("database is locked")
        }
        _ => false,
    };

    if contended {
        ArchiveError::conflict(format!("{err:#}"))
    } else {
        err
    }
}

#[cfg(test)]
pub fn test_connection() -> SqliteConnection {
    setup(":memory:").unwrap()
}
