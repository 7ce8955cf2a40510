use super::jobboard_schema::VERSIONED_SCHEMAS;
use super::versioned_schema::{VersionedSchema, BASE_DB_VERSION};
use anyhow::{anyhow, bail, Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// A SQLite connection shared by every store of the application.
pub type SharedConnection = Arc<Mutex<Connection>>;

pub fn lock_conn(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| anyhow!("Database connection mutex is poisoned"))
}

/// The SQLite rowid for `id`. Ids past `i64::MAX` cannot name any row.
pub fn row_id(id: usize) -> Option<i64> {
    i64::try_from(id).ok()
}

/// True when `err` is a UNIQUE or PRIMARY KEY constraint failure.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}

/// Reads a TEXT column into any type parsed with `FromStr`.
pub fn parse_text_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = anyhow::Error>,
{
    let value: String = row.get(idx)?;
    value.parse().map_err(|err: anyhow::Error| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, err.into())
    })
}

/// Opens (or creates) the job board database at `db_path`, validating and
/// migrating an existing file to the latest schema.
pub fn open_database<T: AsRef<Path>>(db_path: T) -> Result<SharedConnection> {
    open_with_schemas(db_path, VERSIONED_SCHEMAS)
}

/// Creates a fresh database living in memory, used by tests.
pub fn open_in_memory_database() -> Result<SharedConnection> {
    let conn = Connection::open_in_memory()?;
    enable_foreign_keys(&conn)?;
    latest(VERSIONED_SCHEMAS)?.create(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

fn latest(schemas: &[VersionedSchema]) -> Result<&VersionedSchema> {
    schemas.last().context("No schema version defined")
}

fn enable_foreign_keys(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .context("Failed to enable foreign keys")
}

pub(crate) fn open_with_schemas<T: AsRef<Path>>(
    db_path: T,
    schemas: &[VersionedSchema],
) -> Result<SharedConnection> {
    let db_path = db_path.as_ref();
    let conn = if db_path.exists() {
        Connection::open_with_flags(
            db_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open database {:?}", db_path))?
    } else {
        info!("Creating new database at {:?}", db_path);
        let conn = Connection::open(db_path)?;
        latest(schemas)?.create(&conn)?;
        conn
    };
    enable_foreign_keys(&conn)?;

    let db_version = conn
        .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
        .context("Failed to read database version")?
        - BASE_DB_VERSION as i64;

    if db_version < 0 {
        bail!(
            "Database version {} is too old, does not contain base db version {}",
            db_version,
            BASE_DB_VERSION
        );
    }
    let version = db_version as usize;
    match schemas.get(version) {
        Some(schema) => schema.validate(&conn)?,
        None => bail!("Database version {} is too new", version),
    }

    migrate_if_needed(&conn, version, schemas)?;

    Ok(Arc::new(Mutex::new(conn)))
}

fn migrate_if_needed(conn: &Connection, version: usize, schemas: &[VersionedSchema]) -> Result<()> {
    let mut latest_from = version;
    for schema in schemas.iter().skip(version + 1) {
        if let Some(migration_fn) = schema.migration {
            info!(
                "Migrating db from version {} to {}",
                latest_from, schema.version
            );
            migration_fn(conn)?;
        }
        latest_from = schema.version;
    }
    if latest_from != version {
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
            [],
        )?;
    }
    Ok(())
}
