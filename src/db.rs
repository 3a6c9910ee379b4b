//! SQLite database with Diesel ORM
//!
//! Local key/value storage for values that outlive a single run (the cached
//! API key). The schema is created with raw SQL on open.

use crate::credential::CredentialStore;
use crate::schema::*;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use std::path::{Path, PathBuf};

// ============================================================================
// Diesel Models
// ============================================================================

/// Insertable key/value pair
#[derive(Insertable)]
#[diesel(table_name = local_storage)]
pub struct NewStoredValue<'a> {
    pub key: &'a str,
    pub value: &'a str,
    pub updated_at: &'a str,
}

/// Queryable key/value pair
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = local_storage)]
pub struct StoredValue {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

// ============================================================================
// Database Connection
// ============================================================================

type DbPool = Pool<ConnectionManager<SqliteConnection>>;
type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Database connection wrapper with connection pool
pub struct Database {
    pool: DbPool,
    path: PathBuf,
}

/// Error type for database operations
#[derive(Debug)]
pub enum DbError {
    Connection(String),
    Query(diesel::result::Error),
    Pool(diesel::r2d2::Error),
}

impl std::fmt::Display for DbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbError::Connection(msg) => write!(f, "Connection error: {}", msg),
            DbError::Query(e) => write!(f, "Query error: {}", e),
            DbError::Pool(e) => write!(f, "Pool error: {}", e),
        }
    }
}

impl std::error::Error for DbError {}

impl From<diesel::result::Error> for DbError {
    fn from(e: diesel::result::Error) -> Self {
        DbError::Query(e)
    }
}

impl From<diesel::r2d2::Error> for DbError {
    fn from(e: diesel::r2d2::Error) -> Self {
        DbError::Pool(e)
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

impl Database {
    /// Open database at specified path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(&path_str);
        let pool = Pool::builder()
            .max_size(5)
            .build(manager)
            .map_err(|e| DbError::Connection(e.to_string()))?;

        let db = Self { pool, path: path.as_ref().to_path_buf() };
        db.init_schema()?;
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn get_conn(&self) -> Result<DbConn> {
        self.pool.get().map_err(|e| DbError::Connection(e.to_string()))
    }

    fn init_schema(&self) -> Result<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(r#"
            CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
        "#).execute(&mut conn)?;

        Ok(())
    }

    // ========================================================================
    // Key/Value Operations
    // ========================================================================

    /// Read a stored value
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.get_conn()?;

        let value = local_storage::table
            .filter(local_storage::key.eq(key))
            .select(local_storage::value)
            .first::<String>(&mut conn)
            .optional()?;

        Ok(value)
    }

    /// Insert or overwrite a value
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.get_conn()?;
        let now = chrono::Local::now().to_rfc3339();

        let new_value = NewStoredValue { key, value, updated_at: &now };

        diesel::replace_into(local_storage::table)
            .values(&new_value)
            .execute(&mut conn)?;

        Ok(())
    }

    /// Delete a value; returns whether one existed
    pub fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.get_conn()?;
        let count = diesel::delete(local_storage::table.filter(local_storage::key.eq(key)))
            .execute(&mut conn)?;
        Ok(count > 0)
    }

    /// All stored values, oldest update first
    pub fn entries(&self) -> Result<Vec<StoredValue>> {
        let mut conn = self.get_conn()?;
        let values = local_storage::table
            .order(local_storage::updated_at.asc())
            .select(StoredValue::as_select())
            .load::<StoredValue>(&mut conn)?;
        Ok(values)
    }
}

impl CredentialStore for Database {
    fn load(&self, key: &str) -> Result<Option<String>> {
        self.get(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        self.delete(key)
    }
}
