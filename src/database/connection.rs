/*!
 * Database connection management.
 *
 * One SQLite connection behind a mutex, shared by the record source and the
 * sink of a run. Runs are sequential, so the mutex only ever serializes the
 * blocking-pool hop of `execute_async` and `transaction_async`.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to the calendar database. Clones use the same connection.
#[derive(Clone)]
pub struct DatabaseConnection {
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for DatabaseConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConnection").field("db_path", &self.db_path).finish()
    }
}

impl DatabaseConnection {
    /// Open an existing database file
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if !db_path.exists() {
            return Err(anyhow::anyhow!("Database not found: {:?}", db_path));
        }

        info!("Opening database at: {:?}", db_path);

        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        debug!("Creating in-memory database");

        let conn =
            Connection::open_in_memory().context("Failed to create in-memory database")?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Run a read or a single statement against the store.
    ///
    /// Every store access in a run goes through this one handle, so a
    /// record source read never interleaves with a sink commit.
    pub fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = lock(&self.connection)?;
        f(&conn)
    }

    /// `execute` on tokio's blocking pool
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let conn = lock(&connection)?;
            f(&conn)
        })
        .await
        .context("Database task panicked")?
    }

    /// Run a batch of writes as one unit.
    ///
    /// Commits when the closure succeeds and rolls back on drop otherwise.
    /// The sink relies on this to keep the review log and the target table
    /// in step.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T>,
    {
        let mut conn = lock(&self.connection)?;
        in_transaction(&mut conn, f)
    }

    /// `transaction` on tokio's blocking pool
    pub async fn transaction_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = lock(&connection)?;
            in_transaction(&mut conn, f)
        })
        .await
        .context("Database transaction task panicked")?
    }
}

fn lock(connection: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    connection
        .lock()
        .map_err(|e| anyhow::anyhow!("Failed to acquire database lock: {}", e))
}

fn in_transaction<F, T>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    let tx = conn.transaction()?;
    let result = f(&tx)?;
    tx.commit()?;
    Ok(result)
}
