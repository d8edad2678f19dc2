use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use seam_stack::Stack;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::{StackStore, StoreError};

/// One row of the stacks table, without the stack body.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct StackSummary {
  pub id: String,
  pub machine: String,
  pub state: String,
  pub creation_time: DateTime<Utc>,
  pub last_updated_time: DateTime<Utc>,
}

/// SQLite-based store implementation.
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open (creating if needed) the database at `url`.
  pub async fn connect(url: &str) -> Result<Self, StoreError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    Ok(Self::new(pool))
  }

  /// A private in-memory database, mostly useful for tests.
  ///
  /// The pool holds exactly one connection that never expires, since each
  /// SQLite memory connection is its own database.
  pub async fn in_memory() -> Result<Self, StoreError> {
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .min_connections(1)
      .idle_timeout(None)
      .max_lifetime(None)
      .connect("sqlite::memory:")
      .await?;
    Ok(Self::new(pool))
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    Ok(())
  }

  /// All stored stacks, most recently updated first.
  pub async fn list_stacks(&self) -> Result<Vec<StackSummary>, StoreError> {
    let rows = sqlx::query_as(
      r#"
            SELECT id, machine, state, creation_time, last_updated_time
            FROM stacks
            ORDER BY last_updated_time DESC
            "#,
    )
    .fetch_all(&self.pool)
    .await?;

    Ok(rows)
  }
}

#[async_trait]
impl StackStore for SqliteStore {
  async fn find_stack(&self, id: &str) -> Result<Option<Stack>, StoreError> {
    let data: Option<String> = sqlx::query_scalar(
      r#"
            SELECT data
            FROM stacks
            WHERE id = ?
            "#,
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;

    data
      .map(|data| {
        Stack::from_json(&data).map_err(|source| StoreError::Corrupt {
          id: id.to_string(),
          source,
        })
      })
      .transpose()
  }

  async fn save_stack(&self, stack: &Stack) -> Result<(), StoreError> {
    let data = stack.to_json()?;
    let now = Utc::now();

    sqlx::query(
      r#"
            INSERT INTO stacks (id, machine, state, data, creation_time, last_updated_time)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
              machine = excluded.machine,
              state = excluded.state,
              data = excluded.data,
              last_updated_time = excluded.last_updated_time
            "#,
    )
    .bind(stack.id())
    .bind(stack.machine())
    .bind(stack.state())
    .bind(&data)
    .bind(now)
    .bind(now)
    .execute(&self.pool)
    .await?;

    debug!(stack_id = %stack.id(), state = %stack.state(), "saved stack");
    Ok(())
  }

  async fn remove_stack(&self, id: &str) -> Result<(), StoreError> {
    sqlx::query(
      r#"
            DELETE FROM stacks
            WHERE id = ?
            "#,
    )
    .bind(id)
    .execute(&self.pool)
    .await?;

    debug!(stack_id = %id, "removed stack");
    Ok(())
  }
}
