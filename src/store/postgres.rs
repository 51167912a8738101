//! PostgreSQL-backed conversation store.
//!
//! Each batch runs in one transaction on a pooled connection. The batch is
//! journaled in `conversation_batches`, whose `sequence` column is the number
//! handed back to callers, and every operation lands in
//! `conversation_batch_operations` under that sequence.

use serde::Serialize;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::{Connection, FromRow, PgPool, Postgres, migrate::Migrator};

use crate::config::StoreConfig;
use crate::error::{ConversationError, ConversationResult};
use crate::models::Conversation;
use crate::mutation::{ApplierSource, CONVERSATION_APPLIER_ID, OperationApplier};
use crate::operation::Operation;
use crate::row::MemoryRow;
use crate::schema::{COLUMNS, ColumnKind, ColumnValue, ConversationColumn};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Bind one cell according to the storage type of `column`.
fn bind_cell<'q>(
    query: PgQuery<'q>,
    column: ConversationColumn,
    cell: ColumnValue,
) -> ConversationResult<PgQuery<'q>> {
    let mismatch = || ConversationError::ColumnType {
        column: column.name(),
        expected: column.kind().describe(),
    };

    let query = match (column.kind(), cell) {
        (ColumnKind::BigInt, ColumnValue::Integer(value)) => query.bind(value),
        (ColumnKind::Int | ColumnKind::Flag, ColumnValue::Integer(value)) => {
            query.bind(i32::try_from(value).map_err(|_| mismatch())?)
        }
        (ColumnKind::NullableText | ColumnKind::Locator, ColumnValue::Text(value)) => {
            query.bind(value)
        }
        (ColumnKind::NullableText, ColumnValue::Null) => query.bind(None::<String>),
        _ => return Err(mismatch()),
    };

    Ok(query)
}

/// One journaled operation of a committed batch.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct JournaledOperation {
    pub batch_sequence: i64,
    pub ordinal: i32,
    pub kind: String,
    pub conversation_id: i64,
    pub column_name: Option<String>,
    pub new_value: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PgConversationStore {
    pool: PgPool,
}

impl PgConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool using `config`. Handle acquisition waits at most
    /// `config.acquire_timeout` for a free connection.
    pub async fn connect(config: &StoreConfig) -> ConversationResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending migrations. Idempotent.
    pub async fn run_migrations(&self) -> ConversationResult<()> {
        log::info!("checking conversation schema migrations");
        MIGRATOR.run(&self.pool).await?;
        log::info!("conversation schema up to date");
        Ok(())
    }

    pub async fn insert(&self, conversation: &Conversation) -> ConversationResult<()> {
        let placeholders = (1..=COLUMNS.len())
            .map(|n| format!("${n}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO conversations ({}) VALUES ({})",
            ConversationColumn::select_list(),
            placeholders
        );

        let row = MemoryRow::from_conversation(conversation);
        let mut query = sqlx::query(&sql);
        for column in COLUMNS {
            query = bind_cell(query, column, row.get(column).clone())?;
        }
        query.execute(&self.pool).await?;

        log::debug!("inserted {}", conversation);
        Ok(())
    }

    pub async fn get(&self, id: i64) -> ConversationResult<Option<Conversation>> {
        let sql = format!(
            "SELECT {} FROM conversations WHERE id = $1",
            ConversationColumn::select_list()
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Conversation::from_row(Some(&row)).map(Some),
            None => Ok(None),
        }
    }

    /// Most recent conversations first.
    pub async fn list(&self, limit: i64) -> ConversationResult<Vec<Conversation>> {
        let sql = format!(
            "SELECT {} FROM conversations ORDER BY date_ms DESC, id DESC LIMIT $1",
            ConversationColumn::select_list()
        );
        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| Conversation::from_row(Some(row)))
            .collect()
    }

    /// Operations recorded for the batch with `sequence`, in submission order.
    pub async fn batch_operations(&self, sequence: i64) -> ConversationResult<Vec<JournaledOperation>> {
        let operations = sqlx::query_as::<_, JournaledOperation>(
            r#"SELECT batch_sequence, ordinal, kind, conversation_id, column_name, new_value
               FROM conversation_batch_operations
               WHERE batch_sequence = $1
               ORDER BY ordinal"#,
        )
        .bind(sequence)
        .fetch_all(&self.pool)
        .await?;

        Ok(operations)
    }
}

impl ApplierSource for PgConversationStore {
    type Handle = PgApplier;

    async fn acquire(&self, applier_id: &str) -> ConversationResult<PgApplier> {
        if applier_id != CONVERSATION_APPLIER_ID {
            return Err(ConversationError::applier_unavailable(
                applier_id,
                "no applier registered under this id",
            ));
        }

        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| ConversationError::applier_unavailable(applier_id, e.to_string()))?;

        Ok(PgApplier { conn })
    }
}

/// Pooled connection dedicated to one batch; returned to the pool on drop.
pub struct PgApplier {
    conn: PoolConnection<Postgres>,
}

impl OperationApplier for PgApplier {
    async fn apply(&mut self, operations: &[Operation]) -> ConversationResult<i64> {
        let mut tx = Connection::begin(&mut *self.conn).await?;

        let count = i32::try_from(operations.len())
            .map_err(|_| ConversationError::Rejected("batch too large".to_string()))?;
        let sequence: i64 = sqlx::query_scalar(
            "INSERT INTO conversation_batches (operation_count) VALUES ($1) RETURNING sequence",
        )
        .bind(count)
        .fetch_one(&mut *tx)
        .await?;

        for (ordinal, operation) in operations.iter().enumerate() {
            match operation {
                Operation::Update {
                    target,
                    column,
                    value,
                } => {
                    let column_ref = ConversationColumn::from_name(column)
                        .filter(|c| c.is_mutable())
                        .ok_or_else(|| ConversationError::UnknownColumn(column.clone()))?;
                    let cell = value.for_column(column_ref)?;
                    // Column names come from the fixed schema, never from the caller.
                    let sql = format!(
                        "UPDATE conversations SET {} = $1 WHERE id = $2",
                        column_ref.name()
                    );
                    bind_cell(sqlx::query(&sql), column_ref, cell)?
                        .bind(target.id)
                        .execute(&mut *tx)
                        .await?;
                }
                Operation::Delete { target } => {
                    sqlx::query("DELETE FROM conversations WHERE id = $1")
                        .bind(target.id)
                        .execute(&mut *tx)
                        .await?;
                }
            }

            sqlx::query(
                r#"INSERT INTO conversation_batch_operations
                   (batch_sequence, ordinal, kind, conversation_id, column_name, new_value)
                   VALUES ($1, $2, $3, $4, $5, $6)"#,
            )
            .bind(sequence)
            .bind(ordinal as i32)
            .bind(operation.kind().as_str())
            .bind(operation.target().id)
            .bind(operation.column().map(str::to_string))
            .bind(operation.value().map(|v| v.to_string()))
            .execute(&mut *tx)
            .await?;

            log::trace!(
                "batch {} op {}: {} {}",
                sequence,
                ordinal,
                operation.kind(),
                operation.target().id
            );
        }

        tx.commit().await?;
        log::debug!("committed batch {} ({} operations)", sequence, operations.len());
        Ok(sequence)
    }
}
