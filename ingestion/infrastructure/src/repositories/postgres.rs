use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ingestion_application::ports::{CandleQuery, CandleRepository, InsertOutcome, RepositoryError};
use ingestion_domain::{CandleRow, TableName};
use rust_decimal::Decimal;
use shaku::Component;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::settings::DatabaseSettings;

const MAX_CONNECTIONS: u32 = 2;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Candle tables in PostgreSQL.
///
/// The pool is opened on first use; a failed connect leaves it unset so the
/// next call tries again.
#[derive(Component)]
#[shaku(interface = CandleRepository)]
pub struct PostgresCandleRepository {
    database: DatabaseSettings,
    #[shaku(default = Mutex::new(None))]
    pool: Mutex<Option<PgPool>>,
}

impl PostgresCandleRepository {
    pub fn new(database: DatabaseSettings) -> Self {
        Self {
            database,
            pool: Mutex::new(None),
        }
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self {
            database: DatabaseSettings::default(),
            pool: Mutex::new(Some(pool)),
        }
    }

    async fn pool(&self) -> Result<PgPool, RepositoryError> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }

        let options = PgConnectOptions::new()
            .host(&self.database.host)
            .port(self.database.port)
            .database(&self.database.name)
            .username(&self.database.user)
            .password(&self.database.password);

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        info!(
            "Connected to PostgreSQL {}:{}/{} as {}",
            self.database.host, self.database.port, self.database.name, self.database.user
        );
        *guard = Some(pool.clone());
        Ok(pool)
    }
}

#[async_trait]
impl CandleRepository for PostgresCandleRepository {
    async fn ensure_table(&self, table: &TableName) -> Result<(), RepositoryError> {
        let pool = self.pool().await?;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id SERIAL PRIMARY KEY,
                ticker VARCHAR(20),
                begin_time TIMESTAMPTZ,
                close_time TIMESTAMPTZ,
                open NUMERIC(12, 6),
                high NUMERIC(12, 6),
                low NUMERIC(12, 6),
                close NUMERIC(12, 6),
                UNIQUE (ticker, begin_time)
            )",
            table
        );

        sqlx::query(&ddl)
            .execute(&pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        info!("Table {} is ready", table);
        Ok(())
    }

    async fn insert_if_absent(
        &self,
        table: &TableName,
        row: &CandleRow,
    ) -> Result<InsertOutcome, RepositoryError> {
        let pool = self.pool().await?;
        let sql = format!(
            "INSERT INTO {} (ticker, begin_time, close_time, open, high, low, close)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (ticker, begin_time) DO NOTHING",
            table
        );

        let result = sqlx::query(&sql)
            .bind(row.ticker())
            .bind(row.begin_time())
            .bind(row.close_time())
            .bind(row.open())
            .bind(row.high())
            .bind(row.low())
            .bind(row.close())
            .execute(&pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        if result.rows_affected() == 0 {
            debug!(
                "Candle {} @ {} already in {}",
                row.ticker(),
                row.begin_time(),
                table
            );
            return Ok(InsertOutcome::Duplicate);
        }

        debug!("Stored candle {} @ {} in {}", row.ticker(), row.begin_time(), table);
        Ok(InsertOutcome::Inserted)
    }

    async fn recent(&self, query: &CandleQuery) -> Result<Vec<CandleRow>, RepositoryError> {
        let pool = self.pool().await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT ticker, begin_time, close_time, open, high, low, close FROM {}",
            query.table
        ));

        let mut separator = " WHERE ";
        if let Some(ticker) = &query.ticker {
            builder.push(separator).push("ticker = ").push_bind(ticker.clone());
            separator = " AND ";
        }
        if let Some(from) = query.begin_from {
            builder.push(separator).push("begin_time >= ").push_bind(from);
            separator = " AND ";
        }
        if let Some(to) = query.begin_to {
            builder.push(separator).push("begin_time < ").push_bind(to);
        }
        builder
            .push(" ORDER BY begin_time DESC LIMIT ")
            .push_bind(i64::from(query.limit));

        let records: Vec<CandleRecord> = builder
            .build_query_as()
            .fetch_all(&pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(records.into_iter().map(CandleRecord::into_row).collect())
    }
}

#[derive(sqlx::FromRow)]
struct CandleRecord {
    ticker: String,
    begin_time: DateTime<Utc>,
    close_time: DateTime<Utc>,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
}

impl CandleRecord {
    fn into_row(self) -> CandleRow {
        CandleRow::from_stored(
            self.ticker,
            self.begin_time,
            self.close_time,
            [self.open, self.high, self.low, self.close],
        )
    }
}
