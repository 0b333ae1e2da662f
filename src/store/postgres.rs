use std::time::{Duration, Instant};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

use crate::config::DatabaseConfig;
use crate::errors::AppError;

const INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(8);

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    /// Connect, retrying with exponential backoff until `connect_timeout`
    /// has elapsed. The database is often still starting when we are.
    pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<Self> {
        let options = cfg.connect_options()?;
        let started = Instant::now();
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 1u32;

        let pool = loop {
            let result = PgPoolOptions::new()
                .max_connections(cfg.max_connections)
                .acquire_timeout(cfg.connect_timeout)
                .connect_with(options.clone())
                .await;

            match result {
                Ok(pool) => break pool,
                Err(e) if started.elapsed() + backoff >= cfg.connect_timeout => {
                    return Err(e).with_context(|| {
                        format!(
                            "could not connect to postgres at {}:{} after {} attempts",
                            cfg.host, cfg.port, attempt
                        )
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        retry_in_ms = backoff.as_millis() as u64,
                        error = %e,
                        "database not reachable yet"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    attempt += 1;
                }
            }
        };

        tracing::info!(host = %cfg.host, db = %cfg.name, attempt, "connected to database");
        Ok(Self::new(pool, cfg.lock_timeout))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Start a transaction whose row locks give up after the configured
    /// lock timeout instead of waiting forever.
    pub(crate) async fn begin_locking(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}
