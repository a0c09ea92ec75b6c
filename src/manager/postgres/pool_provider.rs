//! Read/write pool routing.
//!
//! [`PostgresStorage`](super::PostgresStorage) sends lookups, listings and stats
//! aggregation to [`PoolProvider::read`] and every insert, update and transaction to
//! [`PoolProvider::write`]. A plain [`PgPool`] serves both.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Source of database pools for read and write traffic.
///
/// Implementations may back `read()` with a replica. `write()` must always return
/// the primary so that read-after-write checks (such as the duplicate check before
/// inserting a participation request) see committed rows.
pub trait PoolProvider: Clone + Send + Sync + 'static {
    /// Pool for queries that don't modify data and tolerate slight staleness.
    fn read(&self) -> &PgPool;

    /// Pool for inserts, updates, transactions and consistency-sensitive reads.
    fn write(&self) -> &PgPool;
}

impl PoolProvider for PgPool {
    fn read(&self) -> &PgPool {
        self
    }

    fn write(&self) -> &PgPool {
        self
    }
}

/// Test pools whose read side refuses writes.
///
/// The replica pool connects to the same database with
/// `default_transaction_read_only = on`, so a write routed through `.read()` fails
/// with "cannot execute ... in a read-only transaction".
#[derive(Clone, Debug)]
pub struct TestDbPools {
    primary: PgPool,
    replica: PgPool,
}

impl TestDbPools {
    pub async fn new(pool: PgPool) -> Result<Self, sqlx::Error> {
        let primary = pool.clone();

        let replica = PgPoolOptions::new()
            .max_connections(pool.options().get_max_connections())
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("SET default_transaction_read_only = on")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect_with(pool.connect_options().as_ref().clone())
            .await?;

        Ok(Self { primary, replica })
    }
}

impl PoolProvider for TestDbPools {
    fn read(&self) -> &PgPool {
        &self.replica
    }

    fn write(&self) -> &PgPool {
        &self.primary
    }
}
