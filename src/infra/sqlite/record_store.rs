//! SQLite record store
//!
//! Holds the `retainers` and `players` collections. Both tables are keyed by
//! the record's 64-bit id, stored bit-cast into SQLite's signed INTEGER.
//!
//! Every retainer write stamps a fresh `revision` so a full scan can hand
//! records back in write order.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tracing::debug;

use crate::domain::{ContentId, Player, Retainer, RetainerId, WorldId};
use crate::infra::{RecordStore, Result, RetainerTrackError};

/// SQLite-backed durable store
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Create a new record store with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) a database file
    pub async fn from_path(path: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Private in-memory database on a single connection
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self { pool })
    }

    /// Initialize the database schema
    pub async fn initialize(&self) -> Result<()> {
        crate::migrations::run_sqlite(&self.pool)
            .await
            .map_err(|e| RetainerTrackError::Migration(e.to_string()))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of stored retainers
    pub async fn retainer_count(&self) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM retainers")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 as u64)
    }

    /// Number of stored players
    pub async fn player_count(&self) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM players")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 as u64)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn upsert_retainers(&self, retainers: &[Retainer]) -> Result<()> {
        if retainers.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for retainer in retainers {
            sqlx::query(
                r#"
                INSERT INTO retainers (id, name, world_id, owner_content_id, revision)
                VALUES (?, ?, ?, ?, (SELECT COALESCE(MAX(revision), 0) + 1 FROM retainers))
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    world_id = excluded.world_id,
                    owner_content_id = excluded.owner_content_id,
                    revision = excluded.revision
                "#,
            )
            .bind(retainer.id.0 as i64)
            .bind(retainer.name.as_deref())
            .bind(i64::from(retainer.world_id.0))
            .bind(retainer.owner_content_id.0 as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(count = retainers.len(), "Upserted retainers");
        Ok(())
    }

    async fn upsert_players(&self, players: &[Player]) -> Result<()> {
        if players.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for player in players {
            sqlx::query(
                r#"
                INSERT INTO players (id, name)
                VALUES (?, ?)
                ON CONFLICT(id) DO UPDATE SET name = excluded.name
                "#,
            )
            .bind(player.id.0 as i64)
            .bind(&player.name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(count = players.len(), "Upserted players");
        Ok(())
    }

    async fn load_retainers(&self) -> Result<Vec<Retainer>> {
        let rows = sqlx::query_as::<_, RetainerRow>(
            r#"
            SELECT id, name, world_id, owner_content_id
            FROM retainers
            ORDER BY revision ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Retainer::try_from).collect()
    }

    async fn load_players(&self) -> Result<Vec<Player>> {
        let rows = sqlx::query_as::<_, PlayerRow>("SELECT id, name FROM players ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Player::from).collect())
    }
}

/// Raw row from the retainers table
#[derive(Debug, FromRow)]
struct RetainerRow {
    id: i64,
    name: Option<String>,
    world_id: i64,
    owner_content_id: i64,
}

impl TryFrom<RetainerRow> for Retainer {
    type Error = RetainerTrackError;

    fn try_from(row: RetainerRow) -> Result<Self> {
        let world_id = u16::try_from(row.world_id).map_err(|_| {
            RetainerTrackError::Internal(format!(
                "Invalid world_id {} for retainer {}",
                row.world_id, row.id as u64
            ))
        })?;

        Ok(Retainer {
            id: RetainerId(row.id as u64),
            name: row.name,
            world_id: WorldId(world_id),
            owner_content_id: ContentId(row.owner_content_id as u64),
        })
    }
}

/// Raw row from the players table
#[derive(Debug, FromRow)]
struct PlayerRow {
    id: i64,
    name: String,
}

impl From<PlayerRow> for Player {
    fn from(row: PlayerRow) -> Self {
        Player {
            id: ContentId(row.id as u64),
            name: row.name,
        }
    }
}
