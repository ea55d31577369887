use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::{
    errors::{LedgerError, ValidationError},
    models::{
        GameEntry, LedgerSnapshot, NewGameEntry, Player, PlayerStats, SessionCommit,
    },
};

/// Trait for the record store holding players and game entries
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn list_players(&self) -> Result<Vec<Player>, LedgerError>;
    async fn list_game_entries(&self) -> Result<Vec<GameEntry>, LedgerError>;

    /// Players and entries as of one point in time
    async fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError>;

    async fn create_player(&self, player: &Player) -> Result<(), LedgerError>;
    async fn find_player_by_name(&self, name: &str) -> Result<Option<Player>, LedgerError>;

    async fn get_player_stats(&self, player_id: &str) -> Result<Option<PlayerStats>, LedgerError>;
    async fn update_player_stats(
        &self,
        player_id: &str,
        stats: &PlayerStats,
    ) -> Result<(), LedgerError>;

    /// Bulk insert; either every entry is stored or none is
    async fn insert_game_entries(
        &self,
        game_id: &str,
        entries: &[NewGameEntry],
    ) -> Result<(), LedgerError>;

    /// Stores the session's entries and the participants' next stats as one atomic write
    async fn commit_session(&self, commit: &SessionCommit) -> Result<(), LedgerError>;

    async fn session_id_exists(&self, game_id: &str) -> Result<bool, LedgerError>;
}

#[derive(Debug, Default)]
struct LedgerState {
    players: HashMap<String, Player>,
    entries: Vec<GameEntry>,
    game_ids: HashSet<String>,
}

impl LedgerState {
    /// Every check a commit needs, run before anything is mutated
    fn check_commit(&self, commit: &SessionCommit) -> Result<(), LedgerError> {
        if self.game_ids.contains(&commit.game_id) {
            warn!(game_id = %commit.game_id, "Session id already recorded in memory");
            return Err(ValidationError::SessionAlreadyRecorded(commit.game_id.clone()).into());
        }
        let referenced = commit
            .entries
            .iter()
            .map(|e| &e.player_id)
            .chain(commit.stats.iter().map(|(id, _)| id));
        for player_id in referenced {
            if !self.players.contains_key(player_id) {
                return Err(LedgerError::NotFound(format!("Player {}", player_id)));
            }
        }
        Ok(())
    }
}

/// In-memory implementation of LedgerRepository for development and testing
///
/// Every write happens under a single write guard with no await point in between,
/// so a commit is either fully visible or not at all.
#[derive(Debug, Default)]
pub struct InMemoryLedgerRepository {
    state: RwLock<LedgerState>,
}

impl InMemoryLedgerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-populated with players and entries
    pub fn with_data(players: Vec<Player>, entries: Vec<GameEntry>) -> Self {
        let state = LedgerState {
            game_ids: entries.iter().map(|e| e.game_id.clone()).collect(),
            players: players.into_iter().map(|p| (p.id.clone(), p)).collect(),
            entries,
        };

        Self {
            state: RwLock::new(state),
        }
    }

    pub async fn entry_count(&self) -> usize {
        self.state.read().await.entries.len()
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    #[instrument(skip(self))]
    async fn list_players(&self) -> Result<Vec<Player>, LedgerError> {
        let state = self.state.read().await;
        Ok(state.players.values().cloned().collect())
    }

    #[instrument(skip(self))]
    async fn list_game_entries(&self) -> Result<Vec<GameEntry>, LedgerError> {
        let state = self.state.read().await;
        Ok(state.entries.clone())
    }

    #[instrument(skip(self))]
    async fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        let state = self.state.read().await;
        debug!(
            players = state.players.len(),
            entries = state.entries.len(),
            "Taking ledger snapshot from memory"
        );

        Ok(LedgerSnapshot {
            players: state.players.values().cloned().collect(),
            entries: state.entries.clone(),
        })
    }

    #[instrument(skip(self, player))]
    async fn create_player(&self, player: &Player) -> Result<(), LedgerError> {
        debug!(player_id = %player.id, name = %player.name, "Creating player in memory");

        let mut state = self.state.write().await;
        if state.players.contains_key(&player.id) {
            warn!(player_id = %player.id, "Player already exists in memory");
            return Err(LedgerError::Persistence("Player already exists".to_string()));
        }
        state.players.insert(player.id.clone(), player.clone());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_player_by_name(&self, name: &str) -> Result<Option<Player>, LedgerError> {
        let state = self.state.read().await;
        Ok(state.players.values().find(|p| p.name == name).cloned())
    }

    #[instrument(skip(self))]
    async fn get_player_stats(&self, player_id: &str) -> Result<Option<PlayerStats>, LedgerError> {
        let state = self.state.read().await;
        Ok(state.players.get(player_id).map(|p| p.stats))
    }

    #[instrument(skip(self, stats))]
    async fn update_player_stats(
        &self,
        player_id: &str,
        stats: &PlayerStats,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        let player = state.players.get_mut(player_id).ok_or_else(|| {
            warn!(player_id = %player_id, "Player not found for stats update in memory");
            LedgerError::NotFound(format!("Player {}", player_id))
        })?;
        player.stats = *stats;
        player.updated_at = Utc::now();

        Ok(())
    }

    #[instrument(skip(self, entries))]
    async fn insert_game_entries(
        &self,
        game_id: &str,
        entries: &[NewGameEntry],
    ) -> Result<(), LedgerError> {
        self.commit_session(&SessionCommit {
            game_id: game_id.to_string(),
            created_at: Utc::now(),
            entries: entries.to_vec(),
            stats: Vec::new(),
        })
        .await
    }

    #[instrument(skip(self, commit), fields(game_id = %commit.game_id))]
    async fn commit_session(&self, commit: &SessionCommit) -> Result<(), LedgerError> {
        debug!(
            entries = commit.entries.len(),
            stats = commit.stats.len(),
            "Committing session in memory"
        );

        let mut state = self.state.write().await;
        state.check_commit(commit)?;

        state.game_ids.insert(commit.game_id.clone());
        state.entries.extend(commit.game_entries());
        for (player_id, stats) in &commit.stats {
            if let Some(player) = state.players.get_mut(player_id) {
                player.stats = *stats;
                player.updated_at = commit.created_at;
            }
        }

        debug!("Session committed successfully in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn session_id_exists(&self, game_id: &str) -> Result<bool, LedgerError> {
        let state = self.state.read().await;
        Ok(state.game_ids.contains(game_id))
    }
}

/// PostgreSQL implementation of the ledger repository
pub struct PostgresLedgerRepository {
    pool: PgPool,
}

const PLAYER_COLUMNS: &str = "id, name, score, wins, losses, ties, countgames, round, streak, created_at, updated_at";
const ENTRY_COLUMNS: &str = "game_id, player_id, score, round, created_at";

fn player_from_row(row: &PgRow) -> Player {
    Player {
        id: row.get("id"),
        name: row.get("name"),
        stats: PlayerStats {
            score: row.get("score"),
            wins: row.get("wins"),
            losses: row.get("losses"),
            ties: row.get("ties"),
            countgames: row.get("countgames"),
            round: row.get("round"),
            streak: row.get("streak"),
        },
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn entry_from_row(row: &PgRow) -> GameEntry {
    GameEntry {
        game_id: row.get("game_id"),
        player_id: row.get("player_id"),
        score: row.get("score"),
        round: row.get("round"),
        created_at: row.get("created_at"),
    }
}

fn database_error(context: &'static str) -> impl Fn(sqlx::Error) -> LedgerError {
    move |e| {
        warn!(error = %e, "{}", context);
        LedgerError::Persistence(e.to_string())
    }
}

impl PostgresLedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled schema migrations
    pub async fn migrate(&self) -> Result<(), LedgerError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LedgerError::Persistence(e.to_string()))
    }
}

#[async_trait]
impl LedgerRepository for PostgresLedgerRepository {
    #[instrument(skip(self))]
    async fn list_players(&self) -> Result<Vec<Player>, LedgerError> {
        let rows = sqlx::query(&format!("SELECT {} FROM players", PLAYER_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(database_error("Failed to list players"))?;

        Ok(rows.iter().map(player_from_row).collect())
    }

    #[instrument(skip(self))]
    async fn list_game_entries(&self) -> Result<Vec<GameEntry>, LedgerError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM game_entries ORDER BY id",
            ENTRY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(database_error("Failed to list game entries"))?;

        Ok(rows.iter().map(entry_from_row).collect())
    }

    #[instrument(skip(self))]
    async fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(database_error("Failed to open snapshot transaction"))?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(database_error("Failed to set snapshot isolation"))?;

        let players = sqlx::query(&format!("SELECT {} FROM players", PLAYER_COLUMNS))
            .fetch_all(&mut *tx)
            .await
            .map_err(database_error("Failed to read players for snapshot"))?;
        let entries = sqlx::query(&format!(
            "SELECT {} FROM game_entries ORDER BY id",
            ENTRY_COLUMNS
        ))
        .fetch_all(&mut *tx)
        .await
        .map_err(database_error("Failed to read entries for snapshot"))?;

        tx.commit()
            .await
            .map_err(database_error("Failed to close snapshot transaction"))?;

        Ok(LedgerSnapshot {
            players: players.iter().map(player_from_row).collect(),
            entries: entries.iter().map(entry_from_row).collect(),
        })
    }

    #[instrument(skip(self, player))]
    async fn create_player(&self, player: &Player) -> Result<(), LedgerError> {
        debug!(player_id = %player.id, name = %player.name, "Creating player in database");

        sqlx::query(
            "INSERT INTO players (id, name, score, wins, losses, ties, countgames, round, streak, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&player.id)
        .bind(&player.name)
        .bind(player.stats.score)
        .bind(player.stats.wins)
        .bind(player.stats.losses)
        .bind(player.stats.ties)
        .bind(player.stats.countgames)
        .bind(player.stats.round)
        .bind(player.stats.streak)
        .bind(player.created_at)
        .bind(player.updated_at)
        .execute(&self.pool)
        .await
        .map_err(database_error("Failed to create player in database"))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_player_by_name(&self, name: &str) -> Result<Option<Player>, LedgerError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM players WHERE name = $1",
            PLAYER_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error("Failed to look up player by name"))?;

        Ok(row.as_ref().map(player_from_row))
    }

    #[instrument(skip(self))]
    async fn get_player_stats(&self, player_id: &str) -> Result<Option<PlayerStats>, LedgerError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM players WHERE id = $1",
            PLAYER_COLUMNS
        ))
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error("Failed to fetch player stats"))?;

        Ok(row.as_ref().map(|row| player_from_row(row).stats))
    }

    #[instrument(skip(self, stats))]
    async fn update_player_stats(
        &self,
        player_id: &str,
        stats: &PlayerStats,
    ) -> Result<(), LedgerError> {
        let result = update_stats_query(player_id, stats, Utc::now())
            .execute(&self.pool)
            .await
            .map_err(database_error("Failed to update player stats"))?;

        if result.rows_affected() == 0 {
            warn!(player_id = %player_id, "Player not found for stats update");
            return Err(LedgerError::NotFound(format!("Player {}", player_id)));
        }
        Ok(())
    }

    #[instrument(skip(self, entries))]
    async fn insert_game_entries(
        &self,
        game_id: &str,
        entries: &[NewGameEntry],
    ) -> Result<(), LedgerError> {
        self.commit_session(&SessionCommit {
            game_id: game_id.to_string(),
            created_at: Utc::now(),
            entries: entries.to_vec(),
            stats: Vec::new(),
        })
        .await
    }

    #[instrument(skip(self, commit), fields(game_id = %commit.game_id))]
    async fn commit_session(&self, commit: &SessionCommit) -> Result<(), LedgerError> {
        debug!(
            entries = commit.entries.len(),
            stats = commit.stats.len(),
            "Committing session in database"
        );

        // Dropping the transaction on any early return rolls everything back
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(database_error("Failed to open commit transaction"))?;

        // The primary key serializes concurrent commits carrying the same id
        let claimed = sqlx::query(
            "INSERT INTO sessions (game_id, created_at) VALUES ($1, $2) ON CONFLICT (game_id) DO NOTHING",
        )
        .bind(&commit.game_id)
        .bind(commit.created_at)
        .execute(&mut *tx)
        .await
        .map_err(database_error("Failed to claim session id"))?;
        if claimed.rows_affected() == 0 {
            warn!(game_id = %commit.game_id, "Session id already recorded in database");
            return Err(ValidationError::SessionAlreadyRecorded(commit.game_id.clone()).into());
        }

        for entry in &commit.entries {
            sqlx::query(
                "INSERT INTO game_entries (game_id, player_id, score, round, created_at) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(&commit.game_id)
            .bind(&entry.player_id)
            .bind(entry.score)
            .bind(entry.round)
            .bind(commit.created_at)
            .execute(&mut *tx)
            .await
            .map_err(database_error("Failed to insert game entry"))?;
        }

        for (player_id, stats) in &commit.stats {
            let result = update_stats_query(player_id, stats, commit.created_at)
                .execute(&mut *tx)
                .await
                .map_err(database_error("Failed to update player stats"))?;
            if result.rows_affected() == 0 {
                warn!(player_id = %player_id, "Player not found while committing session");
                return Err(LedgerError::NotFound(format!("Player {}", player_id)));
            }
        }

        tx.commit()
            .await
            .map_err(database_error("Failed to commit session"))?;

        debug!("Session committed successfully in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn session_id_exists(&self, game_id: &str) -> Result<bool, LedgerError> {
        let row = sqlx::query("SELECT 1 FROM sessions WHERE game_id = $1")
            .bind(game_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error("Failed to check session id"))?;

        Ok(row.is_some())
    }
}

fn update_stats_query<'q>(
    player_id: &'q str,
    stats: &PlayerStats,
    updated_at: chrono::DateTime<Utc>,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(
        "UPDATE players SET score = $2, wins = $3, losses = $4, ties = $5, countgames = $6, \
         round = $7, streak = $8, updated_at = $9 WHERE id = $1",
    )
    .bind(player_id)
    .bind(stats.score)
    .bind(stats.wins)
    .bind(stats.losses)
    .bind(stats.ties)
    .bind(stats.countgames)
    .bind(stats.round)
    .bind(stats.streak)
    .bind(updated_at)
}
