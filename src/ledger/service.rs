use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, instrument, warn};

use super::{
    errors::{LedgerError, ValidationError},
    generators::{SessionIdGenerator, UuidSessionIdGenerator},
    models::{NewGameEntry, Player, PlayerStats, SessionCommit, SessionSubmission},
    repository::LedgerRepository,
    types::{HistoryParticipant, SessionHistory, SessionReceipt, StandingUpdate},
    validation::validate,
};
use crate::{
    analytics::{
        check_sessions, group_sessions, Analysis, AnalyticsReport, Leaderboard, LeaderboardKind,
        PlayerDetail, ReportOptions, StandingRow, DEFAULT_LEADERBOARD_SIZE, UNKNOWN_PLAYER,
    },
    standings::{self, StatsMode},
};

pub const DEFAULT_MAX_ROUNDS: i32 = 15;
pub const DEFAULT_SESSION_ID_ATTEMPTS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerOptions {
    pub stats_mode: StatsMode,
    pub leaderboard_size: usize,
    pub max_rounds: i32,
    pub session_id_attempts: u32,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            stats_mode: StatsMode::default(),
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
            max_rounds: DEFAULT_MAX_ROUNDS,
            session_id_attempts: DEFAULT_SESSION_ID_ATTEMPTS,
        }
    }
}

impl LedgerOptions {
    fn report_options(&self) -> ReportOptions {
        ReportOptions {
            stats_mode: self.stats_mode,
            leaderboard_size: self.leaderboard_size,
        }
    }
}

/// Service for recording sessions and reading the standings and analytics derived from them
pub struct LedgerService {
    repository: Arc<dyn LedgerRepository>,
    id_generator: Arc<dyn SessionIdGenerator>,
    options: LedgerOptions,
    player_mutexes: Arc<RwLock<HashMap<String, Arc<AsyncMutex<()>>>>>,
    registration: AsyncMutex<()>,
}

impl LedgerService {
    pub fn new(repository: Arc<dyn LedgerRepository>, options: LedgerOptions) -> Self {
        Self {
            repository,
            id_generator: Arc::new(UuidSessionIdGenerator::new()),
            options,
            player_mutexes: Arc::new(RwLock::new(HashMap::new())),
            registration: AsyncMutex::new(()),
        }
    }

    pub fn with_id_generator(mut self, id_generator: Arc<dyn SessionIdGenerator>) -> Self {
        self.id_generator = id_generator;
        self
    }

    pub fn options(&self) -> &LedgerOptions {
        &self.options
    }

    /// Registers a player under a trimmed, unique name
    #[instrument(skip(self))]
    pub async fn register_player(&self, name: &str) -> Result<Player, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyPlayerName.into());
        }

        // Check-then-create must not interleave with another registration
        let _guard = self.registration.lock().await;
        if self.repository.find_player_by_name(name).await?.is_some() {
            warn!(name = %name, "Player name already taken");
            return Err(ValidationError::DuplicatePlayerName(name.to_string()).into());
        }

        let player = Player::new(name.to_string());
        self.repository.create_player(&player).await?;

        info!(player_id = %player.id, name = %player.name, "Player registered");
        Ok(player)
    }

    /// All players, ordered by name
    #[instrument(skip(self))]
    pub async fn list_players(&self) -> Result<Vec<Player>, LedgerError> {
        let mut players = self.repository.list_players().await?;
        players.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(players)
    }

    /// Generates a session id no stored session uses yet
    #[instrument(skip(self))]
    pub async fn new_session_id(&self) -> Result<String, LedgerError> {
        for attempt in 1..=self.options.session_id_attempts {
            let game_id = self.id_generator.generate().await;
            if !self.repository.session_id_exists(&game_id).await? {
                debug!(game_id = %game_id, attempt, "Generated session id");
                return Ok(game_id);
            }
            warn!(game_id = %game_id, attempt, "Generated session id already in use");
        }

        Err(LedgerError::Persistence(format!(
            "No unused session id after {} attempts",
            self.options.session_id_attempts
        )))
    }

    /// Validates a session, computes every participant's next stats and commits both at once
    #[instrument(skip(self, submission), fields(round = ?submission.round, participants = submission.scores.len()))]
    pub async fn submit_session(
        &self,
        submission: SessionSubmission,
    ) -> Result<SessionReceipt, LedgerError> {
        let players = self.repository.list_players().await?;
        let validated = validate(&submission, &players, self.options.max_rounds)?;

        let game_id = match submission.game_id.as_deref().map(str::trim) {
            Some(game_id) if !game_id.is_empty() => {
                if self.repository.session_id_exists(game_id).await? {
                    warn!(game_id = %game_id, "Session id already recorded");
                    return Err(ValidationError::SessionAlreadyRecorded(game_id.to_string()).into());
                }
                game_id.to_string()
            }
            _ => self.new_session_id().await?,
        };

        let participant_ids: Vec<&str> = validated
            .scores
            .iter()
            .map(|(player_id, _)| player_id.as_str())
            .collect();
        let _guards = self.lock_players(&participant_ids).await;

        let previous = self.current_stats(&participant_ids).await?;
        let names: HashMap<&str, &str> = players
            .iter()
            .map(|p| (p.id.as_str(), p.name.as_str()))
            .collect();

        let mut updates = Vec::with_capacity(validated.scores.len());
        for ((player_id, score), old) in validated.scores.iter().zip(previous) {
            let name = names.get(player_id.as_str()).unwrap_or(&UNKNOWN_PLAYER).to_string();
            let current = standings::apply(&old, *score, validated.round).ok_or_else(|| {
                warn!(player_id = %player_id, score = *score, "Session would overflow running stats");
                ValidationError::ScoreOverflow {
                    player: name.clone(),
                }
            })?;
            updates.push(StandingUpdate {
                player_id: player_id.clone(),
                name,
                previous: old,
                current,
            });
        }

        let commit = SessionCommit {
            game_id,
            created_at: Utc::now(),
            entries: validated
                .scores
                .iter()
                .map(|(player_id, score)| NewGameEntry {
                    player_id: player_id.clone(),
                    score: *score,
                    round: validated.round,
                })
                .collect(),
            stats: match self.options.stats_mode {
                StatsMode::Incremental => updates
                    .iter()
                    .map(|update| (update.player_id.clone(), update.current))
                    .collect(),
                StatsMode::Recompute => Vec::new(),
            },
        };
        self.repository.commit_session(&commit).await?;

        info!(
            game_id = %commit.game_id,
            round = validated.round,
            participants = commit.entries.len(),
            "Session recorded"
        );

        Ok(SessionReceipt {
            game_id: commit.game_id.clone(),
            round: validated.round,
            created_at: commit.created_at,
            entries: commit.game_entries(),
            standings: updates,
        })
    }

    /// Recorded sessions, newest first
    #[instrument(skip(self))]
    pub async fn history(&self) -> Result<Vec<SessionHistory>, LedgerError> {
        let snapshot = self.repository.snapshot().await?;
        let names: HashMap<&str, &str> = snapshot
            .players
            .iter()
            .map(|p| (p.id.as_str(), p.name.as_str()))
            .collect();

        let mut sessions = group_sessions(&snapshot.entries);
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(sessions
            .into_iter()
            .map(|session| SessionHistory {
                participants: session
                    .entries
                    .iter()
                    .map(|entry| HistoryParticipant {
                        player_id: entry.player_id.clone(),
                        name: names
                            .get(entry.player_id.as_str())
                            .unwrap_or(&UNKNOWN_PLAYER)
                            .to_string(),
                        score: entry.score,
                    })
                    .collect(),
                game_id: session.game_id,
                round: session.round,
                created_at: session.created_at,
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn standings(&self) -> Result<Vec<StandingRow>, LedgerError> {
        Ok(self.analysis().await?.standings())
    }

    #[instrument(skip(self))]
    pub async fn analytics(&self) -> Result<AnalyticsReport, LedgerError> {
        let report = self.analysis().await?.report();
        if !report.warnings.is_empty() {
            warn!(
                warnings = report.warnings.len(),
                "Analytics skipped inconsistent sessions"
            );
        }
        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn player_detail(&self, player_id: &str) -> Result<PlayerDetail, LedgerError> {
        self.analysis()
            .await?
            .player_detail(player_id)
            .ok_or_else(|| LedgerError::NotFound(format!("Player {}", player_id)))
    }

    #[instrument(skip(self))]
    pub async fn leaderboard(&self, kind: LeaderboardKind) -> Result<Leaderboard, LedgerError> {
        Ok(self.analysis().await?.leaderboard(kind))
    }

    async fn analysis(&self) -> Result<Analysis, LedgerError> {
        let snapshot = self.repository.snapshot().await?;
        debug!(
            players = snapshot.players.len(),
            entries = snapshot.entries.len(),
            "Analysing ledger snapshot"
        );
        Ok(Analysis::new(&snapshot, &self.options.report_options()))
    }

    /// Stats each participant had before this session, in the order given
    async fn current_stats(&self, player_ids: &[&str]) -> Result<Vec<PlayerStats>, LedgerError> {
        match self.options.stats_mode {
            StatsMode::Incremental => {
                let mut stats = Vec::with_capacity(player_ids.len());
                for player_id in player_ids {
                    let current = self
                        .repository
                        .get_player_stats(player_id)
                        .await?
                        .ok_or_else(|| LedgerError::NotFound(format!("Player {}", player_id)))?;
                    stats.push(current);
                }
                Ok(stats)
            }
            StatsMode::Recompute => {
                let stored = self.repository.list_game_entries().await?;
                let entries = check_sessions(&stored).entries();
                Ok(player_ids
                    .iter()
                    .map(|player_id| {
                        standings::fold(entries.iter().filter(|e| e.player_id == *player_id))
                    })
                    .collect())
            }
        }
    }

    /// Locks every participant, always in ascending id order
    async fn lock_players(&self, player_ids: &[&str]) -> Vec<OwnedMutexGuard<()>> {
        let mut ordered = player_ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for player_id in ordered {
            guards.push(self.player_lock(player_id).await.lock_owned().await);
        }
        guards
    }

    async fn player_lock(&self, player_id: &str) -> Arc<AsyncMutex<()>> {
        {
            let guard = self.player_mutexes.read().await;
            if let Some(lock) = guard.get(player_id) {
                return lock.clone();
            }
        }

        let mut guard = self.player_mutexes.write().await;
        guard
            .entry(player_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}
