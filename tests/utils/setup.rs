use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;

use mahjong_ledger::{
    ledger::models::Player, router, AppState, InMemoryLedgerRepository, LedgerOptions,
    LedgerService,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub app: Router,
    pub repository: Arc<InMemoryLedgerRepository>,
    pub players: HashMap<String, Player>,
}

impl TestSetup {
    /// Registered player by name
    pub fn player(&self, name: &str) -> &Player {
        self.players
            .get(name)
            .unwrap_or_else(|| panic!("{} was not registered by the setup", name))
    }
}

pub struct TestSetupBuilder {
    players: Vec<String>,
    options: LedgerOptions,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            players: vec![],
            options: LedgerOptions::default(),
        }
    }

    pub fn with_players(mut self, players: Vec<&str>) -> Self {
        self.players = players.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_four_players(self) -> Self {
        self.with_players(vec!["east", "south", "west", "north"])
    }

    pub fn with_options(mut self, options: LedgerOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn build(self) -> TestSetup {
        let repository = Arc::new(InMemoryLedgerRepository::new());
        let ledger = Arc::new(LedgerService::new(repository.clone(), self.options));

        let mut players = HashMap::new();
        for name in &self.players {
            let player = ledger.register_player(name).await.unwrap();
            players.insert(name.clone(), player);
        }

        TestSetup {
            app: router(AppState::new(ledger)),
            repository,
            players,
        }
    }
}
