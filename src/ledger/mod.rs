// Public API - what other modules can use
pub use errors::{LedgerError, ValidationError};
pub use handlers::{
    create_player, health, list_players, list_history, new_session_id, submit_session,
};
pub use repository::{InMemoryLedgerRepository, LedgerRepository, PostgresLedgerRepository};
pub use service::{LedgerOptions, LedgerService};

pub mod errors;
pub mod generators;
mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;
pub mod validation;
