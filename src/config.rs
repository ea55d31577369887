use std::str::FromStr;

use tracing::warn;

use crate::{
    analytics::DEFAULT_LEADERBOARD_SIZE,
    ledger::{
        service::{DEFAULT_MAX_ROUNDS, DEFAULT_SESSION_ID_ATTEMPTS},
        LedgerOptions,
    },
};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Process configuration, read once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    pub bind_addr: String,
    /// In-memory store when unset
    pub database_url: Option<String>,
    pub ledger: LedgerOptions,
}

impl LedgerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = LedgerOptions::default();

        Self {
            bind_addr: lookup("BIND_ADDR")
                .filter(|addr| !addr.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            ledger: LedgerOptions {
                stats_mode: parse_or(&lookup, "LEDGER_STATS_MODE", defaults.stats_mode),
                leaderboard_size: positive_or(
                    &lookup,
                    "LEDGER_LEADERBOARD_SIZE",
                    DEFAULT_LEADERBOARD_SIZE,
                ),
                max_rounds: positive_or(&lookup, "LEDGER_MAX_ROUNDS", DEFAULT_MAX_ROUNDS),
                session_id_attempts: positive_or(
                    &lookup,
                    "LEDGER_SESSION_ID_ATTEMPTS",
                    DEFAULT_SESSION_ID_ATTEMPTS,
                ),
            },
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default = ?default, "Invalid setting, using default");
            default
        }),
    }
}

fn positive_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + PartialOrd + Default + Copy + std::fmt::Debug,
{
    let value = parse_or(lookup, key, default);
    if value <= T::default() {
        warn!(key, value = ?value, default = ?default, "Setting must be positive, using default");
        return default;
    }
    value
}
