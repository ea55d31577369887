pub mod updater;

pub use updater::{apply, fold, StatsMode};
