// Public API - derived views over a ledger snapshot
pub use handlers::{get_analytics, get_leaderboard, get_player_detail};
pub use head_to_head::{build_matrix, HeadToHeadMatrix, HeadToHeadRecord};
pub use integrity::{check_sessions, group_sessions, ConsistencyViolation, ViolationKind};
pub use leaderboard::{Classification, LeaderboardKind, DEFAULT_LEADERBOARD_SIZE};
pub use report::{
    Analysis, AnalyticsReport, Leaderboard, LeaderboardRows, PlayerDetail, ReportOptions,
    StandingRow, UNKNOWN_PLAYER,
};
pub use streaks::{analyze_all, analyze_streaks, PlayerStreaks, StreakSummary};

mod handlers;
pub mod head_to_head;
pub mod integrity;
pub mod leaderboard;
pub mod report;
pub mod streaks;
