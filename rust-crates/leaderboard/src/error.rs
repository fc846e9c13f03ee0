use crate::{
    PlayerAddress,
    Score,
};

/// Reasons a call is rejected. A rejected call leaves the leaderboard
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeaderboardError {
    #[error("score {score} too low for leaderboard (minimum {minimum})")]
    ScoreTooLow { score: Score, minimum: Score },
    #[error("player name cannot be empty")]
    EmptyName,
    #[error("account {caller} is not authorized")]
    Unauthorized { caller: PlayerAddress },
}
