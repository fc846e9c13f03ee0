use crate::{
    PlayerAddress,
    Score,
};
use serde::{
    Deserialize,
    Serialize,
};

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub enum LeaderboardEvent {
    ScoreSubmitted(ScoreSubmittedEvent),
    LeaderboardUpdated(LeaderboardUpdatedEvent),
    MinScoreUpdated(MinScoreUpdatedEvent),
    OwnershipTransferred(OwnershipTransferredEvent),
}

/// Emitted for every accepted submission, whether or not it ranks.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSubmittedEvent {
    pub player: PlayerAddress,
    pub score: Score,
    pub player_name: String,
    pub fid: u64,
}

/// Emitted when an accepted submission lands inside the ranked view.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardUpdatedEvent {
    pub player: PlayerAddress,
    pub score: Score,
    // 1-based
    pub position: usize,
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct MinScoreUpdatedEvent {
    pub previous: Score,
    pub current: Score,
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipTransferredEvent {
    pub previous: PlayerAddress,
    pub current: PlayerAddress,
}

impl LeaderboardEvent {
    pub fn score_submitted(
        player: PlayerAddress,
        score: Score,
        player_name: impl Into<String>,
        fid: u64,
    ) -> Self {
        let inner = ScoreSubmittedEvent {
            player,
            score,
            player_name: player_name.into(),
            fid,
        };
        LeaderboardEvent::ScoreSubmitted(inner)
    }

    pub fn leaderboard_updated(
        player: PlayerAddress,
        score: Score,
        position: usize,
    ) -> Self {
        let inner = LeaderboardUpdatedEvent {
            player,
            score,
            position,
        };
        LeaderboardEvent::LeaderboardUpdated(inner)
    }

    pub fn min_score_updated(previous: Score, current: Score) -> Self {
        LeaderboardEvent::MinScoreUpdated(MinScoreUpdatedEvent { previous, current })
    }

    pub fn ownership_transferred(previous: PlayerAddress, current: PlayerAddress) -> Self {
        LeaderboardEvent::OwnershipTransferred(OwnershipTransferredEvent {
            previous,
            current,
        })
    }
}
