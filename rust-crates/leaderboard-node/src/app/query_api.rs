use leaderboard::{
    PlayerAddress,
    PlayerScore,
    Score,
    ScoreEntry,
};
use serde::{
    Deserialize,
    Serialize,
};
use tokio::sync::oneshot;

use crate::app::snapshot_storage::RecordedEvent;

pub trait QueryAPI {
    fn query(&mut self) -> impl Future<Output = crate::Result<Query>>;
}

#[derive(Debug)]
pub enum Query {
    Leaderboard(oneshot::Sender<(Vec<ScoreEntry>, u64)>),
    TopScores(TopScoresQuery),
    PlayerScore(PlayerQuery<Option<PlayerScore>>),
    PlayerPosition(PlayerQuery<usize>),
    Settings(oneshot::Sender<LeaderboardSettings>),
    EventsSince(EventsQuery),
}

#[derive(Debug)]
pub struct TopScoresQuery {
    pub count: usize,
    pub sender: oneshot::Sender<(Vec<ScoreEntry>, u64)>,
}

#[derive(Debug)]
pub struct PlayerQuery<T> {
    pub player: PlayerAddress,
    pub sender: oneshot::Sender<(T, u64)>,
}

#[derive(Debug)]
pub struct EventsQuery {
    pub since: u64,
    pub sender: oneshot::Sender<(Vec<RecordedEvent>, u64)>,
}

/// Administrative settings and size of the current leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardSettings {
    pub owner: PlayerAddress,
    pub min_score_to_submit: Score,
    pub max_entries: usize,
    pub length: usize,
    pub height: u64,
}

impl Query {
    pub fn top_scores(
        count: usize,
        sender: oneshot::Sender<(Vec<ScoreEntry>, u64)>,
    ) -> Self {
        Query::TopScores(TopScoresQuery { count, sender })
    }

    pub fn player_score(
        player: PlayerAddress,
        sender: oneshot::Sender<(Option<PlayerScore>, u64)>,
    ) -> Self {
        Query::PlayerScore(PlayerQuery { player, sender })
    }

    pub fn player_position(
        player: PlayerAddress,
        sender: oneshot::Sender<(usize, u64)>,
    ) -> Self {
        Query::PlayerPosition(PlayerQuery { player, sender })
    }

    pub fn events_since(
        since: u64,
        sender: oneshot::Sender<(Vec<RecordedEvent>, u64)>,
    ) -> Self {
        Query::EventsSince(EventsQuery { since, sender })
    }
}
