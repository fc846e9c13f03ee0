use crate::{
    LeaderboardConfig,
    LeaderboardError,
    LeaderboardEvent,
    MAX_LEADERBOARD_SIZE,
    PlayerAddress,
    Result,
    Score,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::HashMap;

/// A player's best accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub score: Score,
    pub timestamp: u64,
    pub player_name: String,
    /// External numeric id; `0` means none was supplied.
    pub fid: u64,
}

/// One row of the ranked view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub player: PlayerAddress,
    pub score: Score,
    pub timestamp: u64,
    pub player_name: String,
    pub fid: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub score: Score,
    pub player_name: String,
    #[serde(default)]
    pub fid: u64,
}

impl Submission {
    pub fn new(score: Score, player_name: impl Into<String>, fid: u64) -> Self {
        Self {
            score,
            player_name: player_name.into(),
            fid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The submission became the player's best. `position` is 0 when it did
    /// not make the ranked view.
    Accepted {
        position: usize,
        events: Vec<LeaderboardEvent>,
    },
    /// The player already holds an equal or better score.
    Ignored { best: PlayerScore },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SequencedScore {
    player: PlayerAddress,
    record: PlayerScore,
    // order in which this best was reached; lower wins ties
    sequence: u64,
}

/// Persisted form. The ranked view is derived, so only the per-player bests
/// are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LeaderboardState {
    owner: PlayerAddress,
    min_score_to_submit: Score,
    next_sequence: u64,
    scores: Vec<SequencedScore>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LeaderboardState", into = "LeaderboardState")]
pub struct Leaderboard {
    owner: PlayerAddress,
    min_score_to_submit: Score,
    next_sequence: u64,
    best_scores: HashMap<PlayerAddress, SequencedScore>,
    standings: Vec<ScoreEntry>,
}

impl Leaderboard {
    pub fn new(config: LeaderboardConfig) -> Self {
        Self {
            owner: config.owner,
            min_score_to_submit: config.min_score_to_submit,
            next_sequence: 0,
            best_scores: HashMap::new(),
            standings: Vec::new(),
        }
    }

    pub fn submit(
        &mut self,
        caller: PlayerAddress,
        submission: Submission,
        timestamp: u64,
    ) -> Result<SubmitOutcome> {
        let Submission {
            score,
            player_name,
            fid,
        } = submission;
        if score < self.min_score_to_submit {
            return Err(LeaderboardError::ScoreTooLow {
                score,
                minimum: self.min_score_to_submit,
            });
        }
        if player_name.is_empty() {
            return Err(LeaderboardError::EmptyName);
        }
        if let Some(existing) = self.best_scores.get(&caller) {
            if score <= existing.record.score {
                tracing::debug!(
                    "ignoring score {score} from {caller}; best is {}",
                    existing.record.score
                );
                return Ok(SubmitOutcome::Ignored {
                    best: existing.record.clone(),
                });
            }
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let record = PlayerScore {
            score,
            timestamp,
            player_name,
            fid,
        };
        let mut events = vec![LeaderboardEvent::score_submitted(
            caller,
            score,
            record.player_name.clone(),
            fid,
        )];
        self.best_scores.insert(
            caller,
            SequencedScore {
                player: caller,
                record,
                sequence,
            },
        );
        self.rebuild_standings();

        let position = self.player_position(&caller);
        if position > 0 {
            events.push(LeaderboardEvent::leaderboard_updated(caller, score, position));
        }
        Ok(SubmitOutcome::Accepted { position, events })
    }

    pub fn set_min_score_to_submit(
        &mut self,
        caller: PlayerAddress,
        min_score_to_submit: Score,
    ) -> Result<LeaderboardEvent> {
        self.ensure_owner(caller)?;
        let previous = self.min_score_to_submit;
        self.min_score_to_submit = min_score_to_submit;
        Ok(LeaderboardEvent::min_score_updated(
            previous,
            min_score_to_submit,
        ))
    }

    pub fn transfer_ownership(
        &mut self,
        caller: PlayerAddress,
        new_owner: PlayerAddress,
    ) -> Result<LeaderboardEvent> {
        self.ensure_owner(caller)?;
        let previous = self.owner;
        self.owner = new_owner;
        Ok(LeaderboardEvent::ownership_transferred(previous, new_owner))
    }

    pub fn player_score(&self, player: &PlayerAddress) -> Option<&PlayerScore> {
        self.best_scores.get(player).map(|entry| &entry.record)
    }

    /// 1-based rank in the ranked view, or 0 when the player is not in it.
    pub fn player_position(&self, player: &PlayerAddress) -> usize {
        self.standings
            .iter()
            .position(|entry| entry.player == *player)
            .map_or(0, |index| index + 1)
    }

    pub fn leaderboard(&self) -> &[ScoreEntry] {
        &self.standings
    }

    pub fn top_scores(&self, count: usize) -> &[ScoreEntry] {
        &self.standings[..count.min(self.standings.len())]
    }

    pub fn len(&self) -> usize {
        self.standings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.standings.is_empty()
    }

    pub fn owner(&self) -> PlayerAddress {
        self.owner
    }

    pub fn min_score_to_submit(&self) -> Score {
        self.min_score_to_submit
    }

    fn ensure_owner(&self, caller: PlayerAddress) -> Result<()> {
        if caller != self.owner {
            return Err(LeaderboardError::Unauthorized { caller });
        }
        Ok(())
    }

    fn rebuild_standings(&mut self) {
        let mut ranked: Vec<&SequencedScore> = self.best_scores.values().collect();
        ranked.sort_by(|a, b| {
            b.record
                .score
                .cmp(&a.record.score)
                .then(a.sequence.cmp(&b.sequence))
        });
        self.standings = ranked
            .into_iter()
            .take(MAX_LEADERBOARD_SIZE)
            .map(|entry| ScoreEntry {
                player: entry.player,
                score: entry.record.score,
                timestamp: entry.record.timestamp,
                player_name: entry.record.player_name.clone(),
                fid: entry.record.fid,
            })
            .collect();
    }
}

impl From<LeaderboardState> for Leaderboard {
    fn from(state: LeaderboardState) -> Self {
        let best_scores = state
            .scores
            .into_iter()
            .map(|entry| (entry.player, entry))
            .collect();
        let mut leaderboard = Self {
            owner: state.owner,
            min_score_to_submit: state.min_score_to_submit,
            next_sequence: state.next_sequence,
            best_scores,
            standings: Vec::new(),
        };
        leaderboard.rebuild_standings();
        leaderboard
    }
}

impl From<Leaderboard> for LeaderboardState {
    fn from(leaderboard: Leaderboard) -> Self {
        let mut scores: Vec<SequencedScore> =
            leaderboard.best_scores.into_values().collect();
        scores.sort_by_key(|entry| entry.sequence);
        Self {
            owner: leaderboard.owner,
            min_score_to_submit: leaderboard.min_score_to_submit,
            next_sequence: leaderboard.next_sequence,
            scores,
        }
    }
}
