use crate::{
    DEFAULT_MIN_SCORE_TO_SUBMIT,
    PlayerAddress,
    Score,
};
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    /// The only account allowed to change the minimum score or hand over
    /// ownership.
    pub owner: PlayerAddress,
    #[serde(default = "default_min_score_to_submit")]
    pub min_score_to_submit: Score,
}

fn default_min_score_to_submit() -> Score {
    DEFAULT_MIN_SCORE_TO_SUBMIT
}

impl LeaderboardConfig {
    pub fn new(owner: PlayerAddress) -> Self {
        Self {
            owner,
            min_score_to_submit: DEFAULT_MIN_SCORE_TO_SUBMIT,
        }
    }

    pub fn with_min_score_to_submit(mut self, min_score_to_submit: Score) -> Self {
        self.min_score_to_submit = min_score_to_submit;
        self
    }
}
