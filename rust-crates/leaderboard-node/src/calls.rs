use leaderboard::{
    Leaderboard,
    LeaderboardEvent,
    PlayerAddress,
    PlayerScore,
    Score,
    Submission,
    SubmitOutcome,
};
use serde::{
    Deserialize,
    Serialize,
};

/// A state-changing call against the leaderboard, attributed to `caller`.
/// The caller identity is authenticated before it reaches the node.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub caller: PlayerAddress,
    pub timestamp: u64,
    pub kind: CallKind,
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub enum CallKind {
    Submit(Submission),
    SetMinScore(Score),
    TransferOwnership(PlayerAddress),
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Accepted,
    Ignored,
    Rejected,
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct CallReceipt {
    /// Height of the state the call produced (accepted) or was evaluated
    /// against (ignored, rejected).
    pub height: u64,
    pub status: CallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(default)]
    pub events: Vec<LeaderboardEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best: Option<PlayerScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Call {
    pub fn submit(caller: PlayerAddress, submission: Submission, timestamp: u64) -> Self {
        Self {
            caller,
            timestamp,
            kind: CallKind::Submit(submission),
        }
    }

    pub fn set_min_score(caller: PlayerAddress, min_score: Score, timestamp: u64) -> Self {
        Self {
            caller,
            timestamp,
            kind: CallKind::SetMinScore(min_score),
        }
    }

    pub fn transfer_ownership(
        caller: PlayerAddress,
        new_owner: PlayerAddress,
        timestamp: u64,
    ) -> Self {
        Self {
            caller,
            timestamp,
            kind: CallKind::TransferOwnership(new_owner),
        }
    }

    /// Apply the call on top of the state at `height`. Only accepted calls
    /// advance the height.
    pub fn apply(self, leaderboard: &mut Leaderboard, height: u64) -> CallReceipt {
        let Call {
            caller,
            timestamp,
            kind,
        } = self;
        let result = match kind {
            CallKind::Submit(submission) => leaderboard
                .submit(caller, submission, timestamp)
                .map(|outcome| match outcome {
                    SubmitOutcome::Accepted { position, events } => {
                        let position = (position > 0).then_some(position);
                        CallReceipt::accepted(height + 1, position, events)
                    }
                    SubmitOutcome::Ignored { best } => CallReceipt::ignored(height, best),
                }),
            CallKind::SetMinScore(min_score) => leaderboard
                .set_min_score_to_submit(caller, min_score)
                .map(|event| CallReceipt::accepted(height + 1, None, vec![event])),
            CallKind::TransferOwnership(new_owner) => leaderboard
                .transfer_ownership(caller, new_owner)
                .map(|event| CallReceipt::accepted(height + 1, None, vec![event])),
        };
        result.unwrap_or_else(|e| CallReceipt::rejected(height, e.to_string()))
    }
}

impl CallReceipt {
    pub fn accepted(
        height: u64,
        position: Option<usize>,
        events: Vec<LeaderboardEvent>,
    ) -> Self {
        Self {
            height,
            status: CallStatus::Accepted,
            position,
            events,
            best: None,
            error: None,
        }
    }

    pub fn ignored(height: u64, best: PlayerScore) -> Self {
        Self {
            height,
            status: CallStatus::Ignored,
            position: None,
            events: Vec::new(),
            best: Some(best),
            error: None,
        }
    }

    pub fn rejected(height: u64, error: impl Into<String>) -> Self {
        Self {
            height,
            status: CallStatus::Rejected,
            position: None,
            events: Vec::new(),
            best: None,
            error: Some(error.into()),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == CallStatus::Accepted
    }
}
