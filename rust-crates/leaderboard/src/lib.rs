//! Bounded top-N leaderboard for Temple Dash runs.
//!
//! The [`Leaderboard`] keeps every player's personal best and re-derives the
//! top [`MAX_LEADERBOARD_SIZE`] standings after each accepted submission. It
//! holds no ambient state: callers own it and pass it around explicitly, and
//! are responsible for applying calls in a single total order.

pub mod address;
pub mod config;
pub mod error;
pub mod events;
pub mod ranking;

pub use address::{
    AddressParseError,
    PlayerAddress,
};
pub use config::LeaderboardConfig;
pub use error::LeaderboardError;
pub use events::LeaderboardEvent;
pub use ranking::{
    Leaderboard,
    PlayerScore,
    ScoreEntry,
    Submission,
    SubmitOutcome,
};

/// Scores are unbounded non-negative integers on chain; `u128` covers every
/// value the game can produce.
pub type Score = u128;

/// Number of entries retained in the ranked view.
pub const MAX_LEADERBOARD_SIZE: usize = 20;

pub const DEFAULT_MIN_SCORE_TO_SUBMIT: Score = 10;

pub type Result<T, E = LeaderboardError> = std::result::Result<T, E>;
