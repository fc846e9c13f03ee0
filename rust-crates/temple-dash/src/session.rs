use crate::RunSummary;
use leaderboard::Score;

/// Local bookkeeping across runs, independent of the shared leaderboard.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionStats {
    pub games_played: u64,
    pub best_run: Score,
    pub total_distance: u64,
    pub max_speed: f64,
    pub achievements: Vec<String>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            max_speed: 1.0,
            ..Self::default()
        }
    }

    /// Returns true when the run is a new personal best.
    pub fn record(&mut self, summary: &RunSummary) -> bool {
        self.games_played += 1;
        self.total_distance += summary.distance;
        self.max_speed = self.max_speed.max(summary.max_speed);

        let score = summary.score();
        if score <= self.best_run {
            return false;
        }
        self.best_run = score;
        self.achievements.push(format!("New best score: {score}"));
        tracing::info!("new best run: {score}");
        true
    }
}
