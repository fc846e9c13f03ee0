use leaderboard::{
    Leaderboard,
    LeaderboardEvent,
};
use serde::{
    Deserialize,
    Serialize,
};

/// An event together with the height of the call that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub height: u64,
    pub event: LeaderboardEvent,
}

/// Which snapshots survive once a newer one is written: the latest one, plus
/// the most recent `checkpoints` heights that are multiples of
/// `checkpoint_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotRetention {
    pub checkpoint_interval: u64,
    pub checkpoints: usize,
}

impl Default for SnapshotRetention {
    fn default() -> Self {
        Self {
            checkpoint_interval: 100,
            checkpoints: 10,
        }
    }
}

impl SnapshotRetention {
    /// Heights among `heights` (ascending) that may be removed when `latest`
    /// is the newest snapshot.
    pub fn expired(&self, heights: &[u64], latest: u64) -> Vec<u64> {
        let interval = self.checkpoint_interval.max(1);
        let mut kept_checkpoints = 0;
        let mut expired = Vec::new();
        for height in heights.iter().rev().copied().filter(|height| *height < latest) {
            if height % interval == 0 && kept_checkpoints < self.checkpoints {
                kept_checkpoints += 1;
            } else {
                expired.push(height);
            }
        }
        expired
    }
}

pub trait SnapshotStorage {
    /// retrieve latest snapshot along with its height, if any was written
    fn latest_snapshot(&self) -> crate::Result<Option<(Leaderboard, u64)>>;

    /// write or overwrite snapshot at given height
    fn update_snapshot(&mut self, snapshot: &Leaderboard, height: u64)
    -> crate::Result<()>;

    /// heights of every stored snapshot, ascending
    fn snapshot_heights(&self) -> crate::Result<Vec<u64>>;

    /// delete the snapshot at given height, if present
    fn remove_snapshot(&mut self, height: u64) -> crate::Result<()>;

    /// write the events emitted by the call at given height, replacing any
    /// events previously recorded at that height
    fn record_events(
        &mut self,
        height: u64,
        events: &[LeaderboardEvent],
    ) -> crate::Result<()>;

    /// all recorded events strictly above `since`, in emission order
    fn events_since(&self, since: u64) -> crate::Result<Vec<RecordedEvent>>;

    /// Roll back to the newest snapshot at or below `to_height`. Snapshots
    /// above it and events above the snapshot that was landed on are deleted.
    fn roll_back_snapshots(&mut self, to_height: u64) -> crate::Result<()>;

    /// drop every snapshot and event
    fn clear(&mut self) -> crate::Result<()>;

    /// Remove everything at or above `from_height`.
    fn prune_from(&mut self, from_height: u64) -> crate::Result<()> {
        match from_height.checked_sub(1) {
            Some(to_height) => self.roll_back_snapshots(to_height),
            None => self.clear(),
        }
    }

    /// Drop snapshots older than `latest` that `retention` does not keep.
    fn retain_checkpoints(
        &mut self,
        latest: u64,
        retention: &SnapshotRetention,
    ) -> crate::Result<()> {
        let heights = self.snapshot_heights()?;
        for height in retention.expired(&heights, latest) {
            self.remove_snapshot(height)?;
        }
        Ok(())
    }
}
