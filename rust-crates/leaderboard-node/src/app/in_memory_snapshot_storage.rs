use crate::app::snapshot_storage::{
    RecordedEvent,
    SnapshotStorage,
};
use anyhow::anyhow;
use leaderboard::{
    Leaderboard,
    LeaderboardEvent,
};
use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
};

type Snapshots = BTreeMap<u64, Leaderboard>;
type Events = BTreeMap<u64, Vec<LeaderboardEvent>>;

#[derive(Clone, Default)]
pub struct InMemorySnapshotStorage {
    snapshots: Arc<Mutex<Snapshots>>,
    events: Arc<Mutex<Events>>,
}

impl InMemorySnapshotStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with_snapshot(snapshot: Leaderboard, height: u64) -> Self {
        let storage = Self::new();
        if let Ok(mut guard) = storage.snapshots.lock() {
            guard.insert(height, snapshot);
        }
        storage
    }

    fn lock_snapshots(&self) -> crate::Result<MutexGuard<'_, Snapshots>> {
        self.snapshots
            .lock()
            .map_err(|_| anyhow!("snapshot lock poisoned"))
    }

    fn lock_events(&self) -> crate::Result<MutexGuard<'_, Events>> {
        self.events
            .lock()
            .map_err(|_| anyhow!("event lock poisoned"))
    }
}

impl SnapshotStorage for InMemorySnapshotStorage {
    fn latest_snapshot(&self) -> crate::Result<Option<(Leaderboard, u64)>> {
        let guard = self.lock_snapshots()?;
        Ok(guard
            .last_key_value()
            .map(|(height, snapshot)| (snapshot.clone(), *height)))
    }

    fn update_snapshot(
        &mut self,
        snapshot: &Leaderboard,
        height: u64,
    ) -> crate::Result<()> {
        let mut guard = self.lock_snapshots()?;
        guard.insert(height, snapshot.clone());
        Ok(())
    }

    fn snapshot_heights(&self) -> crate::Result<Vec<u64>> {
        Ok(self.lock_snapshots()?.keys().copied().collect())
    }

    fn remove_snapshot(&mut self, height: u64) -> crate::Result<()> {
        self.lock_snapshots()?.remove(&height);
        Ok(())
    }

    fn record_events(
        &mut self,
        height: u64,
        events: &[LeaderboardEvent],
    ) -> crate::Result<()> {
        let mut guard = self.lock_events()?;
        guard.insert(height, events.to_vec());
        Ok(())
    }

    fn events_since(&self, since: u64) -> crate::Result<Vec<RecordedEvent>> {
        let Some(start) = since.checked_add(1) else {
            return Ok(Vec::new());
        };
        let guard = self.lock_events()?;
        let events = guard
            .range(start..)
            .flat_map(|(height, events)| {
                events.iter().map(|event| RecordedEvent {
                    height: *height,
                    event: event.clone(),
                })
            })
            .collect();
        Ok(events)
    }

    fn roll_back_snapshots(&mut self, to_height: u64) -> crate::Result<()> {
        let landed = {
            let mut snapshots = self.lock_snapshots()?;
            snapshots.retain(|height, _| *height <= to_height);
            snapshots.last_key_value().map(|(height, _)| *height)
        };
        let mut events = self.lock_events()?;
        match landed {
            Some(landed) => events.retain(|height, _| *height <= landed),
            None => events.clear(),
        }
        Ok(())
    }

    fn clear(&mut self) -> crate::Result<()> {
        self.lock_snapshots()?.clear();
        self.lock_events()?.clear();
        Ok(())
    }
}
