// Sled-backed storage for leaderboard snapshots and the event log.
use crate::app::snapshot_storage::{
    RecordedEvent,
    SnapshotStorage,
};
use anyhow::Context;
use leaderboard::{
    Leaderboard,
    LeaderboardEvent,
};
use serde::{
    Deserialize,
    Serialize,
    de::DeserializeOwned,
};
use sled::{
    Config,
    Db,
    Tree,
};
use std::{
    convert::TryInto,
    path::Path,
};

const LATEST_HEIGHT_KEY: &[u8] = b"latest_height";

#[derive(Clone)]
pub struct SledSnapshotStorage {
    snapshot_tree: Tree,
    snapshot_meta: Tree,
    event_tree: Tree,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRecord<T> {
    snapshot: T,
    height: u64,
}

impl SledSnapshotStorage {
    pub fn new(db: &Db) -> crate::Result<Self> {
        let snapshot_tree = db
            .open_tree("leaderboard_snapshots")
            .context("open leaderboard_snapshots tree")?;
        let snapshot_meta = db
            .open_tree("leaderboard_snapshots_meta")
            .context("open leaderboard_snapshots_meta tree")?;
        let event_tree = db
            .open_tree("leaderboard_events")
            .context("open leaderboard_events tree")?;

        Ok(Self {
            snapshot_tree,
            snapshot_meta,
            event_tree,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let config = Config::default().path(path);
        let db = config.open().context("open sled database")?;
        Self::new(&db)
    }

    fn latest_height(&self) -> crate::Result<Option<u64>> {
        match self.snapshot_meta.get(LATEST_HEIGHT_KEY)? {
            Some(bytes) => Ok(Some(height_from_key(bytes.as_ref())?)),
            None => Ok(None),
        }
    }

    fn set_latest_height(&self, height: u64) -> crate::Result<()> {
        let height_bytes = height.to_be_bytes();
        self.snapshot_meta
            .insert(LATEST_HEIGHT_KEY, height_bytes.as_slice())
            .context("write latest snapshot height")?;
        self.snapshot_meta
            .flush()
            .context("flush latest snapshot height")?;
        Ok(())
    }

    fn clear_latest_height(&self) -> crate::Result<()> {
        self.snapshot_meta
            .remove(LATEST_HEIGHT_KEY)
            .context("remove latest snapshot height")?;
        self.snapshot_meta
            .flush()
            .context("flush latest snapshot height")?;
        Ok(())
    }

    fn snapshot_at_height(
        &self,
        height: u64,
    ) -> crate::Result<Option<SnapshotRecord<Leaderboard>>> {
        let key = height.to_be_bytes();
        let value = match self.snapshot_tree.get(key)? {
            Some(value) => value,
            None => return Ok(None),
        };
        let record = deserialize::<SnapshotRecord<Leaderboard>>(value.as_ref())?;
        Ok(Some(record))
    }

    // height then index within the call, both big-endian so iteration is
    // in emission order
    fn event_key(height: u64, index: u32) -> [u8; 12] {
        let mut key = [0u8; 12];
        key[..8].copy_from_slice(&height.to_be_bytes());
        key[8..].copy_from_slice(&index.to_be_bytes());
        key
    }

    // events at heights in `start..end`, or `start..` when `end` is None
    fn remove_events_from(&self, start: u64, end: Option<u64>) -> crate::Result<()> {
        let lower = Self::event_key(start, 0);
        let entries = match end {
            Some(end) => self.event_tree.range(lower..Self::event_key(end, 0)),
            None => self.event_tree.range(lower..),
        };
        for entry in entries {
            let (key, _) = entry.context("iterate leaderboard events")?;
            self.event_tree
                .remove(&key)
                .context("remove leaderboard event")?;
        }
        Ok(())
    }

    fn serialize_record<T: Serialize>(value: &T, label: &str) -> crate::Result<Vec<u8>> {
        serde_json::to_vec(value).with_context(|| format!("serialize {label}"))
    }

    fn persist_snapshot(&self, record: &SnapshotRecord<&Leaderboard>) -> crate::Result<()> {
        let key = record.height.to_be_bytes();
        let bytes = Self::serialize_record(record, "leaderboard snapshot record")?;
        self.snapshot_tree
            .insert(key, bytes)
            .context("persist leaderboard snapshot")?;
        self.snapshot_tree
            .flush()
            .context("flush leaderboard snapshot")?;
        Ok(())
    }
}

impl SnapshotStorage for SledSnapshotStorage {
    fn latest_snapshot(&self) -> crate::Result<Option<(Leaderboard, u64)>> {
        let Some(height) = self.latest_height()? else {
            return Ok(None);
        };
        Ok(self
            .snapshot_at_height(height)?
            .map(|record| (record.snapshot, record.height)))
    }

    fn update_snapshot(
        &mut self,
        snapshot: &Leaderboard,
        height: u64,
    ) -> crate::Result<()> {
        let record = SnapshotRecord { snapshot, height };
        self.persist_snapshot(&record)?;
        self.set_latest_height(height)?;
        Ok(())
    }

    fn snapshot_heights(&self) -> crate::Result<Vec<u64>> {
        self.snapshot_tree
            .iter()
            .keys()
            .map(|key| {
                let key = key.context("iterate leaderboard snapshots")?;
                height_from_key(key.as_ref())
            })
            .collect()
    }

    fn remove_snapshot(&mut self, height: u64) -> crate::Result<()> {
        self.snapshot_tree
            .remove(height.to_be_bytes())
            .context("remove leaderboard snapshot")?;
        self.snapshot_tree
            .flush()
            .context("flush leaderboard snapshots")?;
        Ok(())
    }

    fn record_events(
        &mut self,
        height: u64,
        events: &[LeaderboardEvent],
    ) -> crate::Result<()> {
        self.remove_events_from(height, height.checked_add(1))?;
        for (index, event) in events.iter().enumerate() {
            let index = u32::try_from(index).context("too many events in one call")?;
            let bytes = Self::serialize_record(event, "leaderboard event")?;
            self.event_tree
                .insert(Self::event_key(height, index), bytes)
                .context("persist leaderboard event")?;
        }
        self.event_tree
            .flush()
            .context("flush leaderboard events")?;
        Ok(())
    }

    fn events_since(&self, since: u64) -> crate::Result<Vec<RecordedEvent>> {
        let Some(start) = since.checked_add(1) else {
            return Ok(Vec::new());
        };
        let mut events = Vec::new();
        for entry in self.event_tree.range(Self::event_key(start, 0)..) {
            let (key, value) = entry.context("iterate leaderboard events")?;
            let height = height_from_key(&key[..8])?;
            let event = deserialize::<LeaderboardEvent>(value.as_ref())?;
            events.push(RecordedEvent { height, event });
        }
        Ok(events)
    }

    fn roll_back_snapshots(&mut self, to_height: u64) -> crate::Result<()> {
        let mut latest_candidate = None;

        for entry in self.snapshot_tree.iter() {
            let (key, _) = entry.context("iterate leaderboard snapshots")?;
            let height = height_from_key(key.as_ref())?;
            if height > to_height {
                self.snapshot_tree
                    .remove(&key)
                    .context("remove leaderboard snapshot during rollback")?;
            } else {
                latest_candidate = Some(height);
            }
        }
        self.snapshot_tree
            .flush()
            .context("flush leaderboard snapshots")?;

        match latest_candidate {
            Some(height) => {
                self.set_latest_height(height)?;
                if let Some(start) = height.checked_add(1) {
                    self.remove_events_from(start, None)?;
                }
            }
            None => {
                self.clear_latest_height()?;
                self.remove_events_from(0, None)?;
            }
        }
        self.event_tree
            .flush()
            .context("flush leaderboard events")?;
        Ok(())
    }

    fn clear(&mut self) -> crate::Result<()> {
        self.snapshot_tree
            .clear()
            .context("clear leaderboard snapshots")?;
        self.snapshot_tree
            .flush()
            .context("flush leaderboard snapshots")?;
        self.event_tree
            .clear()
            .context("clear leaderboard events")?;
        self.event_tree
            .flush()
            .context("flush leaderboard events")?;
        self.clear_latest_height()
    }
}

fn height_from_key(bytes: &[u8]) -> crate::Result<u64> {
    let arr: [u8; 8] = bytes.try_into().context("height key must be 8 bytes")?;
    Ok(u64::from_be_bytes(arr))
}

fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> crate::Result<T> {
    serde_json::from_slice(bytes).context("deserialize sled record")
}
