use crate::{
    Result,
    app::{
        call_source::{
            CallSource,
            PendingCall,
        },
        query_api::{
            EventsQuery,
            LeaderboardSettings,
            PlayerQuery,
            Query,
            QueryAPI,
            TopScoresQuery,
        },
        snapshot_storage::{
            SnapshotRetention,
            SnapshotStorage,
        },
    },
    calls::CallStatus,
};
use leaderboard::{
    Leaderboard,
    LeaderboardConfig,
    MAX_LEADERBOARD_SIZE,
};
use std::path::Path;
use tokio::sync::oneshot;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub mod actix_query_api;
pub mod call_source;
pub mod in_memory_snapshot_storage;
pub mod query_api;
pub mod sled_storage;
pub mod snapshot_storage;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Continue,
    Exit,
}

/// Owns the leaderboard and applies calls one at a time, in arrival order.
/// Queries are answered from the in-memory state between calls, so every
/// read observes the state after some whole number of calls.
pub struct App<Calls, API, Storage> {
    calls: Calls,
    api: API,
    storage: Storage,
    leaderboard: Leaderboard,
    height: u64,
    retention: SnapshotRetention,
}

impl<Calls, API, Storage> App<Calls, API, Storage> {
    pub fn new(
        calls: Calls,
        api: API,
        storage: Storage,
        leaderboard: Leaderboard,
        height: u64,
    ) -> Self {
        Self {
            calls,
            api,
            storage,
            leaderboard,
            height,
            retention: SnapshotRetention::default(),
        }
    }

    pub fn with_retention(mut self, retention: SnapshotRetention) -> Self {
        self.retention = retention;
        self
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

impl<Calls: CallSource, API: QueryAPI, Storage: SnapshotStorage> App<Calls, API, Storage> {
    /// Resume from the latest stored snapshot, or start a fresh leaderboard
    /// at height 0 from `genesis` when the store is empty. Events recorded
    /// above the resumed height belong to a call whose snapshot never landed
    /// and are discarded.
    pub fn load(
        calls: Calls,
        api: API,
        mut storage: Storage,
        genesis: impl FnOnce() -> Result<LeaderboardConfig>,
    ) -> Result<Self> {
        let (leaderboard, height) = match storage.latest_snapshot()? {
            Some((leaderboard, height)) => {
                tracing::info!(
                    "resuming leaderboard at height {height} with {} ranked entries",
                    leaderboard.len()
                );
                storage.roll_back_snapshots(height)?;
                (leaderboard, height)
            }
            None => {
                let config = genesis()?;
                tracing::info!(
                    "starting fresh leaderboard owned by {} (minimum score {})",
                    config.owner,
                    config.min_score_to_submit
                );
                let leaderboard = Leaderboard::new(config);
                storage.update_snapshot(&leaderboard, 0)?;
                (leaderboard, 0)
            }
        };
        Ok(Self::new(calls, api, storage, leaderboard, height))
    }

    pub async fn run(&mut self, interrupt: impl Future<Output = ()>) -> Result<RunState> {
        tokio::select! {
            _ = interrupt => {
                tracing::info!("interrupt received at height {}", self.height);
                Ok(RunState::Exit)
            }
            call = self.calls.next_call() => {
                self.handle_call(call?)?;
                Ok(RunState::Continue)
            }
            query = self.api.query() => {
                self.handle_query(query?);
                Ok(RunState::Continue)
            }
        }
    }

    fn handle_call(&mut self, pending: PendingCall) -> Result<()> {
        let PendingCall { call, responder } = pending;
        let caller = call.caller;
        let receipt = call.apply(&mut self.leaderboard, self.height);
        match receipt.status {
            CallStatus::Accepted => {
                self.height = receipt.height;
                tracing::info!(
                    "applied call from {caller} at height {} ({} events)",
                    self.height,
                    receipt.events.len()
                );
                self.storage.record_events(self.height, &receipt.events)?;
                self.storage.update_snapshot(&self.leaderboard, self.height)?;
                self.storage
                    .retain_checkpoints(self.height, &self.retention)?;
            }
            CallStatus::Ignored => {
                tracing::debug!("call from {caller} left the leaderboard unchanged");
            }
            CallStatus::Rejected => {
                tracing::warn!(
                    "rejected call from {caller}: {}",
                    receipt.error.as_deref().unwrap_or("unknown reason")
                );
            }
        }
        if let Some(responder) = responder {
            respond(responder, receipt);
        }
        Ok(())
    }

    fn handle_query(&mut self, query: Query) {
        tracing::debug!("answering query at height {}", self.height);
        let height = self.height;
        match query {
            Query::Leaderboard(sender) => {
                respond(sender, (self.leaderboard.leaderboard().to_vec(), height));
            }
            Query::TopScores(TopScoresQuery { count, sender }) => {
                respond(sender, (self.leaderboard.top_scores(count).to_vec(), height));
            }
            Query::PlayerScore(PlayerQuery { player, sender }) => {
                let score = self.leaderboard.player_score(&player).cloned();
                respond(sender, (score, height));
            }
            Query::PlayerPosition(PlayerQuery { player, sender }) => {
                respond(sender, (self.leaderboard.player_position(&player), height));
            }
            Query::Settings(sender) => {
                let settings = LeaderboardSettings {
                    owner: self.leaderboard.owner(),
                    min_score_to_submit: self.leaderboard.min_score_to_submit(),
                    max_entries: MAX_LEADERBOARD_SIZE,
                    length: self.leaderboard.len(),
                    height,
                };
                respond(sender, settings);
            }
            Query::EventsSince(EventsQuery { since, sender }) => {
                match self.storage.events_since(since) {
                    Ok(events) => respond(sender, (events, height)),
                    Err(err) => {
                        tracing::error!("failed to read events since {since}: {err:#}");
                    }
                }
            }
        }
    }
}

fn respond<T>(sender: oneshot::Sender<T>, value: T) {
    if sender.send(value).is_err() {
        tracing::warn!("responder dropped before the answer was sent");
    }
}

/// Install the global subscriber. `RUST_LOG` selects the filter (default
/// `info`); with `log_dir` a daily rolling file is written as well. Keep the
/// returned guard alive for as long as file logging should flush.
pub fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "leaderboard-node.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init();
    guard
}
