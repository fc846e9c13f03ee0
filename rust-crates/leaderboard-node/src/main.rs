use anyhow::Context;
use clap::Parser;
use leaderboard::{
    PlayerAddress,
    Score,
};
use leaderboard_node::{
    app::{
        App,
        RunState,
        actix_query_api::ActixQueryApi,
        call_source::ChannelCallSource,
        in_memory_snapshot_storage::InMemorySnapshotStorage,
        init_tracing,
        sled_storage::SledSnapshotStorage,
        snapshot_storage::SnapshotStorage,
    },
    config::NodeConfig,
};
use std::{
    env::current_dir,
    fs,
    path::PathBuf,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON node configuration; command line flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    port: Option<u16>,

    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Owner of a freshly created leaderboard
    #[arg(long)]
    owner: Option<PlayerAddress>,

    /// Minimum score of a freshly created leaderboard
    #[arg(long)]
    min_score: Option<Score>,

    /// Bearer token the admin routes require; admin routes are closed without one
    #[arg(long)]
    admin_token: Option<String>,

    /// Keep state in memory only
    #[arg(long, default_value = "false")]
    in_memory: bool,

    /// Discard persisted state above this height before starting
    #[arg(long)]
    rollback_to: Option<u64>,

    #[arg(short, long, default_value = "false")]
    tracing: bool,

    #[arg(long)]
    log_dir: Option<PathBuf>,
}

async fn handle_interupt() {
    let res = tokio::signal::ctrl_c().await;
    match res {
        Ok(_) => {
            tracing::info!("Received interrupt, exiting");
        }
        Err(_) => {
            tracing::warn!("Received interrupt error, exiting anyway");
        }
    }
}

async fn serve<S: SnapshotStorage>(
    mut storage: S,
    config: &NodeConfig,
    rollback_to: Option<u64>,
) -> anyhow::Result<()> {
    if let Some(height) = rollback_to {
        tracing::info!("Rolling back persisted state to height {height}");
        storage.roll_back_snapshots(height)?;
    }
    let (calls, call_sender) = ChannelCallSource::new_with_sender();
    let api = ActixQueryApi::new(config.port, config.admin_token.clone(), call_sender).await?;
    let mut app = App::load(calls, api, storage, || config.genesis())?;

    tracing::info!("Starting leaderboard node at height {}", app.height());
    loop {
        let interrupt = handle_interupt();
        match app.run(interrupt).await? {
            RunState::Continue => continue,
            RunState::Exit => {
                tracing::info!("Exiting leaderboard node");
                return Ok(());
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = if args.tracing {
        init_tracing(args.log_dir.as_deref())
    } else {
        None
    };

    let file_config = match &args.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };
    let config = file_config.merge(
        args.port,
        args.data_dir,
        args.owner,
        args.min_score,
        args.admin_token,
    );

    if args.in_memory {
        tracing::info!("Using in-memory storage");
        return serve(InMemorySnapshotStorage::new(), &config, args.rollback_to).await;
    }

    let storage_path = match &config.data_dir {
        Some(path) => path.clone(),
        None => current_dir()
            .context("determine process working directory")?
            .join("leaderboard_data"),
    };
    fs::create_dir_all(&storage_path)
        .with_context(|| format!("create data directory {}", storage_path.display()))?;
    tracing::info!("Using sled storage directory: {}", storage_path.display());
    let storage = SledSnapshotStorage::open(&storage_path)?;
    serve(storage, &config, args.rollback_to).await
}
