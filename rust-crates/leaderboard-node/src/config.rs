use anyhow::{
    Context,
    anyhow,
};
use leaderboard::{
    DEFAULT_MIN_SCORE_TO_SUBMIT,
    LeaderboardConfig,
    PlayerAddress,
    Score,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

/// On-disk node configuration. Every field is optional so command line
/// flags can fill in or override whatever the file leaves out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub leaderboard: Option<LeaderboardSection>,
    /// Bearer token required by the admin HTTP routes
    #[serde(default)]
    pub admin_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardSection {
    #[serde(default)]
    pub owner: Option<PlayerAddress>,
    #[serde(default)]
    pub min_score_to_submit: Option<Score>,
}

impl NodeConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read node config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parse node config {}", path.display()))
    }

    /// Overlay command line values on top of the file values.
    pub fn merge(
        mut self,
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        owner: Option<PlayerAddress>,
        min_score_to_submit: Option<Score>,
        admin_token: Option<String>,
    ) -> Self {
        self.port = port.or(self.port);
        self.data_dir = data_dir.or(self.data_dir);
        self.admin_token = admin_token.or(self.admin_token);
        if owner.is_some() || min_score_to_submit.is_some() {
            let section = self.leaderboard.get_or_insert_with(Default::default);
            section.owner = owner.or(section.owner);
            section.min_score_to_submit =
                min_score_to_submit.or(section.min_score_to_submit);
        }
        self
    }

    /// Settings for a leaderboard created from scratch.
    pub fn genesis(&self) -> crate::Result<LeaderboardConfig> {
        let section = self.leaderboard.clone().unwrap_or_default();
        let owner = section.owner.ok_or_else(|| {
            anyhow!("no leaderboard owner configured; pass --owner or set leaderboard.owner")
        })?;
        let min_score_to_submit = section
            .min_score_to_submit
            .unwrap_or(DEFAULT_MIN_SCORE_TO_SUBMIT);
        Ok(LeaderboardConfig::new(owner).with_min_score_to_submit(min_score_to_submit))
    }
}
