//! Board configuration loaded with Figment
//!
//! Sources, later ones overriding earlier ones:
//! 1. Built-in defaults
//! 2. `stageboard.toml`, `stageboard.yaml`, `stageboard.json` in the board directory
//! 3. Environment variables prefixed `STAGEBOARD_` (e.g. `STAGEBOARD_REFRESH_DELAY_MS=1000`)

use crate::error::Result;
use crate::notify::DEFAULT_CAPACITY;
use crate::registry::{StageMeta, StageRegistry};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "STAGEBOARD_";

/// Base name of configuration files inside the board directory
pub const CONFIG_FILE_STEM: &str = "stageboard";

/// What to do with a drag of an entity whose previous transition has not settled yet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrentDragPolicy {
    /// Refuse the new drag while one is in flight
    #[default]
    Reject,
    /// The new drag replaces the pending one; the older settlement is ignored
    Supersede,
}

/// One stage as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// 6-char hex color without `#`; auto-assigned when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl From<&StageMeta> for StageConfig {
    fn from(meta: &StageMeta) -> Self {
        Self {
            id: meta.id.to_string(),
            label: Some(meta.label.clone()),
            color: Some(meta.color.clone()),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageboardConfig {
    /// Stages in display order
    pub stages: Vec<StageConfig>,
    /// Pause between a confirmed update and the refetch that follows it
    pub refresh_delay_ms: u64,
    pub concurrent_drags: ConcurrentDragPolicy,
    /// Also refetch from the backend after a rollback
    pub refresh_on_failure: bool,
    /// Buffer size of the notification channel
    pub notification_capacity: usize,
}

impl Default for StageboardConfig {
    fn default() -> Self {
        Self {
            stages: StageRegistry::crm()
                .stages()
                .iter()
                .map(StageConfig::from)
                .collect(),
            refresh_delay_ms: 0,
            concurrent_drags: ConcurrentDragPolicy::default(),
            refresh_on_failure: false,
            notification_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl StageboardConfig {
    /// Load configuration for a board directory from every source
    pub fn load(board_dir: impl AsRef<Path>) -> Result<Self> {
        let config: Self = Self::figment(board_dir.as_ref()).extract()?;
        debug!(
            stages = config.stages.len(),
            policy = ?config.concurrent_drags,
            "loaded board configuration"
        );
        Ok(config)
    }

    /// Build the figment with all sources in precedence order
    pub fn figment(board_dir: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let toml = board_dir.join(format!("{CONFIG_FILE_STEM}.toml"));
        let yaml = board_dir.join(format!("{CONFIG_FILE_STEM}.yaml"));
        let json = board_dir.join(format!("{CONFIG_FILE_STEM}.json"));

        if toml.exists() {
            trace!(path = %toml.display(), "loading config file");
            figment = figment.merge(Toml::file(toml));
        }
        if yaml.exists() {
            trace!(path = %yaml.display(), "loading config file");
            figment = figment.merge(Yaml::file(yaml));
        }
        if json.exists() {
            trace!(path = %json.display(), "loading config file");
            figment = figment.merge(Json::file(json));
        }

        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Build the stage registry described by this configuration
    pub fn registry(&self) -> Result<StageRegistry> {
        let stages = self
            .stages
            .iter()
            .map(|stage| {
                let mut meta = StageMeta::new(stage.id.as_str());
                if let Some(label) = &stage.label {
                    meta = meta.with_label(label.as_str());
                }
                if let Some(color) = &stage.color {
                    meta = meta.with_color(color.as_str());
                }
                meta
            })
            .collect();
        StageRegistry::new(stages)
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }

    pub fn with_stages<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stages = ids
            .into_iter()
            .map(|id| StageConfig {
                id: id.into(),
                label: None,
                color: None,
            })
            .collect();
        self
    }

    pub fn with_policy(mut self, policy: ConcurrentDragPolicy) -> Self {
        self.concurrent_drags = policy;
        self
    }

    pub fn with_refresh_delay_ms(mut self, ms: u64) -> Self {
        self.refresh_delay_ms = ms;
        self
    }

    pub fn with_refresh_on_failure(mut self, enabled: bool) -> Self {
        self.refresh_on_failure = enabled;
        self
    }
}
