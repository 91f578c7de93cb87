//! Entity types: Entity, Priority, Profile

use super::ids::{EntityId, StageId};
use crate::error::StageboardError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A record on the board. Only `stage` is touched by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub stage: StageId,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, flatten)]
    pub profile: Profile,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    /// Create a new entity in the given stage
    pub fn new(name: impl Into<String>, stage: impl Into<StageId>) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            name: name.into(),
            stage: stage.into(),
            priority: Priority::default(),
            profile: Profile::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the generated id
    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Copy of this entity sitting in another stage
    pub fn in_stage(&self, stage: &StageId) -> Self {
        Self {
            stage: stage.clone(),
            ..self.clone()
        }
    }
}

/// Classification attribute, independent of the stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Badge color (6-char hex without `#`)
    pub fn color(&self) -> &'static str {
        match self {
            Self::High => "d73a4a",
            Self::Medium => "e36209",
            Self::Low => "0e8a16",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = StageboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(StageboardError::invalid_value(
                "priority",
                format!("expected High, Medium or Low, got '{}'", other),
            )),
        }
    }
}

/// Contact and profile payload carried along with an entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_type: Option<String>,
}
