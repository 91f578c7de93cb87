//! The ordered, finite set of stages a board is made of.
//!
//! Order is display order only: any stage may transition to any other stage.

use crate::error::{Result, StageboardError};
use crate::types::StageId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Palette used for stages configured without an explicit color (6-char hex without `#`).
const PALETTE: &[&str] = &[
    "1d76db", // blue
    "5319e7", // purple
    "f9c513", // yellow
    "e36209", // orange
    "0e8a16", // green
    "6a737d", // gray
    "d73a4a", // red
    "006b75", // teal
    "d876e3", // pink
    "008672", // sea green
];

/// Display metadata for a single stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMeta {
    pub id: StageId,
    pub label: String,
    pub color: String,
}

impl StageMeta {
    /// Stage labelled with its own id and an auto-assigned color
    pub fn new(id: impl Into<StageId>) -> Self {
        let id = id.into();
        Self {
            label: id.to_string(),
            color: auto_color(id.as_str()).to_string(),
            id,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }
}

/// Ordered stage list with lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRegistry {
    stages: Vec<StageMeta>,
}

impl StageRegistry {
    /// Build a registry, rejecting empty lists, blank ids and duplicates
    pub fn new(stages: Vec<StageMeta>) -> Result<Self> {
        if stages.is_empty() {
            return Err(StageboardError::EmptyRegistry);
        }

        let mut seen = HashSet::new();
        for stage in &stages {
            if stage.id.as_str().trim().is_empty() {
                return Err(StageboardError::invalid_value(
                    "stage",
                    "stage id must not be empty",
                ));
            }
            if !seen.insert(stage.id.clone()) {
                return Err(StageboardError::DuplicateStage {
                    id: stage.id.to_string(),
                });
            }
        }

        Ok(Self { stages })
    }

    /// Build a registry from bare ids
    pub fn from_ids<I, S>(ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<StageId>,
    {
        Self::new(ids.into_iter().map(StageMeta::new).collect())
    }

    /// The six-stage CRM pipeline boards ship with
    pub fn crm() -> Self {
        let stages = [
            ("Prospect", "1d76db"),
            ("Contacted", "5319e7"),
            ("Follow-up", "f9c513"),
            ("Negotiation", "e36209"),
            ("Active", "0e8a16"),
            ("Inactive", "6a737d"),
        ]
        .into_iter()
        .map(|(id, color)| StageMeta::new(id).with_color(color))
        .collect();

        Self { stages }
    }

    pub fn stages(&self) -> &[StageMeta] {
        &self.stages
    }

    pub fn stage_ids(&self) -> impl Iterator<Item = &StageId> {
        self.stages.iter().map(|s| &s.id)
    }

    /// The first stage in display order
    pub fn first(&self) -> &StageMeta {
        // Non-empty by construction
        &self.stages[0]
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn contains(&self, stage: &StageId) -> bool {
        self.position(stage).is_some()
    }

    /// Display position of a stage
    pub fn position(&self, stage: &StageId) -> Option<usize> {
        self.stages.iter().position(|s| &s.id == stage)
    }

    pub fn meta(&self, stage: &StageId) -> Option<&StageMeta> {
        self.stages.iter().find(|s| &s.id == stage)
    }

    /// Label for a stage, falling back to the raw id for stages outside the registry
    pub fn label<'a>(&'a self, stage: &'a StageId) -> &'a str {
        self.meta(stage).map(|m| m.label.as_str()).unwrap_or(stage.as_str())
    }

    /// Every stage except `current`, in display order.
    ///
    /// An unknown `current` yields the full list.
    pub fn next_available_stages(&self, current: &StageId) -> Vec<StageId> {
        self.stage_ids().filter(|s| *s != current).cloned().collect()
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::crm()
    }
}

/// Deterministic palette color for a stage id (FNV-1a over the bytes).
fn auto_color(id: &str) -> &'static str {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in id.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    PALETTE[(hash as usize) % PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crm_stages_in_order() {
        let registry = StageRegistry::crm();
        let ids: Vec<&str> = registry.stage_ids().map(|s| s.as_str()).collect();
        assert_eq!(
            ids,
            vec!["Prospect", "Contacted", "Follow-up", "Negotiation", "Active", "Inactive"]
        );
        assert_eq!(registry.first().id.as_str(), "Prospect");
    }

    #[test]
    fn test_next_available_stages_is_any_to_any() {
        let registry = StageRegistry::crm();
        for stage in registry.stage_ids() {
            let next = registry.next_available_stages(stage);
            assert_eq!(next.len(), registry.len() - 1);
            assert!(!next.contains(stage));

            let unique: HashSet<_> = next.iter().collect();
            assert_eq!(unique.len(), next.len(), "duplicates from {}", stage);

            for other in registry.stage_ids().filter(|s| *s != stage) {
                assert!(next.contains(other), "{} missing from {}", other, stage);
            }
        }
    }

    #[test]
    fn test_next_available_stages_preserves_display_order() {
        let registry = StageRegistry::from_ids(["Prospect", "Contacted", "Active"]).unwrap();
        let next = registry.next_available_stages(&StageId::from("Contacted"));
        assert_eq!(next, vec![StageId::from("Prospect"), StageId::from("Active")]);
    }

    #[test]
    fn test_next_available_stages_unknown_current() {
        let registry = StageRegistry::from_ids(["A", "B"]).unwrap();
        assert_eq!(registry.next_available_stages(&StageId::from("Z")).len(), 2);
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert!(matches!(
            StageRegistry::from_ids(["A", "B", "A"]),
            Err(StageboardError::DuplicateStage { id }) if id == "A"
        ));
        assert!(matches!(
            StageRegistry::from_ids(Vec::<String>::new()),
            Err(StageboardError::EmptyRegistry)
        ));
        assert!(StageRegistry::from_ids(["A", " "]).is_err());
    }

    #[test]
    fn test_stage_metadata() {
        let registry = StageRegistry::new(vec![
            StageMeta::new("lead").with_label("Lead"),
            StageMeta::new("won").with_color("00ff00"),
        ])
        .unwrap();

        assert_eq!(registry.label(&StageId::from("lead")), "Lead");
        assert_eq!(registry.label(&StageId::from("missing")), "missing");
        assert_eq!(registry.meta(&StageId::from("won")).unwrap().color, "00ff00");
        assert_eq!(registry.position(&StageId::from("won")), Some(1));
    }

    #[test]
    fn test_auto_color_deterministic() {
        let a = StageMeta::new("Discovery");
        let b = StageMeta::new("Discovery");
        assert_eq!(a.color, b.color);
        assert_eq!(a.color.len(), 6);
        assert!(PALETTE.contains(&a.color.as_str()));
    }
}
