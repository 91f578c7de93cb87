//! FileBackend - one YAML file per entity inside a board directory
//!
//! The backend provides storage primitives plus the [`PipelineBackend`] contract. Writes go
//! through a temp file and a rename so a crashed write never leaves a half-written entity.

use super::PipelineBackend;
use crate::error::{Result, StageboardError};
use crate::registry::StageRegistry;
use crate::types::{Entity, EntityId, StageId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Name of the board directory looked up by [`FileBackend::find`]
pub const BOARD_DIR_NAME: &str = ".stageboard";

/// A logged contact with an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactLog {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// File-backed board storage
#[derive(Debug, Clone)]
pub struct FileBackend {
    /// Path to the board directory
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Locate the board directory by walking up from a starting path
    pub fn find(start: impl AsRef<Path>) -> Result<Self> {
        let mut current = start.as_ref().to_path_buf();

        loop {
            let board_dir = current.join(BOARD_DIR_NAME);
            if board_dir.is_dir() {
                return Ok(Self::new(board_dir));
            }

            if !current.pop() {
                return Err(StageboardError::NotInitialized {
                    path: start.as_ref().to_path_buf(),
                });
            }
        }
    }

    // =========================================================================
    // Path helpers
    // =========================================================================

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entities_dir(&self) -> PathBuf {
        self.root.join("entities")
    }

    pub fn entity_path(&self, id: &EntityId) -> PathBuf {
        self.entities_dir().join(format!("{}.yaml", id))
    }

    pub fn contact_log_path(&self, id: &EntityId) -> PathBuf {
        self.entities_dir().join(format!("{}.jsonl", id))
    }

    // =========================================================================
    // Directory initialization
    // =========================================================================

    pub fn is_initialized(&self) -> bool {
        self.entities_dir().is_dir()
    }

    /// Create the board directory. Fails if a board already exists there.
    pub async fn init(&self) -> Result<()> {
        if self.is_initialized() {
            return Err(StageboardError::AlreadyExists {
                path: self.root.clone(),
            });
        }
        fs::create_dir_all(self.entities_dir()).await?;
        info!(path = %self.root.display(), "initialized board");
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(StageboardError::NotInitialized {
                path: self.root.clone(),
            })
        }
    }

    // =========================================================================
    // Entity I/O
    // =========================================================================

    pub async fn read_entity(&self, id: &EntityId) -> Result<Entity> {
        validate_id(id)?;
        let path = self.entity_path(id);
        if !path.exists() {
            return Err(StageboardError::EntityNotFound { id: id.to_string() });
        }

        let content = fs::read_to_string(&path).await?;
        Ok(serde_yaml_ng::from_str(&content)?)
    }

    pub async fn write_entity(&self, entity: &Entity) -> Result<()> {
        validate_id(&entity.id)?;
        let content = serde_yaml_ng::to_string(entity)?;
        atomic_write(&self.entity_path(&entity.id), content.as_bytes()).await
    }

    /// Store a new entity, refusing to overwrite an existing id
    pub async fn create_entity(&self, entity: &Entity) -> Result<()> {
        self.ensure_initialized()?;
        validate_id(&entity.id)?;
        if self.entity_path(&entity.id).exists() {
            return Err(StageboardError::invalid_value(
                "id",
                format!("entity '{}' already exists", entity.id),
            ));
        }
        self.write_entity(entity).await
    }

    pub async fn list_entity_ids(&self) -> Result<Vec<EntityId>> {
        let dir = self.entities_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("yaml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(EntityId::from_string(stem));
                }
            }
        }

        Ok(ids)
    }

    /// Read every entity, ordered by name then id
    pub async fn read_all_entities(&self) -> Result<Vec<Entity>> {
        let ids = self.list_entity_ids().await?;
        let mut entities = Vec::with_capacity(ids.len());

        for id in ids {
            entities.push(self.read_entity(&id).await?);
        }

        entities.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(entities)
    }

    // =========================================================================
    // Contact log
    // =========================================================================

    /// Append a contact entry for an entity.
    ///
    /// Logging a contact advances an entity still sitting in the registry's first stage to
    /// the second one, the way a server-side trigger would. Returns the entity as stored.
    pub async fn log_contact(
        &self,
        id: &EntityId,
        note: Option<String>,
        registry: &StageRegistry,
    ) -> Result<Entity> {
        let mut entity = self.read_entity(id).await?;

        let entry = ContactLog {
            timestamp: Utc::now(),
            note,
        };
        append_line(&self.contact_log_path(id), &serde_json::to_string(&entry)?).await?;

        let first = &registry.first().id;
        if &entity.stage == first {
            if let Some(second) = registry.stages().get(1) {
                debug!(entity = %id, from = %first, to = %second.id, "contact advanced stage");
                entity.stage = second.id.clone();
                entity.updated_at = Utc::now();
                self.write_entity(&entity).await?;
            }
        }

        Ok(entity)
    }

    /// Contact entries for an entity, newest first
    pub async fn read_contact_log(&self, id: &EntityId) -> Result<Vec<ContactLog>> {
        validate_id(id)?;
        let path = self.contact_log_path(id);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).await?;
        let mut entries = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str::<ContactLog>)
            .collect::<std::result::Result<Vec<ContactLog>, _>>()?;
        entries.reverse();
        Ok(entries)
    }
}

#[async_trait]
impl PipelineBackend for FileBackend {
    async fn fetch_entities(&self) -> Result<Vec<Entity>> {
        self.ensure_initialized()?;
        self.read_all_entities().await
    }

    async fn update_stage(&self, id: &EntityId, stage: &StageId) -> Result<bool> {
        self.ensure_initialized()?;
        let mut entity = match self.read_entity(id).await {
            Ok(entity) => entity,
            Err(StageboardError::EntityNotFound { .. }) => return Ok(false),
            Err(e) => return Err(e),
        };

        entity.stage = stage.clone();
        entity.updated_at = Utc::now();
        self.write_entity(&entity).await?;
        Ok(true)
    }
}

/// Ids become file names, so they must stay a single path component
fn validate_id(id: &EntityId) -> Result<()> {
    let id = id.as_str();
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(StageboardError::invalid_value(
            "id",
            format!("'{}' is not a valid entity id", id),
        ));
    }
    Ok(())
}

/// Atomic write via temp file and rename
async fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content).await?;
    fs::rename(&temp_path, path).await?;

    Ok(())
}

async fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, FileBackend) {
        let temp = TempDir::new().unwrap();
        let backend = FileBackend::new(temp.path().join(BOARD_DIR_NAME));
        backend.init().await.unwrap();
        (temp, backend)
    }

    #[tokio::test]
    async fn test_init_twice_fails() {
        let (_temp, backend) = setup().await;
        assert!(matches!(
            backend.init().await,
            Err(StageboardError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_uninitialized() {
        let temp = TempDir::new().unwrap();
        let backend = FileBackend::new(temp.path().join("nope"));
        assert!(matches!(
            backend.fetch_entities().await,
            Err(StageboardError::NotInitialized { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_and_fetch_sorted_by_name() {
        let (_temp, backend) = setup().await;
        backend
            .create_entity(&Entity::new("Zeta", "Prospect"))
            .await
            .unwrap();
        backend
            .create_entity(&Entity::new("Alpha", "Active"))
            .await
            .unwrap();

        let entities = backend.fetch_entities().await.unwrap();
        let names: Vec<&str> = entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[tokio::test]
    async fn test_create_duplicate_fails() {
        let (_temp, backend) = setup().await;
        let entity = Entity::new("Acme", "Prospect");
        backend.create_entity(&entity).await.unwrap();
        assert!(backend.create_entity(&entity).await.is_err());
    }

    #[tokio::test]
    async fn test_update_stage_persists() {
        let (_temp, backend) = setup().await;
        let entity = Entity::new("Acme", "Prospect");
        backend.create_entity(&entity).await.unwrap();

        let ok = backend
            .update_stage(&entity.id, &"Negotiation".into())
            .await
            .unwrap();
        assert!(ok);

        let stored = backend.read_entity(&entity.id).await.unwrap();
        assert_eq!(stored.stage.as_str(), "Negotiation");
        assert!(stored.updated_at >= entity.updated_at);
        assert!(!backend.entity_path(&entity.id).with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_update_missing_entity_is_failure_not_error() {
        let (_temp, backend) = setup().await;
        let ok = backend
            .update_stage(&"ghost".into(), &"Active".into())
            .await
            .unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_log_contact_advances_first_stage_only() {
        let (_temp, backend) = setup().await;
        let registry = StageRegistry::crm();

        let prospect = Entity::new("Prospecting", "Prospect");
        let active = Entity::new("Already Active", "Active");
        backend.create_entity(&prospect).await.unwrap();
        backend.create_entity(&active).await.unwrap();

        let updated = backend
            .log_contact(&prospect.id, Some("intro call".into()), &registry)
            .await
            .unwrap();
        assert_eq!(updated.stage.as_str(), "Contacted");

        let unchanged = backend
            .log_contact(&active.id, None, &registry)
            .await
            .unwrap();
        assert_eq!(unchanged.stage.as_str(), "Active");

        let log = backend.read_contact_log(&prospect.id).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].note.as_deref(), Some("intro call"));

        // the .jsonl file is not mistaken for an entity
        assert_eq!(backend.list_entity_ids().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_ids_outside_entities_dir_are_rejected() {
        let (temp, backend) = setup().await;
        std::fs::write(temp.path().join("outside.yaml"), "not an entity").unwrap();
        let registry = StageRegistry::crm();

        for bad in ["../../outside", "../outside", "a/b", "a\\b", "..", ""] {
            let id = EntityId::from(bad);
            assert!(matches!(
                backend.read_entity(&id).await,
                Err(StageboardError::InvalidValue { .. })
            ));
            assert!(matches!(
                backend.log_contact(&id, None, &registry).await,
                Err(StageboardError::InvalidValue { .. })
            ));
            assert!(matches!(
                backend.update_stage(&id, &"Active".into()).await,
                Err(StageboardError::InvalidValue { .. })
            ));
            assert!(backend
                .create_entity(&Entity::new("x", "Prospect").with_id(bad))
                .await
                .is_err());
        }

        assert_eq!(
            std::fs::read_to_string(temp.path().join("outside.yaml")).unwrap(),
            "not an entity"
        );
        assert!(!temp.path().join("outside.jsonl").exists());
    }

    #[tokio::test]
    async fn test_find_walks_up() {
        let (temp, _backend) = setup().await;
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = FileBackend::find(&nested).unwrap();
        assert_eq!(found.root(), temp.path().join(BOARD_DIR_NAME));
    }
}
