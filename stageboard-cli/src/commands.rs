//! Command handlers
//!
//! Every command opens the board directory, loads its configuration and works through
//! [`PipelineBoard`], so the CLI goes through the same transition path as any other view.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Table};
use stageboard::{
    Entity, EntityId, FileBackend, NotificationEvent, NotificationKind, PipelineBoard, Priority,
    Profile, StageId, StageboardConfig, TransitionOutcome, BOARD_DIR_NAME,
};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Resolve the board directory: an explicit path, or the nearest one above `cwd`
pub fn resolve_backend(board: Option<&Path>, cwd: &Path) -> Result<FileBackend> {
    let backend = match board {
        Some(path) => FileBackend::new(path),
        None => FileBackend::find(cwd).context("no board found, run `stageboard init` first")?,
    };
    debug!(path = %backend.root().display(), explicit = board.is_some(), "resolved board");
    Ok(backend)
}

async fn open_board(backend: FileBackend) -> Result<(Arc<FileBackend>, PipelineBoard)> {
    let config = StageboardConfig::load(backend.root())?;
    let backend = Arc::new(backend);
    let board = PipelineBoard::new(backend.clone(), &config)?;
    let loaded = board.load().await?;
    debug!(entities = loaded, stages = board.registry().len(), "opened board");
    Ok((backend, board))
}

pub async fn init(board: Option<PathBuf>, cwd: &Path) -> Result<()> {
    let backend = FileBackend::new(board.unwrap_or_else(|| cwd.join(BOARD_DIR_NAME)));
    backend.init().await?;
    println!("Initialized board at {}", backend.root().display());
    Ok(())
}

pub async fn stages(backend: FileBackend, from: Option<String>) -> Result<()> {
    let config = StageboardConfig::load(backend.root())?;
    let registry = config.registry()?;

    let ids: Vec<StageId> = match from {
        Some(from) => {
            let from = StageId::from(from);
            if !registry.contains(&from) {
                bail!("unknown stage '{}'", from);
            }
            registry.next_available_stages(&from)
        }
        None => registry.stage_ids().cloned().collect(),
    };

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Stage", "Label", "Color"]);
    for id in &ids {
        if let Some(meta) = registry.meta(id) {
            let color = format!("#{}", meta.color);
            table.add_row(vec![meta.id.as_str(), meta.label.as_str(), color.as_str()]);
        }
    }
    println!("{table}");
    Ok(())
}

pub struct NewEntity {
    pub name: String,
    pub stage: Option<String>,
    pub priority: String,
    pub email: Option<String>,
    pub telegram: Option<String>,
}

pub async fn add(backend: FileBackend, new: NewEntity) -> Result<()> {
    let config = StageboardConfig::load(backend.root())?;
    let registry = config.registry()?;

    let stage = match new.stage {
        Some(stage) => StageId::from(stage),
        None => registry.first().id.clone(),
    };
    if !registry.contains(&stage) {
        bail!("unknown stage '{}'", stage);
    }
    let priority: Priority = new.priority.parse()?;

    let entity = Entity::new(new.name, stage)
        .with_priority(priority)
        .with_profile(Profile {
            email: new.email,
            telegram: new.telegram,
            ..Profile::default()
        });
    backend.create_entity(&entity).await?;
    info!(entity = %entity.id, stage = %entity.stage, "entity added");

    println!("{}", entity.id);
    Ok(())
}

pub async fn show(backend: FileBackend, json: bool) -> Result<()> {
    let (_backend, board) = open_board(backend).await?;
    let columns = board.columns().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&columns)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Stage", "Id", "Name", "Priority"]);
    for column in &columns.columns {
        let heading = format!("{} ({})", column.stage.label, column.entities.len());
        if column.entities.is_empty() {
            table.add_row(vec![heading.as_str(), "", "", ""]);
        }
        for (i, entity) in column.entities.iter().enumerate() {
            let stage = if i == 0 { heading.as_str() } else { "" };
            table.add_row(vec![
                stage,
                entity.id.as_str(),
                entity.name.as_str(),
                entity.priority.as_str(),
            ]);
        }
    }
    for entity in &columns.unassigned {
        table.add_row(vec![
            entity.stage.as_str(),
            entity.id.as_str(),
            entity.name.as_str(),
            entity.priority.as_str(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub async fn move_entity(backend: FileBackend, id: String, stage: String) -> Result<()> {
    let (_backend, board) = open_board(backend).await?;
    let mut events = board.subscribe();

    let id = EntityId::from(id);
    let outcome = board.move_entity(&id, &StageId::from(stage)).await?;
    print_notifications(&mut events);
    debug!(entity = %id, ?outcome, "move finished");

    match outcome {
        TransitionOutcome::Confirmed(_) | TransitionOutcome::Ignored => Ok(()),
        TransitionOutcome::RolledBack { reason, .. } => bail!("transition rolled back: {reason}"),
        TransitionOutcome::Unresolved(id) => bail!("entity '{id}' not found"),
        other => bail!("transition did not complete: {other:?}"),
    }
}

pub async fn contact(backend: FileBackend, id: String, note: Option<String>) -> Result<()> {
    let (backend, board) = open_board(backend).await?;
    let id = EntityId::from(id);

    backend.log_contact(&id, note, board.registry()).await?;
    board.refresh().await?;

    match board.entity(&id).await {
        Some(entity) => {
            println!(
                "Logged contact with {} ({})",
                entity.name,
                board.registry().label(&entity.stage)
            );
            Ok(())
        }
        None => bail!("entity '{id}' not found"),
    }
}

fn print_notifications(events: &mut broadcast::Receiver<NotificationEvent>) {
    while let Ok(event) = events.try_recv() {
        if let NotificationEvent::Shown(notification) = event {
            let tag = match notification.kind {
                NotificationKind::Loading => "...",
                NotificationKind::Success => "ok",
                NotificationKind::Error => "error",
            };
            println!("[{tag}] {}", notification.message);
        }
    }
}
