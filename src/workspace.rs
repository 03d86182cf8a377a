//! Dialog workspace lifecycle
//!
//! The workspace id is resolved once, in the background, after the server
//! starts. Until then turns are answered with "not ready"; a failed setup
//! refuses every later turn.

use crate::dialog::DialogEngine;
use crate::error::AssistantError;
use crate::Result;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq)]
enum Resolved {
    Ready(String),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceStatus<'a> {
    Pending,
    Ready(&'a str),
    Failed(&'a str),
}

/// Shared, set-once workspace handle
#[derive(Debug, Clone, Default)]
pub struct WorkspaceHandle {
    state: Arc<OnceLock<Resolved>>,
}

impl WorkspaceHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that is already ready, for callers that know the id up front.
    pub fn ready(workspace_id: impl Into<String>) -> Self {
        let handle = Self::new();
        handle.resolve(workspace_id);
        handle
    }

    pub fn status(&self) -> WorkspaceStatus<'_> {
        match self.state.get() {
            None => WorkspaceStatus::Pending,
            Some(Resolved::Ready(id)) => WorkspaceStatus::Ready(id),
            Some(Resolved::Failed(reason)) => WorkspaceStatus::Failed(reason),
        }
    }

    /// Returns false if the handle was already resolved.
    pub fn resolve(&self, workspace_id: impl Into<String>) -> bool {
        self.state.set(Resolved::Ready(workspace_id.into())).is_ok()
    }

    /// Returns false if the handle was already resolved.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.state.set(Resolved::Failed(reason.into())).is_ok()
    }

    /// Workspace id, or the error a turn must short-circuit with.
    pub fn require_ready(&self) -> Result<&str> {
        match self.status() {
            WorkspaceStatus::Ready(id) => Ok(id),
            WorkspaceStatus::Pending => Err(AssistantError::NotReady),
            WorkspaceStatus::Failed(reason) => Err(AssistantError::Setup(reason.to_string())),
        }
    }
}

/// How to find or create the workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceSetup {
    pub workspace_id: Option<String>,
    pub name: String,
    pub definition_path: PathBuf,
}

/// Resolve the workspace id: explicit id, then lookup by name, then create
/// from the definition file.
pub async fn setup_workspace(engine: &dyn DialogEngine, setup: &WorkspaceSetup) -> Result<String> {
    if let Some(id) = &setup.workspace_id {
        let workspace = engine.get_workspace(id).await.map_err(|e| {
            AssistantError::Setup(format!("Configured workspace {} is unavailable: {}", id, e))
        })?;
        return Ok(workspace.workspace_id);
    }

    let existing = engine
        .list_workspaces()
        .await
        .map_err(|e| AssistantError::Setup(format!("Failed to list workspaces: {}", e)))?;
    if let Some(found) = existing.into_iter().find(|w| w.name == setup.name) {
        info!(workspace_id = %found.workspace_id, "Using existing workspace");
        return Ok(found.workspace_id);
    }

    if !setup.definition_path.exists() {
        return Err(AssistantError::Setup(format!(
            "No workspace named {} and no definition at {}",
            setup.name,
            setup.definition_path.display()
        )));
    }

    let raw = tokio::fs::read_to_string(&setup.definition_path).await?;
    let mut definition: Value = serde_json::from_str(&raw)
        .map_err(|e| AssistantError::Setup(format!("Invalid workspace definition: {}", e)))?;
    if let Some(obj) = definition.as_object_mut() {
        obj.insert("name".to_string(), Value::String(setup.name.clone()));
    }

    let created = engine
        .create_workspace(&definition)
        .await
        .map_err(|e| AssistantError::Setup(format!("Failed to create workspace: {}", e)))?;
    info!(workspace_id = %created.workspace_id, "Created workspace");
    Ok(created.workspace_id)
}

/// Run setup and record the outcome on the handle.
pub async fn initialize(
    handle: WorkspaceHandle,
    engine: Arc<dyn DialogEngine>,
    setup: WorkspaceSetup,
) {
    match setup_workspace(engine.as_ref(), &setup).await {
        Ok(id) => {
            info!(workspace_id = %id, "Assistant is ready");
            handle.resolve(id);
        }
        Err(e) => {
            let reason = match e {
                AssistantError::Setup(reason) => reason,
                other => other.to_string(),
            };
            error!(
                "The app failed to initialize properly. Setup and restart needed. {}",
                reason
            );
            handle.fail(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::WorkspaceSummary;
    use crate::test_support::ScriptedDialog;

    fn setup(workspace_id: Option<&str>, path: PathBuf) -> WorkspaceSetup {
        WorkspaceSetup {
            workspace_id: workspace_id.map(str::to_string),
            name: "banking".into(),
            definition_path: path,
        }
    }

    #[test]
    fn test_handle_transitions_once() {
        let handle = WorkspaceHandle::new();
        assert_eq!(handle.status(), WorkspaceStatus::Pending);
        assert!(matches!(handle.require_ready(), Err(AssistantError::NotReady)));

        assert!(handle.resolve("w1"));
        assert!(!handle.fail("late failure"));
        assert_eq!(handle.require_ready().unwrap(), "w1");

        let clone = handle.clone();
        assert_eq!(clone.status(), WorkspaceStatus::Ready("w1"));
    }

    #[test]
    fn test_failed_handle_reports_setup_error() {
        let handle = WorkspaceHandle::new();
        handle.fail("bad credentials");
        match handle.require_ready() {
            Err(AssistantError::Setup(reason)) => assert_eq!(reason, "bad credentials"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_setup_prefers_configured_id() {
        let engine = ScriptedDialog::new();
        let id = setup_workspace(&engine, &setup(Some("w-conf"), PathBuf::from("/nonexistent")))
            .await
            .unwrap();
        assert_eq!(id, "w-conf");
    }

    #[tokio::test]
    async fn test_setup_finds_by_name() {
        let engine = ScriptedDialog::new().with_workspaces(vec![
            WorkspaceSummary {
                workspace_id: "w-other".into(),
                name: "other".into(),
            },
            WorkspaceSummary {
                workspace_id: "w-bank".into(),
                name: "banking".into(),
            },
        ]);

        let id = setup_workspace(&engine, &setup(None, PathBuf::from("/nonexistent")))
            .await
            .unwrap();
        assert_eq!(id, "w-bank");
    }

    #[tokio::test]
    async fn test_setup_creates_from_definition() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banking.json");
        std::fs::write(&path, r#"{ "name": "draft", "intents": [] }"#).unwrap();

        let engine = ScriptedDialog::new();
        let id = setup_workspace(&engine, &setup(None, path)).await.unwrap();

        assert_eq!(id, "created-banking");
        let created = engine.created_definitions();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0]["name"], "banking");
    }

    #[tokio::test]
    async fn test_initialize_records_failure() {
        let handle = WorkspaceHandle::new();
        let engine: Arc<dyn DialogEngine> = Arc::new(ScriptedDialog::new());

        initialize(
            handle.clone(),
            engine,
            setup(None, PathBuf::from("/nonexistent/banking.json")),
        )
        .await;

        assert!(matches!(handle.status(), WorkspaceStatus::Failed(_)));
    }
}
