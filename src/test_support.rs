//! Test doubles shared by module tests

use crate::data::AccountDataProvider;
use crate::dialog::{DialogEngine, WorkspaceSummary};
use crate::directions::DistanceService;
use crate::error::AssistantError;
use crate::models::{
    Account, Branch, Context, FaceAttributes, Output, Profile, Reply, TransactionSummary,
};
use crate::vision::FaceClassifier;
use crate::Result;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Build a reply from output segments and a raw JSON context.
pub(crate) fn reply(texts: &[&str], context: Value) -> Reply {
    Reply {
        output: Output {
            text: texts.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        },
        context: serde_json::from_value(context).unwrap(),
        ..Default::default()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedTurn {
    pub workspace_id: String,
    pub text: String,
    pub context: Context,
}

/// Dialog engine that plays back queued replies. When the queue is empty
/// it echoes the request context back with a single "ok" segment.
pub(crate) struct ScriptedDialog {
    replies: Mutex<VecDeque<std::result::Result<Reply, u16>>>,
    turns: Mutex<Vec<RecordedTurn>>,
    workspaces: Vec<WorkspaceSummary>,
    created: Mutex<Vec<Value>>,
}

impl ScriptedDialog {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            turns: Mutex::new(Vec::new()),
            workspaces: Vec::new(),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn with_workspaces(mut self, workspaces: Vec<WorkspaceSummary>) -> Self {
        self.workspaces = workspaces;
        self
    }

    pub fn with_reply(self, reply: Reply) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply));
        self
    }

    pub fn with_failure(self, status: u16) -> Self {
        self.replies.lock().unwrap().push_back(Err(status));
        self
    }

    pub fn turns(&self) -> Vec<RecordedTurn> {
        self.turns.lock().unwrap().clone()
    }

    pub fn created_definitions(&self) -> Vec<Value> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DialogEngine for ScriptedDialog {
    async fn send_turn(&self, workspace_id: &str, text: &str, context: &Context) -> Result<Reply> {
        self.turns.lock().unwrap().push(RecordedTurn {
            workspace_id: workspace_id.to_string(),
            text: text.to_string(),
            context: context.clone(),
        });

        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(status)) => Err(AssistantError::upstream(Some(status), "scripted failure")),
            None => Ok(Reply {
                output: Output {
                    text: vec!["ok".to_string()],
                    ..Default::default()
                },
                context: context.clone(),
                ..Default::default()
            }),
        }
    }

    async fn list_workspaces(&self) -> Result<Vec<WorkspaceSummary>> {
        Ok(self.workspaces.clone())
    }

    async fn get_workspace(&self, workspace_id: &str) -> Result<WorkspaceSummary> {
        Ok(WorkspaceSummary {
            workspace_id: workspace_id.to_string(),
            name: String::new(),
        })
    }

    async fn create_workspace(&self, definition: &Value) -> Result<WorkspaceSummary> {
        self.created.lock().unwrap().push(definition.clone());
        let name = definition
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(WorkspaceSummary {
            workspace_id: format!("created-{}", name),
            name,
        })
    }
}

/// Distance service that records every call.
pub(crate) struct RecordingDistances {
    meters: Option<Option<u64>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingDistances {
    pub fn new(meters: Option<u64>) -> Self {
        Self {
            meters: Some(meters),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            meters: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DistanceService for RecordingDistances {
    async fn distance_meters(&self, origin: &str, destination: &str) -> Result<Option<u64>> {
        self.calls
            .lock()
            .unwrap()
            .push((origin.to_string(), destination.to_string()));
        self.meters
            .ok_or_else(|| AssistantError::upstream(Some(502), "distance service down"))
    }
}

/// Classifier returning a fixed answer; records the image path and whether
/// the file existed at call time.
pub(crate) struct StubClassifier {
    face: Option<FaceAttributes>,
    fail: bool,
    seen: Mutex<Vec<(PathBuf, bool)>>,
}

impl StubClassifier {
    pub fn returning(face: Option<FaceAttributes>) -> Self {
        Self {
            face,
            fail: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            face: None,
            fail: true,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<(PathBuf, bool)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl FaceClassifier for StubClassifier {
    async fn classify_face(&self, image: &Path) -> Result<Option<FaceAttributes>> {
        self.seen
            .lock()
            .unwrap()
            .push((image.to_path_buf(), image.exists()));
        if self.fail {
            return Err(AssistantError::upstream(Some(503), "classifier unavailable"));
        }
        Ok(self.face.clone())
    }
}

/// Provider whose every call fails with the given status.
pub(crate) struct FailingData {
    pub status: u16,
}

impl FailingData {
    fn error(&self) -> AssistantError {
        AssistantError::upstream(Some(self.status), "data provider unavailable")
    }
}

#[async_trait::async_trait]
impl AccountDataProvider for FailingData {
    async fn get_profile(&self, _customer_id: u64) -> Result<Profile> {
        Err(self.error())
    }

    async fn get_accounts(&self, _customer_id: u64, _t: Option<&str>) -> Result<Vec<Account>> {
        Err(self.error())
    }

    async fn get_transactions(
        &self,
        _customer_id: u64,
        _category: Option<&str>,
    ) -> Result<TransactionSummary> {
        Err(self.error())
    }

    async fn get_branch(&self, _location: &str) -> Result<Option<Branch>> {
        Err(self.error())
    }

    async fn list_branches(&self) -> Result<Vec<Branch>> {
        Err(self.error())
    }
}
