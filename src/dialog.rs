//! Dialog engine client
//!
//! Talks to a Watson-Assistant-v1 compatible service. Each turn is a
//! `POST /v1/workspaces/{id}/message` carrying the text and the context;
//! the reply comes back with output text segments and the updated context.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::config::ServiceCredentials;
use crate::error::AssistantError;
use crate::models::{Context, Reply};
use crate::Result;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSummary {
    pub workspace_id: String,
    #[serde(default)]
    pub name: String,
}

/// Black-box conversational service keyed by workspace id
#[async_trait::async_trait]
pub trait DialogEngine: Send + Sync {
    async fn send_turn(&self, workspace_id: &str, text: &str, context: &Context) -> Result<Reply>;

    async fn list_workspaces(&self) -> Result<Vec<WorkspaceSummary>>;

    async fn get_workspace(&self, workspace_id: &str) -> Result<WorkspaceSummary>;

    async fn create_workspace(&self, definition: &Value) -> Result<WorkspaceSummary>;
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    input: MessageInput<'a>,
    context: &'a Context,
}

#[derive(Debug, Serialize)]
struct MessageInput<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct WorkspaceList {
    #[serde(default)]
    workspaces: Vec<WorkspaceSummary>,
}

/// Reusable assistant client (connection-pooled)
pub struct AssistantClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    version: String,
}

impl AssistantClient {
    pub fn new(credentials: &ServiceCredentials, version: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            base_url: credentials.url.trim_end_matches('/').to_string(),
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            version: version.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self
            .client
            .request(method, self.endpoint(path))
            .query(&[("version", self.version.as_str())])
            .basic_auth(&self.username, Some(&self.password));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            error!("Assistant request failed: {}", e);
            AssistantError::upstream(
                e.status().map(|s| s.as_u16()),
                format!("Assistant request failed: {}", e),
            )
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Assistant error response: {}", error_text);
            return Err(AssistantError::upstream(
                Some(status.as_u16()),
                format!("Assistant error: {}", error_text),
            ));
        }

        response.json::<T>().await.map_err(|e| {
            error!("Failed to parse assistant response: {}", e);
            AssistantError::upstream(None, format!("Assistant parse error: {}", e))
        })
    }
}

#[async_trait::async_trait]
impl DialogEngine for AssistantClient {
    async fn send_turn(&self, workspace_id: &str, text: &str, context: &Context) -> Result<Reply> {
        debug!(workspace_id, "Calling assistant message API");

        let request = MessageRequest {
            input: MessageInput { text },
            context,
        };
        self.call(
            Method::POST,
            &format!("workspaces/{}/message", workspace_id),
            Some(&request),
        )
        .await
    }

    async fn list_workspaces(&self) -> Result<Vec<WorkspaceSummary>> {
        let list: WorkspaceList = self
            .call::<Value, _>(Method::GET, "workspaces", None)
            .await?;
        Ok(list.workspaces)
    }

    async fn get_workspace(&self, workspace_id: &str) -> Result<WorkspaceSummary> {
        self.call::<Value, _>(Method::GET, &format!("workspaces/{}", workspace_id), None)
            .await
    }

    async fn create_workspace(&self, definition: &Value) -> Result<WorkspaceSummary> {
        self.call(Method::POST, "workspaces", Some(definition)).await
    }
}
