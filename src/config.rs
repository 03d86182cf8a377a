//! Application configuration
//!
//! Built from environment variables (after `.env` is loaded by the binary).
//! Bound-service credentials in `VCAP_SERVICES` fill in whatever the plain
//! variables leave unset.

use crate::data::DEMO_CUSTOMER_ID;
use crate::error::AssistantError;
use crate::workspace::WorkspaceSetup;
use crate::Result;
use serde_json::Value;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_WORKSPACE_NAME: &str = "watson-banking-chatbot";
pub const DEFAULT_WORKSPACE_JSON: &str = "data/conversation/workspaces/banking.json";
pub const DEFAULT_ASSISTANT_URL: &str = "https://gateway.watsonplatform.net/assistant/api";
pub const DEFAULT_ASSISTANT_VERSION: &str = "2018-02-16";
pub const DEFAULT_VISION_URL: &str = "https://gateway.watsonplatform.net/visual-recognition/api";
pub const DEFAULT_VISION_VERSION: &str = "2018-03-19";
pub const DEFAULT_DISTANCE_MATRIX_URL: &str =
    "https://maps.googleapis.com/maps/api/distancematrix/json";
/// Address every directions map points to.
pub const DEFAULT_BRANCH_DESTINATION: &str = "דרך אם המושבות 94 פתח תקווה";

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCredentials {
    pub url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisionSettings {
    pub url: String,
    pub api_key: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapsSettings {
    pub api_key: String,
    pub destination: String,
    pub distance_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub static_dir: PathBuf,
    pub customer_id: u64,
    pub assistant: ServiceCredentials,
    pub assistant_version: String,
    pub workspace: WorkspaceSetup,
    /// `None` when no classifier key is configured.
    pub vision: Option<VisionSettings>,
    pub maps: MapsSettings,
    pub couch_url: Option<String>,
    pub bank_data_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let vcap: Value = match var("VCAP_SERVICES") {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                AssistantError::Config(format!("VCAP_SERVICES is not valid JSON: {}", e))
            })?,
            None => Value::Null,
        };
        let vcap_field = |pattern: &str, field: &str| {
            vcap_credentials(&vcap, pattern)
                .and_then(|c| c.get(field))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let assistant_field = |field: &str| {
            vcap_field("conversation", field).or_else(|| vcap_field("assistant", field))
        };

        let port = match var("PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| AssistantError::Config(format!("Invalid PORT: {}", p)))?,
            None => DEFAULT_PORT,
        };

        let customer_id = match var("DEMO_CUSTOMER_ID") {
            Some(id) => id.parse().map_err(|_| {
                AssistantError::Config(format!("Invalid DEMO_CUSTOMER_ID: {}", id))
            })?,
            None => DEMO_CUSTOMER_ID,
        };

        let assistant_key = var("ASSISTANT_APIKEY").or_else(|| assistant_field("apikey"));
        let (username, password) = match assistant_key {
            Some(key) => ("apikey".to_string(), key),
            None => (
                var("ASSISTANT_USERNAME")
                    .or_else(|| var("CONVERSATION_USERNAME"))
                    .or_else(|| assistant_field("username"))
                    .unwrap_or_default(),
                var("ASSISTANT_PASSWORD")
                    .or_else(|| var("CONVERSATION_PASSWORD"))
                    .or_else(|| assistant_field("password"))
                    .unwrap_or_default(),
            ),
        };
        let assistant = ServiceCredentials {
            url: var("ASSISTANT_URL")
                .or_else(|| assistant_field("url"))
                .unwrap_or_else(|| DEFAULT_ASSISTANT_URL.to_string()),
            username,
            password,
        };

        let workspace = WorkspaceSetup {
            workspace_id: var("WORKSPACE_ID"),
            name: var("WORKSPACE_NAME").unwrap_or_else(|| DEFAULT_WORKSPACE_NAME.to_string()),
            definition_path: PathBuf::from(
                var("WORKSPACE_JSON").unwrap_or_else(|| DEFAULT_WORKSPACE_JSON.to_string()),
            ),
        };

        let vision = var("VC_API")
            .or_else(|| vcap_field("watson_vision_combined", "apikey"))
            .map(|api_key| VisionSettings {
                url: var("VISUAL_RECOGNITION_URL")
                    .or_else(|| vcap_field("watson_vision_combined", "url"))
                    .unwrap_or_else(|| DEFAULT_VISION_URL.to_string()),
                api_key,
                version: var("VISUAL_RECOGNITION_VERSION")
                    .unwrap_or_else(|| DEFAULT_VISION_VERSION.to_string()),
            });

        let maps = MapsSettings {
            api_key: var("MAPS_API_KEY").unwrap_or_default(),
            destination: var("BRANCH_DESTINATION")
                .unwrap_or_else(|| DEFAULT_BRANCH_DESTINATION.to_string()),
            distance_url: var("DISTANCE_MATRIX_URL")
                .unwrap_or_else(|| DEFAULT_DISTANCE_MATRIX_URL.to_string()),
        };

        Ok(Self {
            port,
            static_dir: PathBuf::from(var("STATIC_DIR").unwrap_or_else(|| "public".to_string())),
            customer_id,
            assistant,
            assistant_version: var("ASSISTANT_VERSION")
                .unwrap_or_else(|| DEFAULT_ASSISTANT_VERSION.to_string()),
            workspace,
            vision,
            maps,
            couch_url: var("CLOUDANT_URL").or_else(|| vcap_field("cloudant", "url")),
            bank_data_path: var("BANK_DATA_PATH").map(PathBuf::from),
        })
    }
}

/// Credentials of the first bound service whose key contains `pattern`
/// (case-insensitive).
pub fn vcap_credentials<'a>(vcap: &'a Value, pattern: &str) -> Option<&'a Value> {
    let pattern = pattern.to_lowercase();
    vcap.as_object()?
        .iter()
        .find(|(name, _)| name.to_lowercase().contains(&pattern))
        .and_then(|(_, instances)| instances.get(0))
        .and_then(|instance| instance.get("credentials"))
}
