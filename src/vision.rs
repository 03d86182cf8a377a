//! Image classifier client
//!
//! Face attribute detection through a visual-recognition v3 compatible
//! `detect_faces` endpoint, plus decoding of the data URIs the browser
//! uploads.

use crate::config::VisionSettings;
use crate::error::AssistantError;
use crate::models::{AgeRange, FaceAttributes};
use crate::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error};

lazy_static! {
    static ref DATA_URI: Regex = Regex::new(r"^data:.+/(.+);base64,(.*)$").unwrap();
}

/// Black-box face classifier
#[async_trait::async_trait]
pub trait FaceClassifier: Send + Sync {
    /// Attributes of the first detected face, `None` when there is none.
    async fn classify_face(&self, image: &Path) -> Result<Option<FaceAttributes>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    /// MIME subtype, used as the file extension.
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Decode `data:<type>/<subtype>;base64,<payload>`.
pub fn decode_data_uri(uri: &str) -> Result<DecodedImage> {
    let captures = DATA_URI
        .captures(uri)
        .ok_or_else(|| AssistantError::BadRequest("picInput is not a base64 data URI".into()))?;

    let extension = captures[1].to_string();
    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AssistantError::BadRequest(format!(
            "Unsupported image type: {}",
            extension
        )));
    }

    let bytes = STANDARD
        .decode(captures[2].trim())
        .map_err(|e| AssistantError::BadRequest(format!("Invalid base64 payload: {}", e)))?;

    Ok(DecodedImage { extension, bytes })
}

#[derive(Debug, Deserialize)]
struct DetectFacesResponse {
    #[serde(default)]
    images: Vec<DetectedImage>,
}

#[derive(Debug, Deserialize)]
struct DetectedImage {
    #[serde(default)]
    faces: Vec<DetectedFace>,
}

#[derive(Debug, Deserialize)]
struct DetectedFace {
    age: AgeRange,
    gender: DetectedGender,
}

#[derive(Debug, Deserialize)]
struct DetectedGender {
    gender: String,
}

fn first_face(response: DetectFacesResponse) -> Option<FaceAttributes> {
    let face = response.images.into_iter().next()?.faces.into_iter().next()?;
    Some(FaceAttributes {
        age: face.age,
        gender: face.gender.gender,
    })
}

pub struct VisualRecognitionClient {
    client: Client,
    base_url: String,
    api_key: String,
    version: String,
}

impl VisualRecognitionClient {
    pub fn new(settings: &VisionSettings) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            version: settings.version.clone(),
        })
    }
}

#[async_trait::async_trait]
impl FaceClassifier for VisualRecognitionClient {
    async fn classify_face(&self, image: &Path) -> Result<Option<FaceAttributes>> {
        let bytes = tokio::fs::read(image).await?;
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let extension = image
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "jpeg".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(&format!("image/{}", extension))?;
        let form = Form::new().part("images_file", part);

        debug!("Calling detect_faces");
        let response = self
            .client
            .post(format!("{}/v3/detect_faces", self.base_url))
            .query(&[("version", self.version.as_str())])
            .basic_auth("apikey", Some(&self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!("Visual recognition request failed: {}", e);
                AssistantError::upstream(
                    e.status().map(|s| s.as_u16()),
                    format!("Visual recognition request failed: {}", e),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AssistantError::upstream(
                Some(status.as_u16()),
                format!("Visual recognition error: {}", error_text),
            ));
        }

        let parsed: DetectFacesResponse = response.json().await.map_err(|e| {
            AssistantError::upstream(None, format!("Visual recognition parse error: {}", e))
        })?;
        Ok(first_face(parsed))
    }
}
