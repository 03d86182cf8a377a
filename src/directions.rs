//! Branch distance lookups
//!
//! The map-directions path measures the distance from the customer's origin
//! to each branch. This runs as a detached task: the turn never waits for
//! it and failures are only logged.

use crate::config::MapsSettings;
use crate::data::AccountDataProvider;
use crate::error::AssistantError;
use crate::Result;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[async_trait::async_trait]
pub trait DistanceService: Send + Sync {
    /// Road distance in meters, `None` when the service found no route.
    async fn distance_meters(&self, origin: &str, destination: &str) -> Result<Option<u64>>;
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    distance: Option<MatrixValue>,
}

#[derive(Debug, Deserialize)]
struct MatrixValue {
    value: u64,
}

fn first_distance(response: &DistanceMatrixResponse) -> Option<u64> {
    response
        .rows
        .first()?
        .elements
        .first()?
        .distance
        .as_ref()
        .map(|d| d.value)
}

/// Distance-matrix HTTP client
pub struct DistanceMatrixClient {
    client: Client,
    url: String,
    api_key: String,
}

impl DistanceMatrixClient {
    pub fn new(settings: &MapsSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url: settings.distance_url.clone(),
            api_key: settings.api_key.clone(),
        })
    }
}

#[async_trait::async_trait]
impl DistanceService for DistanceMatrixClient {
    async fn distance_meters(&self, origin: &str, destination: &str) -> Result<Option<u64>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("origins", origin),
                ("destinations", destination),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssistantError::upstream(
                Some(status.as_u16()),
                format!("Distance matrix returned {}", status),
            ));
        }

        let parsed: DistanceMatrixResponse = response.json().await?;
        Ok(first_distance(&parsed))
    }
}

/// Measure origin-to-branch distances in the background.
///
/// `cap` limits how many branches are measured. The handle is only useful
/// to tests; callers on the request path drop it.
pub fn spawn_distance_probe(
    data: Arc<dyn AccountDataProvider>,
    distances: Arc<dyn DistanceService>,
    origin: String,
    cap: Option<usize>,
) -> JoinHandle<Vec<(String, u64)>> {
    tokio::spawn(async move {
        let mut branches = match data.list_branches().await {
            Ok(branches) => branches,
            Err(e) => {
                warn!(error = %e, "Branch listing for distance probe failed");
                return Vec::new();
            }
        };

        if let Some(cap) = cap {
            branches.truncate(cap);
        }

        let mut measured = Vec::with_capacity(branches.len());
        for branch in branches {
            match distances.distance_meters(&origin, &branch.address).await {
                Ok(Some(meters)) => {
                    info!(branch = %branch.location, meters, "Branch distance");
                    measured.push((branch.location, meters));
                }
                Ok(None) => debug!(branch = %branch.location, "No route to branch"),
                Err(e) => warn!(branch = %branch.location, error = %e, "Distance lookup failed"),
            }
        }
        measured
    })
}
