use banking_assistant::{
    agent::{TurnOrchestrator, TurnSettings},
    api::start_server,
    config::AppConfig,
    data::{AccountDataProvider, CouchBankData, InMemoryBankData},
    dialog::{AssistantClient, DialogEngine},
    directions::DistanceMatrixClient,
    vision::{FaceClassifier, VisualRecognitionClient},
    workspace::{self, WorkspaceHandle},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("banking_assistant=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    info!("Banking Assistant - API Server");
    info!("Port: {}", config.port);

    let accounts: Arc<dyn AccountDataProvider> = match &config.bank_data_path {
        Some(path) => {
            info!(path = %path.display(), "Loading bank data");
            Arc::new(InMemoryBankData::from_json_file(path).await?)
        }
        None => Arc::new(InMemoryBankData::demo()),
    };
    let data: Arc<dyn AccountDataProvider> = match &config.couch_url {
        Some(url) => Arc::new(CouchBankData::new(url, accounts)?),
        None => accounts,
    };

    let dialog: Arc<dyn DialogEngine> = Arc::new(AssistantClient::new(
        &config.assistant,
        &config.assistant_version,
    )?);
    let distances = Arc::new(DistanceMatrixClient::new(&config.maps)?);
    let classifier: Option<Arc<dyn FaceClassifier>> = match &config.vision {
        Some(settings) => Some(Arc::new(VisualRecognitionClient::new(settings)?)),
        None => {
            warn!("No image classifier configured; picture turns are disabled");
            None
        }
    };

    // Resolve the workspace in the background; turns report "not ready" until then.
    let handle = WorkspaceHandle::new();
    tokio::spawn(workspace::initialize(
        handle.clone(),
        dialog.clone(),
        config.workspace.clone(),
    ));

    let orchestrator = Arc::new(TurnOrchestrator::new(
        dialog,
        data,
        distances,
        classifier,
        handle,
        TurnSettings {
            customer_id: config.customer_id,
            maps_api_key: config.maps.api_key.clone(),
            branch_destination: config.maps.destination.clone(),
        },
    ));

    start_server(orchestrator, config.static_dir.clone(), config.port).await?;

    Ok(())
}
