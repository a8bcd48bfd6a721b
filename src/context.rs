use crate::config::AppConfig;
use crate::db::Database;
use crate::details::ProjectDetailsService;
use crate::errors::AppResult;
use crate::remote::{ApiClient, HttpTransport, RemoteServices, ReqwestTransport, TokenStore};
use crate::repository::{
    DataEntryRepository, DataProcessingRepository, DatasetRequestRepository, ModelTrainingRepository,
    ObjectivesRepository, ProfileRepository, ProjectRepository, UserRepository,
};
use crate::sync::SyncService;
use std::sync::Arc;

/// Everything the application needs, built once at startup and shared by clone.
#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub db: Arc<Database>,
    pub tokens: TokenStore,
    pub client: ApiClient,
    pub remote: RemoteServices,
    pub projects: ProjectRepository,
    pub entries: DataEntryRepository,
    pub processings: DataProcessingRepository,
    pub trainings: ModelTrainingRepository,
    pub dataset_requests: DatasetRequestRepository,
    pub profiles: ProfileRepository,
    pub users: UserRepository,
    pub objectives: ObjectivesRepository,
    pub sync: SyncService,
    pub details: ProjectDetailsService,
}

impl AppContext {
    pub fn initialize(config: AppConfig) -> AppResult<Self> {
        let transport = ReqwestTransport::new(config.api.connect_timeout(), config.api.request_timeout())?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(config: AppConfig, transport: Arc<dyn HttpTransport>) -> AppResult<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let db = Arc::new(Database::new(&config.database_path())?);
        let tokens = TokenStore::load_or_seed(db.clone(), config.api.fallback_token.as_deref())?;
        let client = ApiClient::new(config.api.clone(), transport, tokens.clone());
        let remote = RemoteServices::new(client.clone());

        let projects = ProjectRepository::new(db.clone())?;
        let entries = DataEntryRepository::new(db.clone())?;
        let processings = DataProcessingRepository::new(db.clone())?;
        let trainings = ModelTrainingRepository::new(db.clone())?;
        let dataset_requests = DatasetRequestRepository::new(db.clone())?;
        let profiles = ProfileRepository::new(db.clone())?;
        let users = UserRepository::new(db.clone())?;
        let objectives = ObjectivesRepository::new(db.clone())?;

        let sync = SyncService::new(
            remote.clone(),
            projects.clone(),
            entries.clone(),
            processings.clone(),
            trainings.clone(),
            dataset_requests.clone(),
        );
        let details = ProjectDetailsService::new(
            projects.clone(),
            entries.clone(),
            processings.clone(),
            trainings.clone(),
        );

        tracing::info!(database = %config.database_path().display(), base_url = %config.api.base_url, "context initialized");
        Ok(Self {
            config,
            db,
            tokens,
            client,
            remote,
            projects,
            entries,
            processings,
            trainings,
            dataset_requests,
            profiles,
            users,
            objectives,
            sync,
            details,
        })
    }
}
