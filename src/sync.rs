//! Keeps the local cache in step with the REST backend.
//!
//! Local rows keep their own ids; the backend's id is stored beside it as
//! `remote_id`. `refresh_*` pulls a remote collection and merges it on
//! `remote_id`, so rows that were never pushed are left alone. `push_*`
//! sends one local record as a create (no `remote_id` yet) or a full update,
//! then writes the server's copy back over the same local row.

use crate::db::RemoteMirrored;
use crate::errors::{AppError, AppResult};
use crate::models::{DataEntry, DataProcessing, DatasetRequest, ModelTraining, Project};
use crate::remote::dto::{
    DataProcessingPayload, DatasetRequestPayload, IntoRequestBody, ProblemFramingPayload, ProjectPayload,
    TrainingModelPayload,
};
use crate::remote::services::{
    Resource, DATASET_REQUESTS, DATA_PROCESSINGS, PROBLEM_FRAMINGS, TRAINING_MODELS,
};
use crate::remote::{FileAttachment, RemoteServices};
use crate::repository::{
    DataEntryRepository, DataProcessingRepository, DatasetRequestRepository, ModelTrainingRepository,
    ProjectRepository, Repository,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

const PROJECTS: &str = "projects";

/// Outcome of [`SyncService::refresh_all`]. A failing resource does not stop
/// the others.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub refreshed: Vec<(&'static str, usize)>,
    pub failures: Vec<(&'static str, AppError)>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_refreshed(&self) -> usize {
        self.refreshed.iter().map(|(_, count)| count).sum()
    }

    fn record(&mut self, resource: &'static str, outcome: AppResult<usize>) {
        match outcome {
            Ok(count) => self.refreshed.push((resource, count)),
            Err(error) => {
                tracing::warn!(resource, error = %error, "refresh failed");
                self.failures.push((resource, error));
            }
        }
    }
}

#[derive(Clone)]
pub struct SyncService {
    remote: RemoteServices,
    projects: ProjectRepository,
    entries: DataEntryRepository,
    processings: DataProcessingRepository,
    trainings: ModelTrainingRepository,
    dataset_requests: DatasetRequestRepository,
}

impl SyncService {
    pub fn new(
        remote: RemoteServices,
        projects: ProjectRepository,
        entries: DataEntryRepository,
        processings: DataProcessingRepository,
        trainings: ModelTrainingRepository,
        dataset_requests: DatasetRequestRepository,
    ) -> Self {
        Self {
            remote,
            projects,
            entries,
            processings,
            trainings,
            dataset_requests,
        }
    }

    /// Projects first, so project ids in the other resources resolve to names.
    pub async fn refresh_all(&self) -> SyncReport {
        let mut report = SyncReport::default();
        report.record(PROJECTS, self.refresh_projects().await);
        report.record(PROBLEM_FRAMINGS, self.refresh_problem_framings().await);
        report.record(DATA_PROCESSINGS, self.refresh_data_processings().await);
        report.record(TRAINING_MODELS, self.refresh_training_models().await);
        report.record(DATASET_REQUESTS, self.refresh_dataset_requests().await);
        tracing::info!(
            refreshed = report.total_refreshed(),
            failures = report.failures.len(),
            "sync finished"
        );
        report
    }

    pub async fn refresh_projects(&self) -> AppResult<usize> {
        let rows: Vec<Project> = self
            .remote
            .projects
            .list()
            .await?
            .into_iter()
            .map(|response| response.into_entity())
            .filter(|project| {
                let keep = !project.project_name.trim().is_empty();
                if !keep {
                    tracing::warn!(remote_id = ?project.remote_id, "skipping remote project without a name");
                }
                keep
            })
            .collect();
        Ok(self.projects.merge_remote(rows).await?.len())
    }

    pub async fn refresh_problem_framings(&self) -> AppResult<usize> {
        let names = self.project_names();
        let rows = self
            .remote
            .problem_framings
            .list()
            .await?
            .into_iter()
            .map(|response| {
                let project = response.project;
                let mut entry = response.into_entity();
                fill_project_name(&mut entry.project_name, project, &names);
                entry
            })
            .collect();
        Ok(self.entries.merge_remote(rows).await?.len())
    }

    pub async fn refresh_data_processings(&self) -> AppResult<usize> {
        let names = self.project_names();
        let rows = self
            .remote
            .data_processings
            .list()
            .await?
            .into_iter()
            .map(|response| {
                let project = response.project;
                let mut processing = response.into_entity();
                fill_project_name(&mut processing.project_name, project, &names);
                processing
            })
            .collect();
        Ok(self.processings.merge_remote(rows).await?.len())
    }

    pub async fn refresh_training_models(&self) -> AppResult<usize> {
        let names = self.project_names();
        let rows = self
            .remote
            .training_models
            .list()
            .await?
            .into_iter()
            .map(|response| {
                let project = response.project;
                let mut training = response.into_entity();
                fill_project_name(&mut training.project_name, project, &names);
                training
            })
            .collect();
        Ok(self.trainings.merge_remote(rows).await?.len())
    }

    pub async fn refresh_dataset_requests(&self) -> AppResult<usize> {
        let names = self.project_names();
        let rows = self
            .remote
            .dataset_requests
            .list()
            .await?
            .into_iter()
            .map(|response| {
                let project = response.project;
                let mut request = response.into_entity();
                fill_project_name(&mut request.project_name, project, &names);
                request
            })
            .collect();
        Ok(self.dataset_requests.merge_remote(rows).await?.len())
    }

    pub async fn push_project(&self, project: &Project) -> AppResult<Project> {
        project.validate()?;
        let payload = ProjectPayload::from(project);
        let response = create_or_update(&self.remote.projects, project.remote_id, payload).await?;
        let mut echoed = response.into_entity();
        keep_local_name(&mut echoed.project_name, &project.project_name);
        cache_echo(&self.projects, echoed, project.id).await
    }

    pub async fn push_problem_framing(&self, entry: &DataEntry) -> AppResult<DataEntry> {
        let project = self.remote_project_id(&entry.project_name).await?;
        let payload = ProblemFramingPayload::from_entity(entry, project, None);
        let response = create_or_update(&self.remote.problem_framings, entry.remote_id, payload).await?;
        let mut echoed = response.into_entity();
        keep_local_name(&mut echoed.project_name, &entry.project_name);
        cache_echo(&self.entries, echoed, entry.id).await
    }

    /// `file` is only sent when a new file was picked; otherwise the
    /// server keeps the reference it already stores.
    pub async fn push_data_processing(
        &self,
        processing: &DataProcessing,
        file: Option<FileAttachment>,
    ) -> AppResult<DataProcessing> {
        let project = self.remote_project_id(&processing.project_name).await?;
        let payload = DataProcessingPayload::from_entity(processing, project, file);
        let response = create_or_update(&self.remote.data_processings, processing.remote_id, payload).await?;
        let mut echoed = response.into_entity();
        keep_local_name(&mut echoed.project_name, &processing.project_name);
        cache_echo(&self.processings, echoed, processing.id).await
    }

    pub async fn push_training_model(
        &self,
        training: &ModelTraining,
        file: Option<FileAttachment>,
    ) -> AppResult<ModelTraining> {
        let project = self.remote_project_id(&training.project_name).await?;
        let payload = TrainingModelPayload::from_entity(training, project, file);
        let response = create_or_update(&self.remote.training_models, training.remote_id, payload).await?;
        let mut echoed = response.into_entity();
        keep_local_name(&mut echoed.project_name, &training.project_name);
        cache_echo(&self.trainings, echoed, training.id).await
    }

    pub async fn push_dataset_request(&self, request: &DatasetRequest) -> AppResult<DatasetRequest> {
        if request.feature_count < 0 {
            return Err(AppError::Validation("Feature count cannot be negative".to_string()));
        }
        let project = self.remote_project_id(&request.project_name).await?;
        let payload = DatasetRequestPayload::from_entity(request, project, None);
        let response = create_or_update(&self.remote.dataset_requests, request.remote_id, payload).await?;
        let mut echoed = response.into_entity();
        keep_local_name(&mut echoed.project_name, &request.project_name);
        cache_echo(&self.dataset_requests, echoed, request.id).await
    }

    /// Deletes by local id. Rows that were pushed are deleted remotely first.
    pub async fn delete_project(&self, id: i64) -> AppResult<bool> {
        delete_both(&self.remote.projects, &self.projects, id).await
    }

    pub async fn delete_problem_framing(&self, id: i64) -> AppResult<bool> {
        delete_both(&self.remote.problem_framings, &self.entries, id).await
    }

    pub async fn delete_data_processing(&self, id: i64) -> AppResult<bool> {
        delete_both(&self.remote.data_processings, &self.processings, id).await
    }

    pub async fn delete_training_model(&self, id: i64) -> AppResult<bool> {
        delete_both(&self.remote.training_models, &self.trainings, id).await
    }

    pub async fn delete_dataset_request(&self, id: i64) -> AppResult<bool> {
        delete_both(&self.remote.dataset_requests, &self.dataset_requests, id).await
    }

    /// Remote project id to name, for responses that only carry the id.
    fn project_names(&self) -> HashMap<i64, String> {
        self.projects
            .snapshot()
            .into_iter()
            .filter_map(|project| project.remote_id.map(|id| (id, project.project_name)))
            .collect()
    }

    /// The backend id of the named project. Checked before any request is sent.
    async fn remote_project_id(&self, project_name: &str) -> AppResult<i64> {
        let project = self
            .projects
            .find_by_name(project_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("project '{}' is not stored locally", project_name)))?;
        project.remote_id.ok_or_else(|| {
            AppError::Validation(format!("project '{}' has not been pushed to the backend", project_name))
        })
    }
}

/// POST when the record has never reached the backend, PUT to its remote id otherwise.
async fn create_or_update<P, R>(resource: &Resource<P, R>, remote_id: Option<i64>, payload: P) -> AppResult<R>
where
    P: IntoRequestBody,
    R: DeserializeOwned,
{
    let response = match remote_id {
        Some(remote_id) => resource.update(remote_id, payload).await?,
        None => resource.create(payload).await?,
    };
    Ok(response)
}

/// Writes the server's copy of a pushed record over its local row, or
/// stores it fresh when the record was never saved locally.
async fn cache_echo<E: RemoteMirrored>(
    repository: &Repository<E>,
    mut echoed: E,
    local_id: Option<i64>,
) -> AppResult<E> {
    echoed.set_local_id(local_id);
    repository
        .merge_remote(vec![echoed])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(format!("{} merge returned no row", E::TABLE)))
}

/// Remote first: a failed remote delete leaves the local row in place.
async fn delete_both<P, R, E>(resource: &Resource<P, R>, repository: &Repository<E>, id: i64) -> AppResult<bool>
where
    P: IntoRequestBody,
    R: DeserializeOwned,
    E: RemoteMirrored,
{
    let Some(row) = repository.get(id).await? else {
        return Ok(false);
    };
    if let Some(remote_id) = row.remote_id() {
        resource.delete(remote_id).await?;
    }
    repository.delete_by_id(id).await
}

fn fill_project_name(name: &mut String, project: Option<i64>, names: &HashMap<i64, String>) {
    if name.is_empty() {
        if let Some(known) = project.and_then(|id| names.get(&id)) {
            name.clone_from(known);
        }
    }
}

fn keep_local_name(name: &mut String, local: &str) {
    if name.is_empty() {
        *name = local.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::db::Database;
    use crate::errors::ApiError;
    use crate::remote::testing::FakeTransport;
    use crate::remote::{ApiClient, Method, RequestBody, TokenStore};
    use std::sync::Arc;

    const CONTENT: &str = "http://backend.test/api-content";
    const LEGACY_PROJECTS: &str = "http://backend.test/projects/";

    struct Harness {
        _dir: tempfile::TempDir,
        transport: Arc<FakeTransport>,
        sync: SyncService,
        projects: ProjectRepository,
        entries: DataEntryRepository,
        dataset_requests: DatasetRequestRepository,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Arc::new(Database::new(&dir.path().join("store.db")).expect("db"));
        let transport = Arc::new(FakeTransport::default());
        let config = ApiConfig {
            base_url: "http://backend.test/".to_string(),
            retry_backoff_ms: 0,
            get_retries: 0,
            ..Default::default()
        };
        let client = ApiClient::new(config, transport.clone(), TokenStore::ephemeral(None));
        let projects = ProjectRepository::new(db.clone()).expect("repo");
        let entries = DataEntryRepository::new(db.clone()).expect("repo");
        let dataset_requests = DatasetRequestRepository::new(db.clone()).expect("repo");
        let sync = SyncService::new(
            RemoteServices::new(client),
            projects.clone(),
            entries.clone(),
            DataProcessingRepository::new(db.clone()).expect("repo"),
            ModelTrainingRepository::new(db).expect("repo"),
            dataset_requests.clone(),
        );
        Harness {
            _dir: dir,
            transport,
            sync,
            projects,
            entries,
            dataset_requests,
        }
    }

    /// Stores a project that is already known to the backend under `remote_id`.
    /// A decoy project is stored first so local and remote ids differ.
    async fn synced_project(h: &Harness, name: &str, remote_id: i64) -> i64 {
        h.projects.insert(Project::new("Decoy")).await.expect("decoy");
        let mut project = Project::new(name);
        project.remote_id = Some(remote_id);
        h.projects.insert(project).await.expect("project")
    }

    fn route_empty_lists(transport: &FakeTransport) {
        transport.respond(Method::Get, LEGACY_PROJECTS, 200, "[]");
        for resource in [PROBLEM_FRAMINGS, DATA_PROCESSINGS, TRAINING_MODELS, DATASET_REQUESTS] {
            transport.respond(Method::Get, &format!("{}/{}/", CONTENT, resource), 200, "[]");
        }
    }

    fn json_body(request: &crate::remote::ApiRequest) -> &serde_json::Value {
        let RequestBody::Json(body) = &request.body else {
            panic!("expected json body");
        };
        body
    }

    #[tokio::test]
    async fn refresh_resolves_project_names_through_remote_ids() {
        let h = harness();
        synced_project(&h, "Churn Model", 1).await;
        h.transport.respond(
            Method::Get,
            &format!("{}/dataset-requests/", CONTENT),
            200,
            r#"[{ "id": 31, "project": 1, "description": {}, "feature_count": "12", "status": "Open",
                  "created_at": "2026-05-01T10:00:00Z" }]"#,
        );

        assert_eq!(h.sync.refresh_dataset_requests().await.expect("refresh"), 1);
        let cached = h
            .dataset_requests
            .latest_for_project("Churn Model")
            .await
            .expect("lookup")
            .expect("cached");
        assert_eq!(cached.remote_id, Some(31));
        assert!(cached.id.is_some());
        assert_eq!(cached.description, "");
        assert_eq!(cached.feature_count, 12);
    }

    #[tokio::test]
    async fn refresh_keeps_unsynced_rows_and_never_duplicates() {
        let h = harness();
        let mut offline = DataEntry::new("Churn Model");
        offline.target = "drafted offline".to_string();
        let offline_id = h.entries.insert(offline).await.expect("offline");
        // The server's id happens to equal the offline row's local id.
        let listing = format!(r#"[{{ "id": {}, "project_detail": {{ "id": 1, "project_name": "Churn Model" }},
                                     "target": "from server" }}]"#, offline_id);
        h.transport
            .respond(Method::Get, &format!("{}/problem-framings/", CONTENT), 200, &listing);

        h.sync.refresh_problem_framings().await.expect("refresh");
        h.sync.refresh_problem_framings().await.expect("refresh again");

        let rows = h.entries.snapshot();
        assert_eq!(rows.len(), 2);
        let kept = h.entries.get(offline_id).await.expect("get").expect("offline row");
        assert_eq!(kept.target, "drafted offline");
        assert_eq!(kept.remote_id, None);
        let mirrored: Vec<_> = rows.iter().filter(|row| row.remote_id == Some(offline_id)).collect();
        assert_eq!(mirrored.len(), 1);
        assert_eq!(mirrored[0].target, "from server");
        assert_ne!(mirrored[0].id, Some(offline_id));
    }

    #[tokio::test]
    async fn refresh_all_reports_failures_without_stopping() {
        let h = harness();
        route_empty_lists(&h.transport);
        h.transport.respond(
            Method::Get,
            &format!("{}/dataset-requests/", CONTENT),
            500,
            "Internal Server Error",
        );

        let report = h.sync.refresh_all().await;
        assert!(!report.is_clean());
        assert_eq!(report.refreshed.len(), 4);
        assert_eq!(report.failures.len(), 1);
        let (resource, error) = &report.failures[0];
        assert_eq!(*resource, DATASET_REQUESTS);
        assert!(matches!(error, AppError::Remote(ApiError::Http { status: 500, .. })));
    }

    #[tokio::test]
    async fn locally_saved_record_is_created_remotely_then_updated_in_place() {
        let h = harness();
        synced_project(&h, "Churn Model", 77).await;
        let echoed = r#"{ "id": 42, "project": 77, "project_detail": { "id": 77, "project_name": "Churn Model" },
                          "target": "Reduce churn 10%" }"#;
        h.transport
            .respond(Method::Post, &format!("{}/problem-framings/", CONTENT), 201, echoed);
        h.transport
            .respond(Method::Put, &format!("{}/problem-framings/42/", CONTENT), 200, echoed);

        let mut entry = DataEntry::new("Churn Model");
        entry.target = "Reduce churn 10%".to_string();
        let local_id = h.entries.insert(entry.clone()).await.expect("save form");
        let saved = h.entries.get(local_id).await.expect("get").expect("saved");

        let pushed = h.sync.push_problem_framing(&saved).await.expect("create");
        assert_eq!(pushed.id, Some(local_id));
        assert_eq!(pushed.remote_id, Some(42));
        let rows = h.entries.snapshot();
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].id, rows[0].remote_id), (Some(local_id), Some(42)));

        h.sync.push_problem_framing(&pushed).await.expect("update");
        assert_eq!(h.entries.snapshot().len(), 1);

        let requests = h.transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].url, format!("{}/problem-framings/", CONTENT));
        assert_eq!(json_body(&requests[0])["project"], serde_json::json!(77));
        assert_eq!(requests[1].method, Method::Put);
        assert_eq!(requests[1].url, format!("{}/problem-framings/42/", CONTENT));
    }

    #[tokio::test]
    async fn pushed_project_carries_its_remote_id_into_later_pushes() {
        let h = harness();
        h.projects.insert(Project::new("Decoy")).await.expect("decoy");
        let local_id = h.projects.insert(Project::new("Fraud")).await.expect("project");
        h.transport
            .respond(Method::Post, LEGACY_PROJECTS, 201, r#"{ "id": 5, "name": "Fraud" }"#);
        h.transport.respond(
            Method::Post,
            &format!("{}/dataset-requests/", CONTENT),
            201,
            r#"{ "id": 8, "project": 5, "feature_count": 3 }"#,
        );

        let project = h.projects.get(local_id).await.expect("get").expect("stored");
        let pushed = h.sync.push_project(&project).await.expect("push project");
        assert_eq!((pushed.id, pushed.remote_id), (Some(local_id), Some(5)));
        assert_eq!(h.projects.snapshot().len(), 2);

        let mut request = DatasetRequest::new("Fraud");
        request.feature_count = 3;
        let stored = h.sync.push_dataset_request(&request).await.expect("push request");
        assert_eq!(stored.project_name, "Fraud");
        assert_eq!(stored.remote_id, Some(8));
        assert!(stored.id.is_some());

        let requests = h.transport.requests();
        assert_eq!(json_body(&requests[1])["project"], serde_json::json!(5));
    }

    #[tokio::test]
    async fn push_for_unknown_or_unsynced_project_sends_nothing() {
        let h = harness();
        let result = h.sync.push_problem_framing(&DataEntry::new("Nowhere")).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        h.projects.insert(Project::new("Local Only")).await.expect("project");
        let result = h.sync.push_problem_framing(&DataEntry::new("Local Only")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn remote_delete_failure_keeps_local_row() {
        let h = harness();
        let mut entry = DataEntry::new("Churn Model");
        entry.remote_id = Some(70);
        let id = h.entries.insert(entry).await.expect("insert");

        assert!(h.sync.delete_problem_framing(id).await.is_err());
        assert!(h.entries.get(id).await.expect("get").is_some());

        h.transport
            .respond(Method::Delete, &format!("{}/problem-framings/70/", CONTENT), 204, "");
        assert!(h.sync.delete_problem_framing(id).await.expect("delete"));
        assert!(h.entries.snapshot().is_empty());
        assert_eq!(h.transport.requests()[1].url, format!("{}/problem-framings/70/", CONTENT));
    }

    #[tokio::test]
    async fn unsynced_row_is_deleted_locally_only() {
        let h = harness();
        let id = h.entries.insert(DataEntry::new("Churn Model")).await.expect("insert");
        assert!(h.sync.delete_problem_framing(id).await.expect("delete"));
        assert!(!h.sync.delete_problem_framing(id).await.expect("second delete"));
        assert!(h.transport.requests().is_empty());
    }
}
