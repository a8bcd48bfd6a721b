use async_trait::async_trait;
use ml_lifecycle_core::remote::{ApiRequest, ApiResponse, HttpTransport, Method};
use ml_lifecycle_core::{
    ApiError, ApiResult, AppConfig, AppContext, AppError, DataEntry, EditableEntity, Project, NOT_AVAILABLE,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CannedBackend {
    routes: Mutex<HashMap<(Method, String), (u16, String)>>,
    seen: Mutex<Vec<ApiRequest>>,
}

impl CannedBackend {
    fn respond(&self, method: Method, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .expect("routes")
            .insert((method, url.to_string()), (status, body.to_string()));
    }

    fn seen(&self) -> Vec<ApiRequest> {
        self.seen.lock().expect("seen").clone()
    }
}

#[async_trait]
impl HttpTransport for CannedBackend {
    async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let key = (request.method, request.url.clone());
        self.seen.lock().expect("seen").push(request);
        let (status, body) = self
            .routes
            .lock()
            .expect("routes")
            .get(&key)
            .cloned()
            .unwrap_or((404, String::new()));
        Ok(ApiResponse { status, body })
    }
}

fn context(dir: &tempfile::TempDir, backend: Arc<CannedBackend>) -> AppContext {
    let mut config = AppConfig {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    config.api.base_url = "http://backend.test/".to_string();
    config.api.get_retries = 0;
    config.api.retry_backoff_ms = 0;
    AppContext::with_transport(config, backend).expect("context")
}

#[tokio::test]
async fn new_project_is_observable_with_default_status() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(&dir, Arc::new(CannedBackend::default()));
    let mut projects = ctx.projects.get_all();

    let project = Project::default()
        .with_field("projectName", "Churn Model")
        .expect("name")
        .with_field("status", "Ongoing")
        .expect("status");
    let id = ctx.projects.insert(project).await.expect("insert");

    projects.changed().await.expect("snapshot");
    let snapshot = projects.borrow().clone();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, Some(id));
    assert_eq!(snapshot[0].status, "Ongoing");
}

#[tokio::test]
async fn problem_framing_is_found_by_project_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(&dir, Arc::new(CannedBackend::default()));

    let entry = DataEntry::new("Churn Model")
        .with_field("target", "Reduce churn 10%")
        .expect("target");
    let id = ctx.entries.insert(entry.clone()).await.expect("insert");

    let found = ctx
        .entries
        .get_problem_framing_by_project_name("Churn Model")
        .await
        .expect("lookup");
    assert_eq!(found, Some(DataEntry { id: Some(id), ..entry }));
    assert!(matches!(
        DataEntry::new("x").with_field("nope", "1"),
        Err(AppError::UnknownField { .. })
    ));
}

#[tokio::test]
async fn failed_remote_list_is_a_result_not_a_panic() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = Arc::new(CannedBackend::default());
    backend.respond(
        Method::Get,
        "http://backend.test/api-content/dataset-requests/",
        500,
        "Internal Server Error",
    );
    let ctx = context(&dir, backend.clone());

    let error = ctx.remote.dataset_requests.list().await.expect_err("500");
    assert_eq!(error.status(), Some(500));
    assert!(matches!(
        ctx.sync.refresh_dataset_requests().await,
        Err(AppError::Remote(ApiError::Http { status: 500, .. }))
    ));
    assert!(backend.seen().iter().all(|request| request.header("Authorization").is_none()));
}

#[tokio::test]
async fn stored_token_is_attached_and_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = Arc::new(CannedBackend::default());
    backend.respond(Method::Get, "http://backend.test/projects/", 200, r#"[{ "id": 4, "name": "Fraud" }]"#);
    {
        let ctx = context(&dir, backend.clone());
        ctx.tokens.set_token("abc123").expect("token");
    }

    let ctx = context(&dir, backend.clone());
    assert_eq!(ctx.sync.refresh_projects().await.expect("refresh"), 1);
    assert_eq!(backend.seen()[0].header("Authorization"), Some("Token abc123"));

    let details = ctx
        .details
        .load_by_name("Fraud")
        .await
        .expect("details")
        .expect("cached project");
    assert_eq!(details.project.remote_id, Some(4));
    assert!(!details.problem_framing.is_available());
    let target = details
        .summary_lines()
        .into_iter()
        .find(|line| line.label == "Target")
        .expect("target row");
    assert_eq!(target.value, NOT_AVAILABLE);
}

#[tokio::test]
async fn form_record_pushed_then_refreshed_stays_a_single_row() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = Arc::new(CannedBackend::default());
    backend.respond(Method::Get, "http://backend.test/projects/", 200, r#"[{ "id": 12, "name": "Churn Model" }]"#);
    let echoed = r#"{ "id": 300, "project": 12, "target": "Reduce churn 10%" }"#;
    backend.respond(Method::Post, "http://backend.test/api-content/problem-framings/", 201, echoed);
    backend.respond(
        Method::Get,
        "http://backend.test/api-content/problem-framings/",
        200,
        &format!("[{}]", echoed),
    );
    let ctx = context(&dir, backend.clone());
    ctx.sync.refresh_projects().await.expect("projects");

    let entry = DataEntry::new("Churn Model")
        .with_field("target", "Reduce churn 10%")
        .expect("target");
    let local_id = ctx.entries.insert(entry).await.expect("save form");
    let saved = ctx.entries.get(local_id).await.expect("get").expect("saved");
    let pushed = ctx.sync.push_problem_framing(&saved).await.expect("push");
    assert_eq!((pushed.id, pushed.remote_id), (Some(local_id), Some(300)));

    ctx.sync.refresh_problem_framings().await.expect("refresh");
    let rows = ctx.entries.snapshot();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, Some(local_id));
    assert_eq!(rows[0].project_name, "Churn Model");

    let post = backend
        .seen()
        .into_iter()
        .find(|request| request.method == Method::Post)
        .expect("create request");
    assert_eq!(post.url, "http://backend.test/api-content/problem-framings/");
}
