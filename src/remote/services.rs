use super::client::ApiClient;
use super::dto::{
    DataProcessingPayload, DataProcessingResponse, DatasetRequestPayload, DatasetRequestResponse, IntoRequestBody,
    ProblemFramingPayload, ProblemFramingResponse, ProjectPayload, ProjectResponse, TrainingModelPayload,
    TrainingModelResponse,
};
use super::transport::Method;
use crate::config::ApiConfig;
use crate::errors::ApiResult;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

pub const PROBLEM_FRAMINGS: &str = "problem-framings";
pub const DATA_PROCESSINGS: &str = "data-processings";
pub const TRAINING_MODELS: &str = "training-models";
pub const DATASET_REQUESTS: &str = "dataset-requests";

/// One REST collection: `<collection>/` for list/create and
/// `<collection>/<id>/` for get/update/delete.
pub struct Resource<P, R> {
    client: ApiClient,
    collection_url: String,
    _marker: PhantomData<fn(P) -> R>,
}

impl<P, R> Clone for Resource<P, R> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            collection_url: self.collection_url.clone(),
            _marker: PhantomData,
        }
    }
}

impl<P, R> Resource<P, R>
where
    P: IntoRequestBody,
    R: DeserializeOwned,
{
    pub fn new(client: ApiClient, collection_url: impl Into<String>) -> Self {
        Self {
            client,
            collection_url: collection_url.into(),
            _marker: PhantomData,
        }
    }

    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }

    pub fn item_url(&self, id: i64) -> String {
        format!("{}/{}/", self.collection_url.trim_end_matches('/'), id)
    }

    pub async fn list(&self) -> ApiResult<Vec<R>> {
        self.client.get(&self.collection_url).await
    }

    pub async fn get(&self, id: i64) -> ApiResult<R> {
        self.client.get(&self.item_url(id)).await
    }

    pub async fn create(&self, payload: P) -> ApiResult<R> {
        let body = payload.into_body()?;
        self.client.fetch(Method::Post, &self.collection_url, body).await
    }

    /// Full replace.
    pub async fn update(&self, id: i64, payload: P) -> ApiResult<R> {
        let body = payload.into_body()?;
        self.client.fetch(Method::Put, &self.item_url(id), body).await
    }

    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        self.client.delete(&self.item_url(id)).await
    }
}

impl<P, R> std::fmt::Debug for Resource<P, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("collection_url", &self.collection_url)
            .finish()
    }
}

pub type ProblemFramingApi = Resource<ProblemFramingPayload, ProblemFramingResponse>;
pub type DataProcessingApi = Resource<DataProcessingPayload, DataProcessingResponse>;
pub type TrainingModelApi = Resource<TrainingModelPayload, TrainingModelResponse>;
pub type DatasetRequestApi = Resource<DatasetRequestPayload, DatasetRequestResponse>;
pub type ProjectApi = Resource<ProjectPayload, ProjectResponse>;

#[derive(Clone, Debug)]
pub struct RemoteServices {
    pub problem_framings: ProblemFramingApi,
    pub data_processings: DataProcessingApi,
    pub training_models: TrainingModelApi,
    pub dataset_requests: DatasetRequestApi,
    pub projects: ProjectApi,
}

impl RemoteServices {
    pub fn new(client: ApiClient) -> Self {
        let config: ApiConfig = client.config().clone();
        Self {
            problem_framings: Resource::new(client.clone(), config.content_url(PROBLEM_FRAMINGS)),
            data_processings: Resource::new(client.clone(), config.content_url(DATA_PROCESSINGS)),
            training_models: Resource::new(client.clone(), config.content_url(TRAINING_MODELS)),
            dataset_requests: Resource::new(client.clone(), config.content_url(DATASET_REQUESTS)),
            projects: Resource::new(client, config.legacy_projects_url()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RemoteServices;
    use crate::config::ApiConfig;
    use crate::errors::{ApiError, AppError};
    use crate::models::DataProcessing;
    use crate::remote::auth::TokenStore;
    use crate::remote::client::ApiClient;
    use crate::remote::dto::DataProcessingPayload;
    use crate::remote::testing::FakeTransport;
    use crate::remote::transport::{
        ApiRequest, ApiResponse, FileAttachment, FormPart, HttpTransport, Method, RequestBody,
    };
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use std::sync::{Arc, Mutex};

    const BASE: &str = "http://backend.test/";
    const PROCESSINGS: &str = "http://backend.test/api-content/data-processings/";

    fn services(transport: Arc<dyn HttpTransport>) -> RemoteServices {
        let config = ApiConfig {
            base_url: BASE.to_string(),
            retry_backoff_ms: 0,
            get_retries: 0,
            ..Default::default()
        };
        RemoteServices::new(ApiClient::new(config, transport, TokenStore::ephemeral(Some("t".to_string()))))
    }

    /// Behaves like the backend's multipart handler for one data-processing
    /// record: text parts overwrite, `processed_file` only changes when a
    /// file part is sent.
    struct ProcessingBackend {
        record: Mutex<Map<String, Value>>,
    }

    impl ProcessingBackend {
        fn new() -> Self {
            let mut record = Map::new();
            record.insert("id".to_string(), json!(5));
            record.insert("project".to_string(), json!(1));
            record.insert("project_detail".to_string(), json!({ "id": 1, "project_name": "Churn Model" }));
            record.insert("processed_file".to_string(), json!("http://backend.test/media/raw.csv"));
            Self {
                record: Mutex::new(record),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for ProcessingBackend {
        async fn execute(&self, request: ApiRequest) -> crate::errors::ApiResult<ApiResponse> {
            let mut record = self.record.lock().expect("record lock");
            if request.method == Method::Put && request.url == format!("{}5/", PROCESSINGS) {
                if let RequestBody::Multipart(parts) = &request.body {
                    for part in parts {
                        match part {
                            FormPart::Text { name, value } if name == "project" => {
                                record.insert(name.clone(), json!(value.parse::<i64>().unwrap_or_default()));
                            }
                            FormPart::Text { name, value } => {
                                record.insert(name.clone(), json!(value));
                            }
                            FormPart::File { name, file } => {
                                record.insert(name.clone(), json!(format!("http://backend.test/media/{}", file.file_name)));
                            }
                        }
                    }
                }
            }
            Ok(ApiResponse {
                status: 200,
                body: Value::Object(record.clone()).to_string(),
            })
        }
    }

    #[tokio::test]
    async fn update_without_file_keeps_the_stored_reference() {
        let services = services(Arc::new(ProcessingBackend::new()));
        let mut processing = DataProcessing::new("Churn Model");
        processing.processing_status = "Cleaned".to_string();

        let updated = services
            .data_processings
            .update(5, DataProcessingPayload::from_entity(&processing, 1, None))
            .await
            .expect("update");
        assert_eq!(updated.processed_file.as_deref(), Some("http://backend.test/media/raw.csv"));
        assert_eq!(updated.processing_status.as_deref(), Some("Cleaned"));

        let file = FileAttachment::new("clean.csv", "text/csv", b"a,b\n".to_vec());
        let replaced = services
            .data_processings
            .update(5, DataProcessingPayload::from_entity(&processing, 1, Some(file)))
            .await
            .expect("update with file")
            .into_entity();
        assert_eq!(replaced.processed_file_name.as_deref(), Some("clean.csv"));
    }

    #[tokio::test]
    async fn server_error_on_list_is_a_failure_carrying_the_status() {
        let transport = Arc::new(FakeTransport::default());
        transport.respond(
            Method::Get,
            "http://backend.test/api-content/dataset-requests/",
            500,
            "Internal Server Error",
        );
        let services = services(transport);

        let error = services.dataset_requests.list().await.expect_err("500");
        assert_eq!(error.status(), Some(500));
        let app_error = AppError::from(error);
        assert!(matches!(app_error, AppError::Remote(ApiError::Http { status: 500, .. })));
    }

    #[tokio::test]
    async fn item_urls_and_legacy_projects_use_the_shared_base() {
        let transport = Arc::new(FakeTransport::default());
        transport.respond(
            Method::Get,
            "http://backend.test/api-content/problem-framings/3/",
            200,
            r#"{ "id": 3, "problem_description": {}, "target": "Churn" }"#,
        );
        transport.respond(
            Method::Get,
            "http://backend.test/projects/",
            200,
            r#"[{ "id": 1, "project_name": "Churn Model", "status": "Ongoing" }]"#,
        );
        transport.respond(Method::Delete, "http://backend.test/api-content/training-models/8/", 204, "");
        let services = services(transport.clone());

        let framing = services.problem_framings.get(3).await.expect("get");
        assert!(framing.problem_description.is_none());
        let projects = services.projects.list().await.expect("projects");
        assert_eq!(projects[0].project_name.as_deref(), Some("Churn Model"));
        services.training_models.delete(8).await.expect("delete");

        assert!(transport
            .requests()
            .iter()
            .all(|request| request.header("Authorization") == Some("Token t")));
    }
}
