//! Wire shapes for the REST backend.
//!
//! Responses carry server-computed fields and nested `*_detail` lookups;
//! payloads carry only foreign-key ids and editable fields. Text fields in
//! responses go through [`empty_object_as_none`] because the backend sends
//! `{}` for some unset strings.

use super::transport::{FileAttachment, FormPart, RequestBody};
use crate::errors::{ApiError, ApiResult};
use crate::models::{DataEntry, DataProcessing, DatasetRequest, ModelTraining, Project};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Decodes a string field, treating `null`, a missing key and `{}` as absent.
pub fn empty_object_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(Value::Number(value)) => Ok(Some(value.to_string())),
        Some(Value::Bool(value)) => Ok(Some(value.to_string())),
        Some(other) => Err(D::Error::custom(format!("expected a string, found {}", other))),
    }
}

/// Nested lookup objects; `null` and `{}` both mean "no detail".
fn lenient_detail<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => serde_json::from_value(value).map(Some).map_err(D::Error::custom),
    }
}

/// Integers that sometimes arrive quoted.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(Value::Number(value)) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected an integer, found {}", value))),
        Some(Value::String(value)) if value.trim().is_empty() => Ok(None),
        Some(Value::String(value)) => value
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected an integer, found '{}'", value))),
        Some(other) => Err(D::Error::custom(format!("expected an integer, found {}", other))),
    }
}

fn parse_remote_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|value| value.and_utc())
}

fn file_name_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn json_body<T: Serialize>(value: &T) -> ApiResult<RequestBody> {
    serde_json::to_value(value)
        .map(RequestBody::Json)
        .map_err(|error| ApiError::Transport(format!("failed to encode request: {}", error)))
}

pub trait IntoRequestBody {
    fn into_body(self) -> ApiResult<RequestBody>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDetail {
    pub id: i64,
    #[serde(default, alias = "name", alias = "projectName", deserialize_with = "empty_object_as_none")]
    pub project_name: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetail {
    pub id: i64,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub email: Option<String>,
}

impl UserDetail {
    pub fn display_name(&self) -> Option<String> {
        self.username
            .clone()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| self.email.clone())
    }
}

fn project_name_of(detail: Option<ProjectDetail>) -> String {
    detail.and_then(|detail| detail.project_name).unwrap_or_default()
}

// problem-framings

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemFramingResponse {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub project: Option<i64>,
    #[serde(default, deserialize_with = "lenient_detail")]
    pub project_detail: Option<ProjectDetail>,
    #[serde(default, alias = "problemDescription", deserialize_with = "empty_object_as_none")]
    pub problem_description: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub target: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub stock: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub inflow: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub outflow: Option<String>,
    #[serde(default, alias = "dataNeeded", deserialize_with = "empty_object_as_none")]
    pub data_needed: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub framed_by: Option<i64>,
    #[serde(default, deserialize_with = "lenient_detail")]
    pub framed_by_detail: Option<UserDetail>,
    #[serde(default, alias = "dateCreated", deserialize_with = "empty_object_as_none")]
    pub date_created: Option<String>,
}

impl ProblemFramingResponse {
    /// Cache row carrying the server id as `remote_id`; the local id is
    /// assigned when the row is merged.
    pub fn into_entity(self) -> DataEntry {
        DataEntry {
            id: None,
            remote_id: Some(self.id),
            date_created: parse_remote_time(self.date_created.as_deref()).unwrap_or_else(Utc::now),
            framed_by: self
                .framed_by_detail
                .and_then(|detail| detail.display_name())
                .unwrap_or_default(),
            project_name: project_name_of(self.project_detail),
            problem_description: self.problem_description.unwrap_or_default(),
            target: self.target.unwrap_or_default(),
            stock: self.stock.unwrap_or_default(),
            inflow: self.inflow.unwrap_or_default(),
            outflow: self.outflow.unwrap_or_default(),
            data_needed: self.data_needed.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemFramingPayload {
    pub project: i64,
    pub problem_description: String,
    pub target: String,
    pub stock: String,
    pub inflow: String,
    pub outflow: String,
    pub data_needed: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framed_by: Option<i64>,
}

impl ProblemFramingPayload {
    pub fn from_entity(entry: &DataEntry, project: i64, framed_by: Option<i64>) -> Self {
        Self {
            project,
            problem_description: entry.problem_description.clone(),
            target: entry.target.clone(),
            stock: entry.stock.clone(),
            inflow: entry.inflow.clone(),
            outflow: entry.outflow.clone(),
            data_needed: entry.data_needed.clone(),
            framed_by,
        }
    }
}

impl IntoRequestBody for ProblemFramingPayload {
    fn into_body(self) -> ApiResult<RequestBody> {
        json_body(&self)
    }
}

// data-processings

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataProcessingResponse {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub project: Option<i64>,
    #[serde(default, deserialize_with = "lenient_detail")]
    pub project_detail: Option<ProjectDetail>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub source_data: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub transformation_steps: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub feature_engineering: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub processed_file: Option<String>,
    #[serde(default, alias = "status", deserialize_with = "empty_object_as_none")]
    pub processing_status: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub created_at: Option<String>,
}

impl DataProcessingResponse {
    pub fn into_entity(self) -> DataProcessing {
        DataProcessing {
            id: None,
            remote_id: Some(self.id),
            project_name: project_name_of(self.project_detail),
            source_data: self.source_data.unwrap_or_default(),
            transformation_steps: self.transformation_steps.unwrap_or_default(),
            feature_engineering: self.feature_engineering.unwrap_or_default(),
            processed_file_name: self.processed_file.as_deref().and_then(file_name_from_url),
            processed_file_location: self.processed_file,
            processing_status: self.processing_status.unwrap_or_default(),
            created_at: parse_remote_time(self.created_at.as_deref()).unwrap_or_else(Utc::now),
        }
    }
}

/// Sent as multipart; `processed_file` is only attached when a new file was picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataProcessingPayload {
    pub project: i64,
    pub source_data: String,
    pub transformation_steps: String,
    pub feature_engineering: String,
    pub processing_status: String,
    pub processed_file: Option<FileAttachment>,
}

impl DataProcessingPayload {
    pub fn from_entity(processing: &DataProcessing, project: i64, processed_file: Option<FileAttachment>) -> Self {
        Self {
            project,
            source_data: processing.source_data.clone(),
            transformation_steps: processing.transformation_steps.clone(),
            feature_engineering: processing.feature_engineering.clone(),
            processing_status: processing.processing_status.clone(),
            processed_file,
        }
    }
}

impl IntoRequestBody for DataProcessingPayload {
    fn into_body(self) -> ApiResult<RequestBody> {
        let mut parts = vec![
            FormPart::text("project", self.project),
            FormPart::text("source_data", self.source_data),
            FormPart::text("transformation_steps", self.transformation_steps),
            FormPart::text("feature_engineering", self.feature_engineering),
            FormPart::text("processing_status", self.processing_status),
        ];
        if let Some(file) = self.processed_file {
            parts.push(FormPart::File {
                name: "processed_file".to_string(),
                file,
            });
        }
        Ok(RequestBody::Multipart(parts))
    }
}

// training-models

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingModelResponse {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub project: Option<i64>,
    #[serde(default, deserialize_with = "lenient_detail")]
    pub project_detail: Option<ProjectDetail>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub model_name: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub model_type: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub algorithm: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub training_data: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub performance: Option<String>,
    #[serde(default, alias = "model_path", deserialize_with = "empty_object_as_none")]
    pub model_file: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub refinement_strategy: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub performance_after_refinement: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub created_at: Option<String>,
}

impl TrainingModelResponse {
    pub fn into_entity(self) -> ModelTraining {
        ModelTraining {
            id: None,
            remote_id: Some(self.id),
            project_name: project_name_of(self.project_detail),
            model_name: self.model_name.unwrap_or_default(),
            model_type: self.model_type.unwrap_or_default(),
            algorithm: self.algorithm.unwrap_or_default(),
            training_data: self.training_data.unwrap_or_default(),
            performance: self.performance.unwrap_or_default(),
            model_path: self.model_file,
            refinement_strategy: self.refinement_strategy.unwrap_or_default(),
            performance_after_refinement: self.performance_after_refinement.unwrap_or_default(),
            created_at: parse_remote_time(self.created_at.as_deref()).unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingModelPayload {
    pub project: i64,
    pub model_name: String,
    pub model_type: String,
    pub algorithm: String,
    pub training_data: String,
    pub performance: String,
    pub refinement_strategy: String,
    pub performance_after_refinement: String,
    pub model_file: Option<FileAttachment>,
}

impl TrainingModelPayload {
    pub fn from_entity(training: &ModelTraining, project: i64, model_file: Option<FileAttachment>) -> Self {
        Self {
            project,
            model_name: training.model_name.clone(),
            model_type: training.model_type.clone(),
            algorithm: training.algorithm.clone(),
            training_data: training.training_data.clone(),
            performance: training.performance.clone(),
            refinement_strategy: training.refinement_strategy.clone(),
            performance_after_refinement: training.performance_after_refinement.clone(),
            model_file,
        }
    }
}

impl IntoRequestBody for TrainingModelPayload {
    fn into_body(self) -> ApiResult<RequestBody> {
        let mut parts = vec![
            FormPart::text("project", self.project),
            FormPart::text("model_name", self.model_name),
            FormPart::text("model_type", self.model_type),
            FormPart::text("algorithm", self.algorithm),
            FormPart::text("training_data", self.training_data),
            FormPart::text("performance", self.performance),
            FormPart::text("refinement_strategy", self.refinement_strategy),
            FormPart::text("performance_after_refinement", self.performance_after_refinement),
        ];
        if let Some(file) = self.model_file {
            parts.push(FormPart::File {
                name: "model_file".to_string(),
                file,
            });
        }
        Ok(RequestBody::Multipart(parts))
    }
}

// dataset-requests

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRequestResponse {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub project: Option<i64>,
    #[serde(default, deserialize_with = "lenient_detail")]
    pub project_detail: Option<ProjectDetail>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub description: Option<String>,
    #[serde(default, alias = "featureCount", deserialize_with = "lenient_i64")]
    pub feature_count: Option<i64>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub dataset_size: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub expected_file_format: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub data_type: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub data_processing: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub start_date: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub target: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub requested_by: Option<i64>,
    #[serde(default, deserialize_with = "lenient_detail")]
    pub requested_by_detail: Option<UserDetail>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub created_at: Option<String>,
}

impl DatasetRequestResponse {
    pub fn into_entity(self) -> DatasetRequest {
        DatasetRequest {
            id: None,
            remote_id: Some(self.id),
            project_name: project_name_of(self.project_detail),
            description: self.description.unwrap_or_default(),
            feature_count: self.feature_count.unwrap_or_default(),
            dataset_size: self.dataset_size.unwrap_or_default(),
            expected_file_format: self.expected_file_format.unwrap_or_default(),
            data_type: self.data_type.unwrap_or_default(),
            data_processing: self.data_processing.unwrap_or_default(),
            start_date: self.start_date.unwrap_or_default(),
            end_date: self.end_date.unwrap_or_default(),
            target: self.target.unwrap_or_default(),
            requested_by: self
                .requested_by_detail
                .and_then(|detail| detail.display_name())
                .unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            created_at: parse_remote_time(self.created_at.as_deref()).unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRequestPayload {
    pub project: i64,
    pub description: String,
    pub feature_count: i64,
    pub dataset_size: String,
    pub expected_file_format: String,
    pub data_type: String,
    pub data_processing: String,
    pub start_date: String,
    pub end_date: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<i64>,
    pub status: String,
}

impl DatasetRequestPayload {
    pub fn from_entity(request: &DatasetRequest, project: i64, requested_by: Option<i64>) -> Self {
        Self {
            project,
            description: request.description.clone(),
            feature_count: request.feature_count,
            dataset_size: request.dataset_size.clone(),
            expected_file_format: request.expected_file_format.clone(),
            data_type: request.data_type.clone(),
            data_processing: request.data_processing.clone(),
            start_date: request.start_date.clone(),
            end_date: request.end_date.clone(),
            target: request.target.clone(),
            requested_by,
            status: request.status.clone(),
        }
    }
}

impl IntoRequestBody for DatasetRequestPayload {
    fn into_body(self) -> ApiResult<RequestBody> {
        json_body(&self)
    }
}

// legacy projects/

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectResponse {
    pub id: i64,
    #[serde(default, alias = "projectName", alias = "name", deserialize_with = "empty_object_as_none")]
    pub project_name: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub status: Option<String>,
    #[serde(default, alias = "createdBy", deserialize_with = "empty_object_as_none")]
    pub created_by: Option<String>,
    #[serde(default, alias = "startDate", deserialize_with = "empty_object_as_none")]
    pub start_date: Option<String>,
    #[serde(default, alias = "endDate", deserialize_with = "empty_object_as_none")]
    pub end_date: Option<String>,
    #[serde(default, alias = "clientName", deserialize_with = "empty_object_as_none")]
    pub client_name: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub location: Option<String>,
}

impl ProjectResponse {
    pub fn into_entity(self) -> Project {
        Project {
            id: None,
            remote_id: Some(self.id),
            project_name: self.project_name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            created_by: self.created_by.unwrap_or_default(),
            start_date: self.start_date.unwrap_or_default(),
            end_date: self.end_date.unwrap_or_default(),
            client_name: self.client_name.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPayload {
    pub project_name: String,
    pub description: String,
    pub status: String,
    pub created_by: String,
    pub start_date: String,
    pub end_date: String,
    pub client_name: String,
    pub location: String,
}

impl From<&Project> for ProjectPayload {
    fn from(project: &Project) -> Self {
        Self {
            project_name: project.project_name.clone(),
            description: project.description.clone(),
            status: project.status.clone(),
            created_by: project.created_by.clone(),
            start_date: project.start_date.clone(),
            end_date: project.end_date.clone(),
            client_name: project.client_name.clone(),
            location: project.location.clone(),
        }
    }
}

impl IntoRequestBody for ProjectPayload {
    fn into_body(self) -> ApiResult<RequestBody> {
        json_body(&self)
    }
}
