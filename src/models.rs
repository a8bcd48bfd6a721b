use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const PROJECT_STATUS_ONGOING: &str = "Ongoing";
pub const PROJECT_STATUS_COMPLETE: &str = "Complete";

/// Primary key of the single profile row.
pub const PROFILE_ID: i64 = 1;

const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("valid email regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Option<i64>,
    /// Backend id once the project has been pushed or fetched.
    pub remote_id: Option<i64>,
    pub project_name: String,
    pub description: String,
    pub status: String,
    pub created_by: String,
    pub start_date: String,
    pub end_date: String,
    pub client_name: String,
    pub location: String,
}

impl Project {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            status: PROJECT_STATUS_ONGOING.to_string(),
            ..Default::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status.eq_ignore_ascii_case(PROJECT_STATUS_COMPLETE)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.project_name.trim().is_empty() {
            return Err(AppError::Validation("Project name cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Problem framing for a project, attached by project name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataEntry {
    pub id: Option<i64>,
    pub remote_id: Option<i64>,
    pub project_name: String,
    pub problem_description: String,
    pub target: String,
    pub stock: String,
    pub inflow: String,
    pub outflow: String,
    pub data_needed: String,
    pub framed_by: String,
    pub date_created: DateTime<Utc>,
}

impl DataEntry {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            id: None,
            remote_id: None,
            project_name: project_name.into(),
            problem_description: String::new(),
            target: String::new(),
            stock: String::new(),
            inflow: String::new(),
            outflow: String::new(),
            data_needed: String::new(),
            framed_by: String::new(),
            date_created: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataProcessing {
    pub id: Option<i64>,
    pub remote_id: Option<i64>,
    pub project_name: String,
    pub source_data: String,
    pub transformation_steps: String,
    pub feature_engineering: String,
    pub processed_file_location: Option<String>,
    pub processed_file_name: Option<String>,
    pub processing_status: String,
    pub created_at: DateTime<Utc>,
}

impl DataProcessing {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            id: None,
            remote_id: None,
            project_name: project_name.into(),
            source_data: String::new(),
            transformation_steps: String::new(),
            feature_engineering: String::new(),
            processed_file_location: None,
            processed_file_name: None,
            processing_status: String::new(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTraining {
    pub id: Option<i64>,
    pub remote_id: Option<i64>,
    pub project_name: String,
    pub model_name: String,
    pub model_type: String,
    pub algorithm: String,
    pub training_data: String,
    pub performance: String,
    pub model_path: Option<String>,
    pub refinement_strategy: String,
    pub performance_after_refinement: String,
    pub created_at: DateTime<Utc>,
}

impl ModelTraining {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            id: None,
            remote_id: None,
            project_name: project_name.into(),
            model_name: String::new(),
            model_type: String::new(),
            algorithm: String::new(),
            training_data: String::new(),
            performance: String::new(),
            model_path: None,
            refinement_strategy: String::new(),
            performance_after_refinement: String::new(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRequest {
    pub id: Option<i64>,
    pub remote_id: Option<i64>,
    pub project_name: String,
    pub description: String,
    pub feature_count: i64,
    pub dataset_size: String,
    pub expected_file_format: String,
    pub data_type: String,
    pub data_processing: String,
    pub start_date: String,
    pub end_date: String,
    pub target: String,
    pub requested_by: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl DatasetRequest {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            id: None,
            remote_id: None,
            project_name: project_name.into(),
            description: String::new(),
            feature_count: 0,
            dataset_size: String::new(),
            expected_file_format: String::new(),
            data_type: String::new(),
            data_processing: String::new(),
            start_date: String::new(),
            end_date: String::new(),
            target: String::new(),
            requested_by: String::new(),
            status: String::new(),
            created_at: Utc::now(),
        }
    }
}

/// The device owner's profile. Always stored under [`PROFILE_ID`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub date_of_birth: String,
    pub region: String,
    pub country: String,
    pub mobile: String,
    pub photo_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Option<i64>,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

impl User {
    pub fn new(email: &str, username: &str, password: &str) -> AppResult<Self> {
        Self::with_cost(email, username, password, bcrypt::DEFAULT_COST)
    }

    /// Same as [`User::new`] with an explicit bcrypt cost.
    pub fn with_cost(email: &str, username: &str, password: &str, cost: u32) -> AppResult<Self> {
        let email = normalize_email(email)?;
        if username.trim().is_empty() {
            return Err(AppError::Validation("Username cannot be empty".to_string()));
        }
        Ok(Self {
            id: None,
            email,
            username: username.trim().to_string(),
            password_hash: hash_password(password, cost)?,
        })
    }

    pub fn verify_password(&self, password: &str) -> AppResult<bool> {
        bcrypt::verify(password, &self.password_hash)
            .map_err(|error| AppError::Internal(format!("Failed to verify password: {}", error)))
    }

    pub fn set_password(&self, password: &str, cost: u32) -> AppResult<Self> {
        Ok(Self {
            password_hash: hash_password(password, cost)?,
            ..self.clone()
        })
    }
}

pub fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_ascii_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(AppError::Validation(format!("Invalid email address '{}'", raw.trim())));
    }
    Ok(email)
}

fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    bcrypt::hash(password, cost)
        .map_err(|error| AppError::Internal(format!("Failed to hash password: {}", error)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MeaningfulObjectives {
    pub mo_id: Option<i64>,
    pub project_id: i64,
    pub objective_name: Option<String>,
    pub organizational: Option<String>,
    pub leading_indicators: Option<String>,
    pub user_outcomes: Option<String>,
    pub model_properties: Option<String>,
}

impl MeaningfulObjectives {
    pub fn new(project_id: i64) -> Self {
        Self {
            project_id,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_email, DataProcessing, Project, User};
    use crate::errors::AppError;

    const TEST_COST: u32 = 4;

    #[test]
    fn project_requires_a_name() {
        assert!(Project::new("Churn Model").validate().is_ok());
        let error = Project::new("   ").validate().expect_err("blank name");
        assert!(matches!(error, AppError::Validation(_)));
    }

    #[test]
    fn new_project_defaults_to_ongoing() {
        let project = Project::new("Churn Model");
        assert_eq!(project.status, "Ongoing");
        assert!(!project.is_complete());
    }

    #[test]
    fn processing_defaults_created_at_to_now() {
        let before = chrono::Utc::now();
        let processing = DataProcessing::new("Churn Model");
        assert!(processing.created_at >= before);
        assert!(processing.processed_file_name.is_none());
    }

    #[test]
    fn user_password_is_hashed_and_verifiable() {
        let user = User::with_cost("Ada@Example.com ", "ada", "correct horse", TEST_COST)
            .expect("user");
        assert_eq!(user.email, "ada@example.com");
        assert_ne!(user.password_hash, "correct horse");
        assert!(user.verify_password("correct horse").expect("verify"));
        assert!(!user.verify_password("wrong horse").expect("verify"));
    }

    #[test]
    fn user_rejects_short_password_and_bad_email() {
        assert!(matches!(
            User::with_cost("ada@example.com", "ada", "short", TEST_COST),
            Err(AppError::Validation(_))
        ));
        assert!(normalize_email("not-an-email").is_err());
    }
}
