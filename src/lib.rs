//! Core of the ML lifecycle tracker: a local SQLite cache of projects and
//! their lifecycle records, kept in step with the REST backend.

pub mod config;
pub mod context;
pub mod db;
pub mod details;
pub mod errors;
pub mod fields;
pub mod logging;
pub mod models;
pub mod remote;
pub mod repository;
pub mod sync;

pub use config::{ApiConfig, AppConfig};
pub use context::AppContext;
pub use db::Database;
pub use details::{Availability, ProjectDetails, ProjectDetailsService, NOT_AVAILABLE};
pub use errors::{ApiError, ApiResult, AppError, AppResult};
pub use fields::EditableEntity;
pub use models::{
    DataEntry, DataProcessing, DatasetRequest, MeaningfulObjectives, ModelTraining, Profile, Project, User,
};
pub use repository::Repository;
pub use sync::{SyncReport, SyncService};
