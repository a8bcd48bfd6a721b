//! Read-only view joining a project with its latest associated records.

use crate::errors::AppResult;
use crate::models::{DataEntry, DataProcessing, ModelTraining, Project};
use crate::repository::{DataEntryRepository, DataProcessingRepository, ModelTrainingRepository, ProjectRepository};
use serde::Serialize;
use std::fmt;

pub const NOT_AVAILABLE: &str = "Not available";

/// An associated record that may be missing. Missing records render as
/// [`NOT_AVAILABLE`] instead of being left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "camelCase")]
pub enum Availability<T> {
    Available(T),
    NotAvailable,
}

impl<T> Availability<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Self::Available(value) => Some(value),
            Self::NotAvailable => None,
        }
    }

    /// Text for one field of the record; blank values count as missing.
    pub fn field(&self, read: impl FnOnce(&T) -> Option<&str>) -> String {
        present(self.as_option().and_then(read))
    }
}

impl<T> From<Option<T>> for Availability<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::NotAvailable, Self::Available)
    }
}

impl<T: fmt::Display> fmt::Display for Availability<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(value) => value.fmt(f),
            Self::NotAvailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

fn present(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryLine {
    pub section: &'static str,
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetails {
    pub project: Project,
    pub problem_framing: Availability<DataEntry>,
    pub data_processing: Availability<DataProcessing>,
    pub model_training: Availability<ModelTraining>,
}

impl ProjectDetails {
    /// Labelled rows for display or export, in a fixed order.
    pub fn summary_lines(&self) -> Vec<SummaryLine> {
        let project = &self.project;
        let framing = &self.problem_framing;
        let processing = &self.data_processing;
        let training = &self.model_training;

        let rows: Vec<(&'static str, &'static str, String)> = vec![
            ("Project", "Name", present(Some(project.project_name.as_str()))),
            ("Project", "Description", present(Some(project.description.as_str()))),
            ("Project", "Status", present(Some(project.status.as_str()))),
            ("Project", "Created by", present(Some(project.created_by.as_str()))),
            ("Project", "Start date", present(Some(project.start_date.as_str()))),
            ("Project", "End date", present(Some(project.end_date.as_str()))),
            ("Project", "Client", present(Some(project.client_name.as_str()))),
            ("Project", "Location", present(Some(project.location.as_str()))),
            ("Problem framing", "Problem description", framing.field(|e| Some(e.problem_description.as_str()))),
            ("Problem framing", "Target", framing.field(|e| Some(e.target.as_str()))),
            ("Problem framing", "Stock", framing.field(|e| Some(e.stock.as_str()))),
            ("Problem framing", "Inflow", framing.field(|e| Some(e.inflow.as_str()))),
            ("Problem framing", "Outflow", framing.field(|e| Some(e.outflow.as_str()))),
            ("Problem framing", "Data needed", framing.field(|e| Some(e.data_needed.as_str()))),
            ("Problem framing", "Framed by", framing.field(|e| Some(e.framed_by.as_str()))),
            ("Data processing", "Source data", processing.field(|p| Some(p.source_data.as_str()))),
            ("Data processing", "Transformation steps", processing.field(|p| Some(p.transformation_steps.as_str()))),
            ("Data processing", "Feature engineering", processing.field(|p| Some(p.feature_engineering.as_str()))),
            ("Data processing", "Processed file", processing.field(|p| p.processed_file_name.as_deref())),
            ("Data processing", "Status", processing.field(|p| Some(p.processing_status.as_str()))),
            ("Model training", "Model name", training.field(|t| Some(t.model_name.as_str()))),
            ("Model training", "Model type", training.field(|t| Some(t.model_type.as_str()))),
            ("Model training", "Algorithm", training.field(|t| Some(t.algorithm.as_str()))),
            ("Model training", "Training data", training.field(|t| Some(t.training_data.as_str()))),
            ("Model training", "Performance", training.field(|t| Some(t.performance.as_str()))),
            ("Model training", "Refinement strategy", training.field(|t| Some(t.refinement_strategy.as_str()))),
            (
                "Model training",
                "Performance after refinement",
                training.field(|t| Some(t.performance_after_refinement.as_str())),
            ),
            ("Model training", "Model file", training.field(|t| t.model_path.as_deref())),
        ];

        rows.into_iter()
            .map(|(section, label, value)| SummaryLine { section, label, value })
            .collect()
    }
}

#[derive(Clone)]
pub struct ProjectDetailsService {
    projects: ProjectRepository,
    entries: DataEntryRepository,
    processings: DataProcessingRepository,
    trainings: ModelTrainingRepository,
}

impl ProjectDetailsService {
    pub fn new(
        projects: ProjectRepository,
        entries: DataEntryRepository,
        processings: DataProcessingRepository,
        trainings: ModelTrainingRepository,
    ) -> Self {
        Self {
            projects,
            entries,
            processings,
            trainings,
        }
    }

    /// `None` when the project itself does not exist.
    pub async fn load(&self, project_id: i64) -> AppResult<Option<ProjectDetails>> {
        match self.projects.get(project_id).await? {
            Some(project) => self.assemble(project).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn load_by_name(&self, project_name: &str) -> AppResult<Option<ProjectDetails>> {
        match self.projects.find_by_name(project_name).await? {
            Some(project) => self.assemble(project).await.map(Some),
            None => Ok(None),
        }
    }

    async fn assemble(&self, project: Project) -> AppResult<ProjectDetails> {
        let name = project.project_name.as_str();
        let (problem_framing, data_processing, model_training) = tokio::try_join!(
            self.entries.latest_for_project(name),
            self.processings.latest_for_project(name),
            self.trainings.latest_for_project(name),
        )?;
        Ok(ProjectDetails {
            problem_framing: problem_framing.into(),
            data_processing: data_processing.into(),
            model_training: model_training.into(),
            project,
        })
    }
}
