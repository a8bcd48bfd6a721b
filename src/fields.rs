//! Field-by-name setters used by generic form binding.
//!
//! Every setter returns a new value; the receiver is never mutated. Names are
//! the camelCase form keys (`projectName`); snake_case spellings resolve to
//! the same field.

use crate::errors::{AppError, AppResult};
use crate::models::{
    DataEntry, DataProcessing, DatasetRequest, MeaningfulObjectives, ModelTraining, Profile, Project,
};

pub trait EditableEntity: Sized + Clone {
    const ENTITY: &'static str;
    const FIELDS: &'static [&'static str];

    /// Returns a copy with `field` set to `value`, or `AppError::UnknownField`.
    fn with_field(&self, field: &str, value: &str) -> AppResult<Self>;

    /// Applies several assignments in order, stopping at the first failure.
    fn with_fields<'a, I>(&self, assignments: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        assignments
            .into_iter()
            .try_fold(self.clone(), |entity, (field, value)| entity.with_field(field, value))
    }
}

fn canonical(field: &str) -> String {
    field
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn unknown<T>(entity: &'static str, field: &str) -> AppResult<T> {
    Err(AppError::UnknownField {
        entity,
        field: field.to_string(),
    })
}

fn optional(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl EditableEntity for Project {
    const ENTITY: &'static str = "Project";
    const FIELDS: &'static [&'static str] = &[
        "projectName",
        "description",
        "status",
        "createdBy",
        "startDate",
        "endDate",
        "clientName",
        "location",
    ];

    fn with_field(&self, field: &str, value: &str) -> AppResult<Self> {
        let mut next = self.clone();
        let value = value.to_string();
        match canonical(field).as_str() {
            "projectname" => next.project_name = value,
            "description" => next.description = value,
            "status" => next.status = value,
            "createdby" => next.created_by = value,
            "startdate" => next.start_date = value,
            "enddate" => next.end_date = value,
            "clientname" => next.client_name = value,
            "location" => next.location = value,
            _ => return unknown(Self::ENTITY, field),
        }
        Ok(next)
    }
}

impl EditableEntity for DataEntry {
    const ENTITY: &'static str = "DataEntry";
    const FIELDS: &'static [&'static str] = &[
        "projectName",
        "problemDescription",
        "target",
        "stock",
        "inflow",
        "outflow",
        "dataNeeded",
        "framedBy",
    ];

    fn with_field(&self, field: &str, value: &str) -> AppResult<Self> {
        let mut next = self.clone();
        let value = value.to_string();
        match canonical(field).as_str() {
            "projectname" => next.project_name = value,
            "problemdescription" => next.problem_description = value,
            "target" => next.target = value,
            "stock" => next.stock = value,
            "inflow" => next.inflow = value,
            "outflow" => next.outflow = value,
            "dataneeded" => next.data_needed = value,
            "framedby" => next.framed_by = value,
            _ => return unknown(Self::ENTITY, field),
        }
        Ok(next)
    }
}

impl EditableEntity for DataProcessing {
    const ENTITY: &'static str = "DataProcessing";
    const FIELDS: &'static [&'static str] = &[
        "projectName",
        "sourceData",
        "transformationSteps",
        "featureEngineering",
        "processedFileLocation",
        "processedFileName",
        "processingStatus",
    ];

    fn with_field(&self, field: &str, value: &str) -> AppResult<Self> {
        let mut next = self.clone();
        match canonical(field).as_str() {
            "projectname" => next.project_name = value.to_string(),
            "sourcedata" => next.source_data = value.to_string(),
            "transformationsteps" => next.transformation_steps = value.to_string(),
            "featureengineering" => next.feature_engineering = value.to_string(),
            "processedfilelocation" => next.processed_file_location = optional(value),
            "processedfilename" => next.processed_file_name = optional(value),
            "processingstatus" => next.processing_status = value.to_string(),
            _ => return unknown(Self::ENTITY, field),
        }
        Ok(next)
    }
}

impl EditableEntity for ModelTraining {
    const ENTITY: &'static str = "ModelTraining";
    const FIELDS: &'static [&'static str] = &[
        "projectName",
        "modelName",
        "modelType",
        "algorithm",
        "trainingData",
        "performance",
        "modelPath",
        "refinementStrategy",
        "performanceAfterRefinement",
    ];

    fn with_field(&self, field: &str, value: &str) -> AppResult<Self> {
        let mut next = self.clone();
        match canonical(field).as_str() {
            "projectname" => next.project_name = value.to_string(),
            "modelname" => next.model_name = value.to_string(),
            "modeltype" => next.model_type = value.to_string(),
            "algorithm" => next.algorithm = value.to_string(),
            "trainingdata" => next.training_data = value.to_string(),
            "performance" => next.performance = value.to_string(),
            "modelpath" => next.model_path = optional(value),
            "refinementstrategy" => next.refinement_strategy = value.to_string(),
            "performanceafterrefinement" => next.performance_after_refinement = value.to_string(),
            _ => return unknown(Self::ENTITY, field),
        }
        Ok(next)
    }
}

impl EditableEntity for DatasetRequest {
    const ENTITY: &'static str = "DatasetRequest";
    const FIELDS: &'static [&'static str] = &[
        "projectName",
        "description",
        "featureCount",
        "datasetSize",
        "expectedFileFormat",
        "dataType",
        "dataProcessing",
        "startDate",
        "endDate",
        "target",
        "requestedBy",
        "status",
    ];

    fn with_field(&self, field: &str, value: &str) -> AppResult<Self> {
        let mut next = self.clone();
        match canonical(field).as_str() {
            "projectname" => next.project_name = value.to_string(),
            "description" => next.description = value.to_string(),
            "featurecount" => {
                next.feature_count = value.trim().parse::<i64>().map_err(|_| {
                    AppError::Validation(format!("featureCount must be a whole number, got '{}'", value))
                })?;
            }
            "datasetsize" => next.dataset_size = value.to_string(),
            "expectedfileformat" => next.expected_file_format = value.to_string(),
            "datatype" => next.data_type = value.to_string(),
            "dataprocessing" => next.data_processing = value.to_string(),
            "startdate" => next.start_date = value.to_string(),
            "enddate" => next.end_date = value.to_string(),
            "target" => next.target = value.to_string(),
            "requestedby" => next.requested_by = value.to_string(),
            "status" => next.status = value.to_string(),
            _ => return unknown(Self::ENTITY, field),
        }
        Ok(next)
    }
}

impl EditableEntity for Profile {
    const ENTITY: &'static str = "Profile";
    const FIELDS: &'static [&'static str] =
        &["name", "dateOfBirth", "region", "country", "mobile", "photoUri"];

    fn with_field(&self, field: &str, value: &str) -> AppResult<Self> {
        let mut next = self.clone();
        match canonical(field).as_str() {
            "name" => next.name = value.to_string(),
            "dateofbirth" => next.date_of_birth = value.to_string(),
            "region" => next.region = value.to_string(),
            "country" => next.country = value.to_string(),
            "mobile" => next.mobile = value.to_string(),
            "photouri" => next.photo_uri = optional(value),
            _ => return unknown(Self::ENTITY, field),
        }
        Ok(next)
    }
}

impl EditableEntity for MeaningfulObjectives {
    const ENTITY: &'static str = "MeaningfulObjectives";
    const FIELDS: &'static [&'static str] = &[
        "objectiveName",
        "organizational",
        "leadingIndicators",
        "userOutcomes",
        "modelProperties",
    ];

    fn with_field(&self, field: &str, value: &str) -> AppResult<Self> {
        let mut next = self.clone();
        let value = optional(value);
        match canonical(field).as_str() {
            "objectivename" => next.objective_name = value,
            "organizational" => next.organizational = value,
            "leadingindicators" => next.leading_indicators = value,
            "useroutcomes" => next.user_outcomes = value,
            "modelproperties" => next.model_properties = value,
            _ => return unknown(Self::ENTITY, field),
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::EditableEntity;
    use crate::errors::AppError;
    use crate::models::{DataEntry, DatasetRequest, MeaningfulObjectives, Project};

    #[test]
    fn setter_returns_new_value_and_leaves_original_untouched() {
        let original = Project::new("Churn Model");
        let updated = original.with_field("clientName", "Acme").expect("set");
        assert_eq!(updated.client_name, "Acme");
        assert_eq!(original.client_name, "");
    }

    #[test]
    fn snake_case_names_resolve_to_the_same_field() {
        let entry = DataEntry::new("Churn Model")
            .with_field("problem_description", "customers leave")
            .expect("set");
        assert_eq!(entry.problem_description, "customers leave");
    }

    #[test]
    fn unknown_field_is_an_error_not_a_silent_noop() {
        let error = Project::new("Churn Model")
            .with_field("budget", "100")
            .expect_err("unknown field");
        match error {
            AppError::UnknownField { entity, field } => {
                assert_eq!(entity, "Project");
                assert_eq!(field, "budget");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn numeric_fields_reject_garbage() {
        let request = DatasetRequest::new("Churn Model");
        assert_eq!(request.with_field("featureCount", " 12 ").expect("set").feature_count, 12);
        assert!(matches!(
            request.with_field("featureCount", "twelve"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn blank_optional_values_clear_the_field() {
        let objectives = MeaningfulObjectives::new(1)
            .with_fields([("objectiveName", "Retention"), ("userOutcomes", "")])
            .expect("set");
        assert_eq!(objectives.objective_name.as_deref(), Some("Retention"));
        assert!(objectives.user_outcomes.is_none());
    }

    #[test]
    fn every_listed_field_is_accepted() {
        let project = Project::new("x");
        for field in Project::FIELDS {
            assert!(project.with_field(field, "value").is_ok(), "{field}");
        }
        let entry = DataEntry::new("x");
        for field in DataEntry::FIELDS {
            assert!(entry.with_field(field, "value").is_ok(), "{field}");
        }
    }
}
