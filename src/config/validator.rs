use thiserror::Error;

use crate::config::{DispatchSettings, FlushSettings, Settings, SpecSettings, TargetSettings};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        errors.extend(Self::validate_spec(&settings.spec));
        errors.extend(Self::validate_target(&settings.target));
        errors.extend(Self::validate_dispatch(&settings.dispatch));
        errors.extend(Self::validate_flush(&settings.flush));

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_spec(spec: &SpecSettings) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if spec.url.trim().is_empty() {
            errors.push(ValidationError::MissingField("spec.url".to_string()));
        }
        errors
    }

    fn validate_target(target: &TargetSettings) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if target.base_url.trim().is_empty() {
            errors.push(ValidationError::MissingField("target.base_url".to_string()));
        } else if !(target.base_url.starts_with("http://")
            || target.base_url.starts_with("https://"))
        {
            errors.push(ValidationError::InvalidValue {
                field: "target.base_url".to_string(),
                reason: "Base URL must start with http:// or https://".to_string(),
            });
        }

        if target.timeout_secs == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "target.timeout_secs".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        errors
    }

    fn validate_dispatch(dispatch: &DispatchSettings) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if dispatch.concurrency_limit == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "dispatch.concurrency_limit".to_string(),
                reason: "Concurrency limit must be at least 1".to_string(),
            });
        }

        if dispatch.max_schema_depth == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "dispatch.max_schema_depth".to_string(),
                reason: "Schema depth limit must be at least 1".to_string(),
            });
        }

        errors
    }

    fn validate_flush(flush: &FlushSettings) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if flush.enabled && flush.interval_secs == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "flush.interval_secs".to_string(),
                reason: "Flush interval must be greater than 0".to_string(),
            });
        }
        errors
    }
}
