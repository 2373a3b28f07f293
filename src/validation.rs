use http::StatusCode;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::utils::events::models::{EventDraft, GeoPoint};
use crate::utils::users::models::UserPreferences;

#[derive(Debug, Error)]
pub enum ValidateContentError {
    #[error("{0}")]
    Expected(String),
    #[error("Unexpected server error")]
    Unexpected(#[from] anyhow::Error),
}

impl ValidateContentError {
    pub fn new(content: impl ToString) -> Self {
        Self::Expected(content.to_string())
    }
}

impl From<ValidationErrors> for ValidateContentError {
    fn from(errors: ValidationErrors) -> Self {
        Self::new(errors)
    }
}

impl From<&ValidateContentError> for StatusCode {
    fn from(value: &ValidateContentError) -> Self {
        match value {
            ValidateContentError::Expected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ValidateContentError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub trait ValidateContent {
    fn validate_content(&self) -> Result<(), ValidateContentError>;
}

impl ValidateContent for EventDraft {
    fn validate_content(&self) -> Result<(), ValidateContentError> {
        self.validate()?;

        if self.name.trim().is_empty() {
            return Err(ValidateContentError::new("Event name cannot be blank"));
        }

        match (self.registration_start, self.registration_end) {
            (Some(start), Some(end)) if start > end => Err(ValidateContentError::new(
                "Registration ends sooner than it starts",
            )),
            _ => Ok(()),
        }
    }
}

impl ValidateContent for GeoPoint {
    fn validate_content(&self) -> Result<(), ValidateContentError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidateContentError::new("Latitude out of range"));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidateContentError::new("Longitude out of range"));
        }
        Ok(())
    }
}

impl ValidateContent for UserPreferences {
    fn validate_content(&self) -> Result<(), ValidateContentError> {
        self.validate()?;

        match &self.name {
            Some(name) if name.trim().is_empty() => {
                Err(ValidateContentError::new("Name cannot be blank"))
            }
            _ => Ok(()),
        }
    }
}
