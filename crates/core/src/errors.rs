use thiserror::Error;

use crate::pipeline::WorkflowRunError;

/// Application-layer failures, ready for boundary mapping. Workflow
/// business outcomes (REFER / DECLINE) never appear here; only
/// infrastructure failures do.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("malformed submission: {0}")]
    Submission(String),
    #[error("workflow failure: {0}")]
    Workflow(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<&WorkflowRunError> for ApplicationError {
    fn from(value: &WorkflowRunError) -> Self {
        Self::Workflow(value.to_string())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The submission could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Submission(message) => {
                Self::BadRequest { message, correlation_id: "unassigned".to_string() }
            }
            // Collaborator and store failures surface as 5xx-equivalents;
            // validation outcomes never reach this path (they are REFER
            // decisions, not errors).
            ApplicationError::Workflow(message) | ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_string() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_string() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApplicationError, InterfaceError};

    #[test]
    fn malformed_submission_maps_to_bad_request() {
        let interface = ApplicationError::Submission("coverage_amount is not a number".to_string())
            .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(
            interface.user_message(),
            "The submission could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn workflow_failure_maps_to_service_unavailable() {
        let interface = ApplicationError::Workflow(
            "workflow failed at stage `enrich`: hazard scoring failed".to_string(),
        )
        .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn persistence_failure_maps_to_service_unavailable() {
        let interface = ApplicationError::Persistence("database lock timeout".to_string())
            .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
    }

    #[test]
    fn configuration_failure_maps_to_internal() {
        let interface = ApplicationError::Configuration("invalid data_dir".to_string())
            .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
