//! Error types for the Checkly provider.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Errors returned by the Checkly API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered 404 for the requested entity.
    #[error("unexpected response status 404: {0}")]
    NotFound(String),

    /// The API answered with a non-success status other than 404.
    #[error("unexpected response status {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body text.
        body: String,
    },

    /// The request could not be sent or the response could not be decoded.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured API URL cannot be used as a request base.
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Whether the API reported the entity as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors that can occur while serving a provider operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider configuration could not be resolved.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A single provider setting is missing or unusable.
    #[error("{summary}: {detail}")]
    Setting {
        /// The provider attribute at fault.
        attribute: &'static str,
        /// Short description shown as the diagnostic summary.
        summary: String,
        /// How to fix it.
        detail: String,
    },

    /// A resource operation arrived before the provider was configured.
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// The prior state cannot be used for the requested operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A call to the Checkly API failed.
    #[error("{summary}: {source}")]
    Remote {
        /// Short label naming the failed operation.
        summary: String,
        /// The underlying client error.
        #[source]
        source: ApiError,
    },

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

impl ProviderError {
    /// Wrap a client error with a label describing the failed operation.
    pub fn remote(summary: impl Into<String>, source: ApiError) -> Self {
        Self::Remote {
            summary: summary.into(),
            source,
        }
    }

    /// Report a problem with one provider attribute.
    pub fn setting(
        attribute: &'static str,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::Setting {
            attribute,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// Convert this error into the diagnostic shown to the operator.
    ///
    /// Remote failures keep the operation label as the summary and carry the
    /// client error text in the detail.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Remote { summary, source } => Diagnostic::error(summary.clone())
                .with_detail(format!("Checkly API error: {}", source)),
            Self::Setting {
                attribute,
                summary,
                detail,
            } => Diagnostic::error(summary.clone())
                .with_detail(detail.clone())
                .with_attribute(*attribute),
            other => Diagnostic::error(other.to_string()),
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::Setting {
                summary, detail, ..
            } => tonic::Status::failed_precondition(format!("{}: {}", summary, detail)),
            ProviderError::NotConfigured(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::InvalidState(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Remote { summary, source } => {
                tonic::Status::internal(format!("{}: {}", summary, source))
            },
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DiagnosticSeverity;

    #[test]
    fn test_error_display() {
        let err = ProviderError::Configuration("missing account".to_string());
        assert_eq!(format!("{}", err), "Configuration error: missing account");

        let err = ProviderError::UnknownResource("checkly_check".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: checkly_check");

        let err = ProviderError::remote(
            "Creating environment variable with Checkly API failed",
            ApiError::Status {
                status: 500,
                body: "boom".to_string(),
            },
        );
        assert_eq!(
            format!("{}", err),
            "Creating environment variable with Checkly API failed: unexpected response status 500: boom"
        );
    }

    #[test]
    fn test_api_error_not_found() {
        assert!(ApiError::NotFound("no such variable".to_string()).is_not_found());
        assert!(!ApiError::Status {
            status: 500,
            body: String::new()
        }
        .is_not_found());
        assert!(!ApiError::InvalidUrl("x".to_string()).is_not_found());
    }

    #[test]
    fn test_remote_error_diagnostic() {
        let err = ProviderError::remote(
            "Deleting environment variable with Checkly API failed",
            ApiError::Status {
                status: 401,
                body: "unauthorized".to_string(),
            },
        );
        let diag = err.to_diagnostic();
        assert_eq!(diag.severity, DiagnosticSeverity::Error);
        assert_eq!(
            diag.summary,
            "Deleting environment variable with Checkly API failed"
        );
        assert_eq!(
            diag.detail.as_deref(),
            Some("Checkly API error: unexpected response status 401: unauthorized")
        );
    }

    #[test]
    fn test_plain_error_diagnostic() {
        let diag = ProviderError::NotConfigured("call Configure first".to_string()).to_diagnostic();
        assert_eq!(diag.summary, "Provider not configured: call Configure first");
        assert!(diag.detail.is_none());
    }

    #[test]
    fn test_error_to_status() {
        let err = ProviderError::InvalidState("test".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let err = ProviderError::Configuration("test".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let err = ProviderError::UnknownResource("test".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let err = ProviderError::remote("label", ApiError::InvalidUrl("x".to_string()));
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::Internal);

        let err: ProviderError = serde_json::from_slice::<serde_json::Value>(b"{")
            .unwrap_err()
            .into();
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn test_setting_error_diagnostic() {
        let err = ProviderError::setting(
            "account_id",
            "Missing Checkly account ID",
            "Set the `account_id` provider attribute.",
        );
        assert_eq!(
            err.to_string(),
            "Missing Checkly account ID: Set the `account_id` provider attribute."
        );

        let diag = err.to_diagnostic();
        assert_eq!(diag.summary, "Missing Checkly account ID");
        assert_eq!(
            diag.detail.as_deref(),
            Some("Set the `account_id` provider attribute.")
        );
        assert_eq!(diag.attribute.as_deref(), Some("account_id"));

        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);
    }
}
