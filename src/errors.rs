//! Error types for provisioning operations
//!
//! Three layers:
//! - [`ConfigError`]: startup configuration problems (fatal before any provider call)
//! - [`ProviderError`]: failures reported by a provider port (cloud or vSphere)
//! - [`ProvisionError`]: workflow-level failures that unwind the instance loop

use thiserror::Error;

/// Errors raised while loading configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required key is absent or empty
    #[error("Missing configuration key {0}")]
    MissingKey(&'static str),

    /// A key is present but cannot be interpreted
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors reported by a provider port
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The requested resource does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Credentials were rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The provider answered with an error status
    #[error("Service error {status} ({code}): {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    /// The request never completed (DNS, TLS, connect, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// The request could not be signed
    #[error("Request signing failed: {0}")]
    Signing(String),
}

/// Result type for provider port operations
pub type ProviderResult<T> = Result<T, ProviderError>;

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Decode(err.to_string())
    }
}

/// Errors that stop forward progress of the provisioning workflow
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Startup configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Trigger payload could not be parsed
    #[error("Invalid trigger payload: {0}")]
    InvalidTrigger(String),

    /// Secret bundle could not be fetched
    #[error("Failed to retrieve secret {secret_id}: {source}")]
    SecretRetrieval {
        secret_id: String,
        #[source]
        source: ProviderError,
    },

    /// Secret content is not base64-encoded UTF-8
    #[error("Failed to decode secret content: {0}")]
    SecretDecode(String),

    /// Secret is not in `username/password` form
    #[error("Failed to parse secret value. Ensure it is in 'username/password' format")]
    CredentialFormat,

    /// Bounded poll policy ran out before a terminal lifecycle state
    #[error("Attachment {attachment_id} did not converge after {attempts} polls")]
    AttachmentTimeout { attachment_id: String, attempts: u32 },

    /// Management plane refused or could not be reached
    #[error("Failed to connect to management endpoint {endpoint}: {source}")]
    ManagementConnect {
        endpoint: String,
        #[source]
        source: ProviderError,
    },

    /// Any other provider failure
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Result type for workflow operations
pub type ProvisionResult<T> = Result<T, ProvisionError>;

impl From<base64::DecodeError> for ProvisionError {
    fn from(err: base64::DecodeError) -> Self {
        ProvisionError::SecretDecode(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for ProvisionError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        ProvisionError::SecretDecode(err.to_string())
    }
}
