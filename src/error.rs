use reqwest::StatusCode;
use thiserror::Error;
pub use url::ParseError as UrlParseError;

use crate::models::status::ResponseStatus;

/// Error types for the ISAPI client.
#[derive(Error, Debug)]
pub enum IsapiError {
    /// HTTP request failed before a response arrived (timeout, refused
    /// connection, TLS verification).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The device rejected the supplied credentials.
    #[error("Unauthorized: the device rejected the supplied credentials")]
    Unauthorized,

    /// The device answered with a non-success HTTP status.
    #[error("Request failed with status code {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },

    /// The response body could not be decoded.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The `WWW-Authenticate` challenge could not be used.
    #[error("Invalid digest challenge: {0}")]
    InvalidChallenge(String),

    /// The device reported a failure inside an otherwise successful response.
    #[error("Device reported status {} ({}): {body}", .status.status_code, .status.status_string)]
    DeviceStatus { status: ResponseStatus, body: String },

    /// Error parsing URL.
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] UrlParseError),

    /// The API endpoint/path string is invalid.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Error serializing or deserializing JSON.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Error reading or writing XML.
    #[error("XML error: {0}")]
    Xml(String),

    /// Local filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),
}

/// Which layer a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// No usable response: timeout, connection error, TLS failure.
    Transport,
    /// A response arrived but its HTTP status or body shape was wrong.
    Protocol,
    /// The device embedded a failure status in a successful response.
    Semantic,
    /// The request never left the client (configuration, filesystem, XML).
    Local,
}

impl IsapiError {
    /// Classifies the error into transport, protocol, semantic or local.
    pub fn class(&self) -> FailureClass {
        match self {
            IsapiError::Http(_) => FailureClass::Transport,
            IsapiError::Unauthorized
            | IsapiError::HttpStatus { .. }
            | IsapiError::MalformedResponse(_)
            | IsapiError::InvalidChallenge(_) => FailureClass::Protocol,
            IsapiError::DeviceStatus { .. } => FailureClass::Semantic,
            IsapiError::UrlParseError(_)
            | IsapiError::InvalidEndpoint(_)
            | IsapiError::SerializationError(_)
            | IsapiError::Xml(_)
            | IsapiError::Io(_)
            | IsapiError::ConfigurationError(_) => FailureClass::Local,
        }
    }

    /// Returns true if the request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, IsapiError::Http(e) if e.is_timeout())
    }

    /// Returns the status embedded in the error body, if the device sent one.
    ///
    /// Devices usually answer a rejected write (for example a shutter speed
    /// outside the permitted list) with HTTP 400 and a `ResponseStatus`
    /// document. The raw body is kept on the error; this decodes it.
    pub fn device_status(&self) -> Option<ResponseStatus> {
        match self {
            IsapiError::DeviceStatus { status, .. } => Some(status.clone()),
            IsapiError::HttpStatus { body, .. } => ResponseStatus::parse(body).ok(),
            _ => None,
        }
    }
}

/// Result type for ISAPI operations.
pub type IsapiResult<T> = Result<T, IsapiError>;
