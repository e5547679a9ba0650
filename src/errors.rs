use std::fmt;
use std::fmt::Formatter;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::Value;
use serde_with::skip_serializing_none;

/// Error representing an unrecoverable error that will halt the application
///
#[derive(Debug)]
pub struct UnrecoverableError(pub String);
impl fmt::Display for UnrecoverableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "UnrecoverableError: {}", self.0)
    }
}
impl From<ConfigError> for UnrecoverableError {
    fn from(e: ConfigError) -> Self {
        UnrecoverableError(e.to_string())
    }
}
impl From<std::io::Error> for UnrecoverableError {
    fn from(e: std::io::Error) -> Self {
        UnrecoverableError(e.to_string())
    }
}
impl From<GraphError> for UnrecoverableError {
    fn from(e: GraphError) -> Self {
        UnrecoverableError(e.to_string())
    }
}


/// Errors while managing configuration
///
#[derive(Debug)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigError: {}", self.0)
    }
}
impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError(e.to_string())
    }
}
impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError(e.to_string())
    }
}
impl From<std::string::FromUtf8Error> for ConfigError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        ConfigError(e.to_string())
    }
}
impl From<log::SetLoggerError> for ConfigError {
    fn from(e: log::SetLoggerError) -> Self {
        ConfigError(e.to_string())
    }
}
impl From<rustls::Error> for ConfigError {
    fn from(e: rustls::Error) -> Self {
        ConfigError(e.to_string())
    }
}
impl From<rustls_pki_types::pem::Error> for ConfigError {
    fn from(e: rustls_pki_types::pem::Error) -> Self {
        ConfigError(e.to_string())
    }
}


/// Errors while acquiring an access token from the identity provider
///
#[derive(Debug)]
pub enum TokenError {
    /// The token endpoint answered without an access token, holds the raw response payload
    Rejected(Value),
    Request(String),
}
impl TokenError {
    /// Returns the raw details to hand back to the caller
    ///
    pub fn details(&self) -> Value {
        match self {
            TokenError::Rejected(payload) => payload.clone(),
            TokenError::Request(e)        => Value::String(e.clone()),
        }
    }
}
impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            TokenError::Rejected(p) => write!(f, "TokenError::Rejected: {}", p),
            TokenError::Request(e)  => write!(f, "TokenError::Request: {}", e),
        }
    }
}
impl From<reqwest::Error> for TokenError {
    fn from(e: reqwest::Error) -> Self {
        TokenError::Request(e.to_string())
    }
}


/// Errors while talking to the Graph document storage API
///
#[derive(Debug)]
pub enum GraphError {
    /// Non-success status, with the upstream body kept verbatim
    Upstream { status: u16, body: String },
    NotFound(String),
    Request(String),
    Decode(String),
}
impl GraphError {
    /// Returns the upstream body as json if it parses, otherwise as a json string
    ///
    pub fn details(&self) -> Option<Value> {
        match self {
            GraphError::Upstream { body, .. } => Some(
                serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.clone()))
            ),
            GraphError::NotFound(_) => None,
            GraphError::Request(e) | GraphError::Decode(e) => Some(Value::String(e.clone())),
        }
    }
}
impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            GraphError::Upstream { status, body } => write!(f, "GraphError::Upstream: {} {}", status, body),
            GraphError::NotFound(e) => write!(f, "GraphError::NotFound: {}", e),
            GraphError::Request(e)  => write!(f, "GraphError::Request: {}", e),
            GraphError::Decode(e)   => write!(f, "GraphError::Decode: {}", e),
        }
    }
}
impl From<reqwest::Error> for GraphError {
    fn from(e: reqwest::Error) -> Self {
        GraphError::Request(e.to_string())
    }
}
impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        GraphError::Decode(e.to_string())
    }
}
impl From<reqwest::header::ToStrError> for GraphError {
    fn from(e: reqwest::header::ToStrError) -> Self {
        GraphError::Decode(e.to_string())
    }
}


/// Errors while turning downloaded bytes into text
///
#[derive(Debug, PartialEq)]
pub enum ExtractionError {
    /// No extractor for the declared content type, holds that content type
    Unsupported(String),
    /// A parser was chosen but failed, holds the parser message
    Failed(String),
}
impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ExtractionError::Unsupported(t) => write!(f, "ExtractionError::Unsupported: {}", t),
            ExtractionError::Failed(e)      => write!(f, "ExtractionError::Failed: {}", e),
        }
    }
}


/// Json body of every failed request
///
#[skip_serializing_none]
#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: Option<Value>,
}

/// Errors returned from request handlers, rendered as `ErrorBody`
///
#[derive(Debug)]
pub enum ApiError {
    MissingInput(String),
    Auth(TokenError),
    /// A Graph call failed, the message says which one
    Graph(String, GraphError),
    Extraction(ExtractionError),
}
impl ApiError {
    /// Wraps a Graph error with a message describing the failed step
    ///
    /// # Arguments
    ///
    /// * 'message' - what the handler was trying to do
    /// * 'e' - the underlying Graph error
    pub fn graph(message: &str, e: GraphError) -> Self {
        ApiError::Graph(message.to_string(), e)
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::MissingInput(e) => ErrorBody { error: e.clone(), details: None },
            ApiError::Auth(e) => ErrorBody {
                error: "Could not acquire token".to_string(),
                details: Some(e.details()),
            },
            ApiError::Graph(_, GraphError::NotFound(what)) => ErrorBody {
                error: format!("{} not found", what),
                details: None,
            },
            ApiError::Graph(message, e) => ErrorBody {
                error: message.clone(),
                details: e.details(),
            },
            ApiError::Extraction(ExtractionError::Unsupported(t)) => ErrorBody {
                error: format!("Unsupported file type: {}", t),
                details: None,
            },
            ApiError::Extraction(ExtractionError::Failed(e)) => ErrorBody {
                error: "Failed to extract text".to_string(),
                details: Some(Value::String(e.clone())),
            },
        }
    }
}
impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ApiError::MissingInput(e)   => write!(f, "ApiError::MissingInput: {}", e),
            ApiError::Auth(e)           => write!(f, "ApiError::Auth: {}", e),
            ApiError::Graph(m, e)       => write!(f, "ApiError::Graph: {}: {}", m, e),
            ApiError::Extraction(e)     => write!(f, "ApiError::Extraction: {}", e),
        }
    }
}
impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self { ApiError::Auth(e) }
}
impl From<ExtractionError> for ApiError {
    fn from(e: ExtractionError) -> Self { ApiError::Extraction(e) }
}
impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Graph(_, GraphError::Upstream { status, .. }) => {
                StatusCode::from_u16(*status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Graph(_, GraphError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Graph(_, _) => StatusCode::BAD_GATEWAY,
            ApiError::Extraction(ExtractionError::Unsupported(_)) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Extraction(ExtractionError::Failed(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body())
    }
}
