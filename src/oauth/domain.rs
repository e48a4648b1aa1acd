use std::collections::HashMap;

use http::header::{HeaderName, HeaderValue, AUTHORIZATION, LOCATION};
use http::{HeaderMap, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;

use super::model::ModelFunction;

/// Resource-owner record. The engine and the model treat it as opaque.
pub type User = Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub grants: Vec<String>,
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub access_token_expires_at: Option<OffsetDateTime>,
    pub refresh_token_expires_at: Option<OffsetDateTime>,
    pub scope: Option<String>,
    pub client: Client,
    pub user: User,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorizationCode {
    pub code: String,
    pub expires_at: Option<OffsetDateTime>,
    pub redirect_uri: String,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub client: Client,
    pub user: User,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthenticatedToken {
    pub access_token: String,
    pub access_token_expires_at: Option<OffsetDateTime>,
    pub scope: Option<String>,
    pub client: Client,
    pub user: User,
}

/// Immutable view over one inbound HTTP request, as the engine sees it.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    query: HashMap<String, String>,
    body: Map<String, Value>,
}

impl EngineRequest {
    pub fn new(
        method: Method,
        path: String,
        headers: HeaderMap,
        query: HashMap<String, String>,
        body: Map<String, Value>,
    ) -> Self {
        Self {
            method,
            path,
            headers,
            query,
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn body_param(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    pub fn body_str(&self, name: &str) -> Option<&str> {
        self.body.get(name).and_then(Value::as_str)
    }

    /// Either the query string or the form body may carry a parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query_param(name).or_else(|| self.body_str(name))
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.header(AUTHORIZATION.as_str())?.strip_prefix("Bearer ")
    }
}

/// Mutable container the engine writes into during an operation. Drained
/// onto the host response by the adapter's flush step.
#[derive(Debug, Clone)]
pub struct EngineResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Value>,
}

impl Default for EngineResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl EngineResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> OAuthResult<()> {
        let name = HeaderName::try_from(name)
            .map_err(|e| OAuthError::ServerError(format!("invalid header name: {e}")))?;
        let value = HeaderValue::try_from(value)
            .map_err(|e| OAuthError::ServerError(format!("invalid header value: {e}")))?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn set_body(&mut self, body: Value) {
        self.body = Some(body);
    }

    pub fn redirect(&mut self, location: &str) -> OAuthResult<()> {
        self.set_status(StatusCode::FOUND);
        self.set_header(LOCATION.as_str(), location)
    }

    pub fn into_parts(self) -> (StatusCode, HeaderMap, Option<Value>) {
        (self.status, self.headers, self.body)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OAuthError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    InvalidClient(String),

    #[error("{0}")]
    InvalidGrant(String),

    #[error("{0}")]
    InvalidScope(String),

    #[error("{0}")]
    UnauthorizedClient(String),

    /// Bearer challenge. The translated response carries no body.
    #[error("{0}")]
    UnauthorizedRequest(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    ServerError(String),
}

impl OAuthError {
    /// Canonical name, used as the `error` field of translated responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::InvalidScope(_) => "invalid_scope",
            Self::UnauthorizedClient(_) => "unauthorized_client",
            Self::UnauthorizedRequest(_) => "unauthorized_request",
            Self::AccessDenied(_) => "access_denied",
            Self::ServerError(_) => "server_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequest(_)
            | Self::InvalidClient(_)
            | Self::InvalidGrant(_)
            | Self::InvalidScope(_)
            | Self::UnauthorizedClient(_)
            | Self::AccessDenied(_) => StatusCode::BAD_REQUEST,
            Self::UnauthorizedRequest(_) => StatusCode::UNAUTHORIZED,
            Self::ServerError(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn missing_parameter(name: &str) -> Self {
        Self::InvalidRequest(format!("Missing parameter: `{name}`"))
    }

    /// Engine-contract message for a model function that is not bound.
    pub fn missing_model_function(function: ModelFunction) -> Self {
        Self::InvalidArgument(format!("model does not implement `{}()`", function.name()))
    }
}

pub type OAuthResult<T> = Result<T, OAuthError>;
