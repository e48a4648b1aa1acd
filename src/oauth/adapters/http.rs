use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use http::header::{HeaderValue, CONTENT_TYPE, LOCATION};
use http::request::Parts;
use http::{HeaderMap, StatusCode};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::oauth::domain::{
    AccessToken, AuthenticatedToken, AuthorizationCode, EngineRequest, EngineResponse, OAuthError,
    OAuthResult,
};
use crate::oauth::model::ModelBinding;
use crate::oauth::ports::{EngineFactory, EngineOptions, ProtocolEngine};

const BODY_LIMIT: usize = 1024 * 1024;

pub type ErrorHook = Arc<dyn Fn(&OAuthError, &EngineRequest) + Send + Sync>;

type MiddlewareFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Construction options. `model` is required; `extra` is forwarded to the
/// engine factory verbatim.
#[derive(Default)]
pub struct ServerOptions {
    model: Option<ModelBinding>,
    extra: Map<String, Value>,
    error_hook: Option<ErrorHook>,
}

impl ServerOptions {
    pub fn new(model: ModelBinding) -> Self {
        Self {
            model: Some(model),
            ..Self::default()
        }
    }

    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Process-wide error notification hook. Registered once; the adapter
    /// only ever emits. Must not block.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&OAuthError, &EngineRequest) + Send + Sync + 'static,
    {
        self.error_hook = Some(Arc::new(hook));
        self
    }
}

/// Request-scoped result slot, inserted into the host request's extensions
/// before control passes downstream.
#[derive(Debug, Clone)]
pub enum OAuthState {
    Authenticated(AuthenticatedToken),
    Code(AuthorizationCode),
    Token(AccessToken),
}

struct Inner<E> {
    engine: E,
    error_hook: Option<ErrorHook>,
}

/// Adapter between an axum middleware chain and an external OAuth2
/// protocol engine. Lives as long as the host process; cheap to clone.
pub struct OAuthServer<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for OAuthServer<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: ProtocolEngine> OAuthServer<E> {
    pub fn with_factory<F>(factory: &F, options: ServerOptions) -> OAuthResult<Self>
    where
        F: EngineFactory<Engine = E>,
    {
        let ServerOptions {
            model,
            extra,
            error_hook,
        } = options;
        let model = model
            .ok_or_else(|| OAuthError::InvalidArgument("Missing parameter: `model`".to_owned()))?;
        let engine = factory.create_engine(EngineOptions { model, extra })?;
        Ok(Self {
            inner: Arc::new(Inner { engine, error_hook }),
        })
    }

    /// Middleware validating a bearer token. On success the request gains
    /// `OAuthState::Authenticated` and control passes downstream; the
    /// adapter itself writes nothing to the response.
    pub fn authenticate(
        &self,
    ) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone + Send + Sync + 'static {
        let server = self.clone();
        move |request, next| {
            let server = server.clone();
            Box::pin(async move { server.handle_authenticate(request, next).await })
        }
    }

    /// Middleware authorizing a client to request tokens. On success the
    /// engine response (typically a redirect carrying the code) is flushed
    /// as the final response.
    pub fn authorize(
        &self,
    ) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone + Send + Sync + 'static {
        let server = self.clone();
        move |request, next| {
            let server = server.clone();
            Box::pin(async move { server.handle_authorize(request, next).await })
        }
    }

    /// Middleware granting tokens to valid requests.
    pub fn token(
        &self,
    ) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone + Send + Sync + 'static {
        let server = self.clone();
        move |request, next| {
            let server = server.clone();
            Box::pin(async move { server.handle_token(request, next).await })
        }
    }

    async fn handle_authenticate(&self, request: Request, next: Next) -> Response {
        let (engine_request, mut request) = match adapt_request(request).await {
            Ok(pair) => pair,
            Err((failure, engine_request)) => {
                return self.translate_failure(failure, EngineResponse::new(), &engine_request)
            }
        };
        let mut engine_response = EngineResponse::new();
        match self
            .inner
            .engine
            .authenticate(&engine_request, &mut engine_response)
            .await
        {
            Ok(token) => {
                debug!(client_id = %token.client.id, "bearer token authenticated");
                request
                    .extensions_mut()
                    .insert(OAuthState::Authenticated(token));
                next.run(request).await
            }
            Err(failure) => self.translate_failure(failure, engine_response, &engine_request),
        }
    }

    async fn handle_authorize(&self, request: Request, next: Next) -> Response {
        let (engine_request, mut request) = match adapt_request(request).await {
            Ok(pair) => pair,
            Err((failure, engine_request)) => {
                return self.translate_failure(failure, EngineResponse::new(), &engine_request)
            }
        };
        let mut engine_response = EngineResponse::new();
        match self
            .inner
            .engine
            .authorize(&engine_request, &mut engine_response)
            .await
        {
            Ok(code) => {
                debug!(client_id = %code.client.id, "authorization code issued");
                request.extensions_mut().insert(OAuthState::Code(code));
                let response = flush(engine_response);
                // The flushed engine response is authoritative over
                // downstream output.
                let _downstream = next.run(request).await;
                response
            }
            Err(failure) => self.translate_failure(failure, engine_response, &engine_request),
        }
    }

    async fn handle_token(&self, request: Request, next: Next) -> Response {
        let (engine_request, mut request) = match adapt_request(request).await {
            Ok(pair) => pair,
            Err((failure, engine_request)) => {
                return self.translate_failure(failure, EngineResponse::new(), &engine_request)
            }
        };
        let mut engine_response = EngineResponse::new();
        match self
            .inner
            .engine
            .token(&engine_request, &mut engine_response)
            .await
        {
            Ok(token) => {
                debug!(client_id = %token.client.id, "access token granted");
                request.extensions_mut().insert(OAuthState::Token(token));
                let response = flush_token(engine_response);
                let _downstream = next.run(request).await;
                response
            }
            Err(failure) => self.translate_failure(failure, engine_response, &engine_request),
        }
    }

    /// Shapes the host response for a failed operation and notifies the
    /// error hook. Never calls `next`.
    fn translate_failure(
        &self,
        failure: OAuthError,
        engine_response: EngineResponse,
        engine_request: &EngineRequest,
    ) -> Response {
        warn!(
            code = failure.code(),
            status = %failure.status(),
            error = %failure,
            "oauth operation failed"
        );
        let (_, headers, _) = engine_response.into_parts();
        let mut response = match &failure {
            // Bearer challenge: status only, never a body
            OAuthError::UnauthorizedRequest(_) => ().into_response(),
            _ => Json(json!({
                "error": failure.code(),
                "error_description": failure.to_string(),
            }))
            .into_response(),
        };
        *response.status_mut() = failure.status();
        response.headers_mut().extend(headers);
        if let Some(hook) = &self.inner.error_hook {
            hook(&failure, engine_request);
        }
        response
    }
}

/// Buffers the inbound body once, derives the engine view, and rebuilds the
/// host request with the same bytes so downstream middleware still sees it.
async fn adapt_request(request: Request) -> Result<(EngineRequest, Request), (OAuthError, EngineRequest)> {
    let (parts, body) = request.into_parts();
    match to_bytes(body, BODY_LIMIT).await {
        Ok(bytes) => {
            let engine_request = build_engine_request(&parts, &bytes);
            let request = Request::from_parts(parts, Body::from(bytes));
            Ok((engine_request, request))
        }
        Err(e) => {
            let failure = OAuthError::ServerError(format!("failed to buffer request body: {e}"));
            let engine_request = build_engine_request(&parts, &Bytes::new());
            Err((failure, engine_request))
        }
    }
}

fn build_engine_request(parts: &Parts, bytes: &Bytes) -> EngineRequest {
    let query = parts
        .uri
        .query()
        .and_then(|q| serde_urlencoded::from_str::<HashMap<String, String>>(q).ok())
        .unwrap_or_default();
    let body = parse_body(parts.headers.get(CONTENT_TYPE), bytes);
    EngineRequest::new(
        parts.method.clone(),
        parts.uri.path().to_owned(),
        parts.headers.clone(),
        query,
        body,
    )
}

fn parse_body(content_type: Option<&HeaderValue>, bytes: &Bytes) -> Map<String, Value> {
    if bytes.is_empty() {
        return Map::new();
    }
    let content_type = content_type.and_then(|v| v.to_str().ok()).unwrap_or_default();
    if content_type.starts_with("application/json") {
        return serde_json::from_slice::<Value>(bytes)
            .ok()
            .and_then(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default();
    }
    if content_type.starts_with("application/x-www-form-urlencoded") {
        return serde_urlencoded::from_bytes::<HashMap<String, String>>(bytes)
            .map(|fields| {
                fields
                    .into_iter()
                    .map(|(name, value)| (name, Value::String(value)))
                    .collect()
            })
            .unwrap_or_default();
    }
    Map::new()
}

fn flush(engine_response: EngineResponse) -> Response {
    let (status, headers, body) = engine_response.into_parts();
    flush_parts(status, headers, body)
}

/// Token flush. A 302 from the engine turns into an explicit redirect: the
/// `location` header is pulled out of the copied set and re-issued on its
/// own; the remaining headers still copy.
fn flush_token(engine_response: EngineResponse) -> Response {
    let (status, mut headers, body) = engine_response.into_parts();
    if status == StatusCode::FOUND {
        if let Some(location) = headers.remove(LOCATION) {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::FOUND;
            response.headers_mut().insert(LOCATION, location);
            response.headers_mut().extend(headers);
            return response;
        }
    }
    flush_parts(status, headers, body)
}

fn flush_parts(status: StatusCode, headers: HeaderMap, body: Option<Value>) -> Response {
    let mut response = match body {
        Some(value) => Json(value).into_response(),
        None => ().into_response(),
    };
    *response.status_mut() = status;
    response.headers_mut().extend(headers);
    response
}
