use async_trait::async_trait;
use serde_json::{Map, Value};

use super::domain::{
    AccessToken, AuthenticatedToken, AuthorizationCode, EngineRequest, EngineResponse, OAuthResult,
};
use super::model::ModelBinding;

/// 外部OAuth2プロトコルエンジンの呼び出し口
#[async_trait]
pub trait ProtocolEngine: Send + Sync + 'static {
    /// ベアラートークンを検証 (RFC 6749 §7)
    async fn authenticate(
        &self,
        request: &EngineRequest,
        response: &mut EngineResponse,
    ) -> OAuthResult<AuthenticatedToken>;

    /// 認可コードを発行 (RFC 6749 §3.1)
    async fn authorize(
        &self,
        request: &EngineRequest,
        response: &mut EngineResponse,
    ) -> OAuthResult<AuthorizationCode>;

    /// トークンを発行 (RFC 6749 §3.2)
    async fn token(
        &self,
        request: &EngineRequest,
        response: &mut EngineResponse,
    ) -> OAuthResult<AccessToken>;
}

/// Options handed to the engine constructor: the normalized model binding
/// plus whatever the integrator passed through, verbatim.
pub struct EngineOptions {
    pub model: ModelBinding,
    pub extra: Map<String, Value>,
}

pub trait EngineFactory {
    type Engine: ProtocolEngine;

    fn create_engine(&self, options: EngineOptions) -> OAuthResult<Self::Engine>;
}
