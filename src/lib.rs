pub mod oauth;

pub use oauth::adapters::http::{OAuthServer, OAuthState, ServerOptions};
pub use oauth::domain::{OAuthError, OAuthResult};
pub use oauth::model::{ModelBinding, ModelFunction};
pub use oauth::ports::{EngineFactory, EngineOptions, ProtocolEngine};
