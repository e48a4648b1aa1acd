pub mod adapters;
pub mod domain;
pub mod model;
pub mod ports;

pub use adapters::http::{OAuthServer, OAuthState, ServerOptions};
pub use domain::{OAuthError, OAuthResult};
pub use model::{ModelBinding, ModelFunction};
pub use ports::{EngineFactory, EngineOptions, ProtocolEngine};
