use std::fmt;
use std::future::{ready, Future};
use std::sync::Arc;

use futures::future::BoxFuture;

use super::domain::{
    AccessToken, AuthenticatedToken, AuthorizationCode, Client, OAuthError, OAuthResult, User,
};

/// Uniform deferred result every model callback resolves to.
pub type ModelFuture<T> = BoxFuture<'static, OAuthResult<T>>;

type GetAccessTokenFn = Arc<dyn Fn(String) -> ModelFuture<Option<AuthenticatedToken>> + Send + Sync>;
type GetClientFn = Arc<dyn Fn(String, Option<String>) -> ModelFuture<Option<Client>> + Send + Sync>;
type GetUserFn = Arc<dyn Fn(String, String) -> ModelFuture<Option<User>> + Send + Sync>;
type SaveTokenFn = Arc<dyn Fn(AccessToken, Client, User) -> ModelFuture<AccessToken> + Send + Sync>;
type GetAuthorizationCodeFn =
    Arc<dyn Fn(String) -> ModelFuture<Option<AuthorizationCode>> + Send + Sync>;
type SaveAuthorizationCodeFn =
    Arc<dyn Fn(AuthorizationCode, Client, User) -> ModelFuture<AuthorizationCode> + Send + Sync>;
type RevokeAuthorizationCodeFn = Arc<dyn Fn(AuthorizationCode) -> ModelFuture<bool> + Send + Sync>;
type GetRefreshTokenFn = Arc<dyn Fn(String) -> ModelFuture<Option<AccessToken>> + Send + Sync>;
type RevokeTokenFn = Arc<dyn Fn(AccessToken) -> ModelFuture<bool> + Send + Sync>;
type ValidateScopeFn =
    Arc<dyn Fn(User, Client, Option<String>) -> ModelFuture<Option<String>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFunction {
    GetAccessToken,
    GetClient,
    GetUser,
    SaveToken,
    GetAuthorizationCode,
    SaveAuthorizationCode,
    RevokeAuthorizationCode,
    GetRefreshToken,
    RevokeToken,
    ValidateScope,
}

impl ModelFunction {
    pub fn name(self) -> &'static str {
        match self {
            Self::GetAccessToken => "get_access_token",
            Self::GetClient => "get_client",
            Self::GetUser => "get_user",
            Self::SaveToken => "save_token",
            Self::GetAuthorizationCode => "get_authorization_code",
            Self::SaveAuthorizationCode => "save_authorization_code",
            Self::RevokeAuthorizationCode => "revoke_authorization_code",
            Self::GetRefreshToken => "get_refresh_token",
            Self::RevokeToken => "revoke_token",
            Self::ValidateScope => "validate_scope",
        }
    }
}

impl fmt::Display for ModelFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage and lookup callbacks the engine needs, supplied by the
/// integrator. Every registration normalizes the callback into a boxed
/// future once; the engine awaits all of them uniformly. Absent functions
/// stay absent — the engine decides which ones an operation requires.
#[derive(Clone, Default)]
pub struct ModelBinding {
    get_access_token: Option<GetAccessTokenFn>,
    get_client: Option<GetClientFn>,
    get_user: Option<GetUserFn>,
    save_token: Option<SaveTokenFn>,
    get_authorization_code: Option<GetAuthorizationCodeFn>,
    save_authorization_code: Option<SaveAuthorizationCodeFn>,
    revoke_authorization_code: Option<RevokeAuthorizationCodeFn>,
    get_refresh_token: Option<GetRefreshTokenFn>,
    revoke_token: Option<RevokeTokenFn>,
    validate_scope: Option<ValidateScopeFn>,
}

macro_rules! model_callbacks {
    ($(($field:ident, $sync:ident, $call:ident, $variant:ident): ($($arg:ident: $ty:ty),*) -> $out:ty;)*) => {
        $(
        pub fn $field<F, Fut>(mut self, f: F) -> Self
        where
            F: Fn($($ty),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = OAuthResult<$out>> + Send + 'static,
        {
            self.$field = Some(Arc::new(move |$($arg: $ty),*| -> ModelFuture<$out> {
                Box::pin(f($($arg),*))
            }));
            self
        }

        pub fn $sync<F>(mut self, f: F) -> Self
        where
            F: Fn($($ty),*) -> OAuthResult<$out> + Send + Sync + 'static,
        {
            self.$field = Some(Arc::new(move |$($arg: $ty),*| -> ModelFuture<$out> {
                Box::pin(ready(f($($arg),*)))
            }));
            self
        }

        pub fn $call(&self, $($arg: $ty),*) -> ModelFuture<$out> {
            match &self.$field {
                Some(f) => f($($arg),*),
                None => Box::pin(ready(Err(OAuthError::missing_model_function(
                    ModelFunction::$variant,
                )))),
            }
        }
        )*

        pub fn implements(&self, function: ModelFunction) -> bool {
            match function {
                $(ModelFunction::$variant => self.$field.is_some(),)*
            }
        }
    };
}

impl ModelBinding {
    pub fn new() -> Self {
        Self::default()
    }

    model_callbacks! {
        (get_access_token, get_access_token_sync, call_get_access_token, GetAccessToken):
            (access_token: String) -> Option<AuthenticatedToken>;
        (get_client, get_client_sync, call_get_client, GetClient):
            (client_id: String, client_secret: Option<String>) -> Option<Client>;
        (get_user, get_user_sync, call_get_user, GetUser):
            (username: String, password: String) -> Option<User>;
        (save_token, save_token_sync, call_save_token, SaveToken):
            (token: AccessToken, client: Client, user: User) -> AccessToken;
        (get_authorization_code, get_authorization_code_sync, call_get_authorization_code, GetAuthorizationCode):
            (code: String) -> Option<AuthorizationCode>;
        (save_authorization_code, save_authorization_code_sync, call_save_authorization_code, SaveAuthorizationCode):
            (code: AuthorizationCode, client: Client, user: User) -> AuthorizationCode;
        (revoke_authorization_code, revoke_authorization_code_sync, call_revoke_authorization_code, RevokeAuthorizationCode):
            (code: AuthorizationCode) -> bool;
        (get_refresh_token, get_refresh_token_sync, call_get_refresh_token, GetRefreshToken):
            (refresh_token: String) -> Option<AccessToken>;
        (revoke_token, revoke_token_sync, call_revoke_token, RevokeToken):
            (token: AccessToken) -> bool;
        (validate_scope, validate_scope_sync, call_validate_scope, ValidateScope):
            (user: User, client: Client, scope: Option<String>) -> Option<String>;
    }

    /// First function of `required` that is not bound, in the order the
    /// engine passed them. The binding never reorders.
    pub fn first_missing(&self, required: &[ModelFunction]) -> Option<ModelFunction> {
        required.iter().copied().find(|f| !self.implements(*f))
    }
}

impl fmt::Debug for ModelBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let implemented: Vec<&str> = [
            ModelFunction::GetAccessToken,
            ModelFunction::GetClient,
            ModelFunction::GetUser,
            ModelFunction::SaveToken,
            ModelFunction::GetAuthorizationCode,
            ModelFunction::SaveAuthorizationCode,
            ModelFunction::RevokeAuthorizationCode,
            ModelFunction::GetRefreshToken,
            ModelFunction::RevokeToken,
            ModelFunction::ValidateScope,
        ]
        .into_iter()
        .filter(|f| self.implements(*f))
        .map(ModelFunction::name)
        .collect();
        f.debug_struct("ModelBinding")
            .field("implements", &implemented)
            .finish()
    }
}
