use async_trait::async_trait;

use crate::error::AuthError;
use crate::types::ProviderUser;

pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Credential minted by a federated identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdpCredential {
    /// OpenID Connect ID token issued by Google
    GoogleIdToken(String),
}

impl IdpCredential {
    /// `postBody` for `accounts:signInWithIdp`
    pub fn post_body(&self) -> String {
        match self {
            Self::GoogleIdToken(token) => format!(
                "id_token={}&providerId=google.com",
                urlencoding::encode(token)
            ),
        }
    }
}

/// Account operations offered by the identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new email/password account. Fails with
    /// [`AuthError::EmailExists`] when the email is taken.
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<ProviderUser>;

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<ProviderUser>;

    async fn sign_in_with_idp(&self, credential: &IdpCredential) -> AuthResult<ProviderUser>;
}
