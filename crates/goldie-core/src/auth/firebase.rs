//! ============================================================================
//! Firebase Identity Toolkit client
//! ============================================================================
//! Email/password and federated sign-in over the Identity Toolkit REST API.
//! Provider error codes (`EMAIL_EXISTS`, `INVALID_LOGIN_CREDENTIALS`, ...)
//! come back as `AuthError` variants.
//! ============================================================================

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::provider::{AuthResult, IdentityProvider, IdpCredential};
use crate::error::AuthError;
use crate::types::ProviderUser;

/// Identity Toolkit v1 endpoint
pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

const IDP_REQUEST_URI: &str = "http://localhost";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

impl From<AccountResponse> for ProviderUser {
    fn from(r: AccountResponse) -> Self {
        Self {
            uid: r.local_id,
            email: r.email.filter(|e| !e.is_empty()),
            display_name: r.display_name.filter(|n| !n.is_empty()),
            photo_url: r.photo_url.filter(|p| !p.is_empty()),
            id_token: r.id_token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountResponse>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_idp_credential: bool,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

/// Identity Toolkit client bound to one project API key
#[derive(Clone)]
pub struct FirebaseIdentity {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FirebaseIdentity {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, IDENTITY_TOOLKIT_URL.to_string())
    }

    /// Point at another Identity Toolkit host (emulator, tests)
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn call<B: Serialize, T: DeserializeOwned>(&self, method: &str, body: &B) -> AuthResult<T> {
        let url = format!("{}/accounts:{}", self.base_url, method);
        debug!("POST accounts:{}", method);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!("Identity request accounts:{} failed: {}", method, e);
                AuthError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
            debug!("accounts:{} rejected: {}", method, message);
            return Err(AuthError::from_provider_message(&message));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Other(format!("Failed to parse accounts:{} response: {}", method, e)))
    }

    /// Account record behind an ID token
    pub async fn lookup(&self, id_token: &str) -> AuthResult<ProviderUser> {
        let response: LookupResponse = self.call("lookup", &LookupRequest { id_token }).await?;
        let mut user: ProviderUser = response
            .users
            .into_iter()
            .next()
            .map(ProviderUser::from)
            .ok_or(AuthError::UserNotFound)?;
        user.id_token = Some(id_token.to_string());
        Ok(user)
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<ProviderUser> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let account: AccountResponse = self.call("signUp", &request).await?;
        Ok(account.into())
    }

    /// The password grant omits the photo, so the account is looked up
    /// afterwards. A failed lookup keeps the sign-in.
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<ProviderUser> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let user: ProviderUser = self
            .call::<_, AccountResponse>("signInWithPassword", &request)
            .await?
            .into();

        let Some(token) = user.id_token.clone() else {
            return Ok(user);
        };
        match self.lookup(&token).await {
            Ok(full) => Ok(ProviderUser {
                display_name: user.display_name.or(full.display_name),
                photo_url: full.photo_url,
                ..user
            }),
            Err(e) => {
                warn!("Account lookup after sign-in failed: {}", e);
                Ok(user)
            }
        }
    }

    async fn sign_in_with_idp(&self, credential: &IdpCredential) -> AuthResult<ProviderUser> {
        let request = IdpRequest {
            post_body: credential.post_body(),
            request_uri: IDP_REQUEST_URI,
            return_idp_credential: true,
            return_secure_token: true,
        };
        let account: AccountResponse = self.call("signInWithIdp", &request).await?;
        Ok(account.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockServer;

    fn identity(server: &MockServer) -> FirebaseIdentity {
        FirebaseIdentity::with_base_url("api-key".to_string(), server.base_url.clone())
    }

    #[tokio::test]
    async fn test_sign_up() {
        let body = r#"{"kind": "identitytoolkit#SignupNewUserResponse", "localId": "abc123",
            "email": "nuevo@example.com", "idToken": "tok", "refreshToken": "r", "expiresIn": "3600"}"#;
        let server = MockServer::start(vec![(200, body.to_string())]);

        let user = identity(&server).sign_up("nuevo@example.com", "secret1").await.unwrap();
        assert_eq!(user.uid, "abc123");
        assert_eq!(user.email.as_deref(), Some("nuevo@example.com"));
        assert_eq!(user.id_token.as_deref(), Some("tok"));

        let requests = server.requests();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].url, "/accounts:signUp?key=api-key");
        let sent: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(sent["email"], "nuevo@example.com");
        assert_eq!(sent["returnSecureToken"], true);
    }

    #[tokio::test]
    async fn test_email_exists_maps_to_variant() {
        let body = r#"{"error": {"code": 400, "message": "EMAIL_EXISTS", "errors": []}}"#;
        let server = MockServer::start(vec![(400, body.to_string())]);

        let err = identity(&server).sign_up("a@example.com", "x").await.unwrap_err();
        assert_eq!(err, AuthError::EmailExists);
    }

    #[tokio::test]
    async fn test_sign_in_fills_photo_from_lookup() {
        let sign_in = r#"{"localId": "u1", "email": "a@example.com", "displayName": "", "idToken": "tok"}"#;
        let lookup = r#"{"users": [{"localId": "u1", "email": "a@example.com",
            "displayName": "Ana", "photoUrl": "https://img/ana.png"}]}"#;
        let server = MockServer::start(vec![(200, sign_in.to_string()), (200, lookup.to_string())]);

        let user = identity(&server).sign_in("a@example.com", "pw").await.unwrap();
        assert_eq!(user.uid, "u1");
        assert_eq!(user.display_name.as_deref(), Some("Ana"));
        assert_eq!(user.photo_url.as_deref(), Some("https://img/ana.png"));
        assert_eq!(user.id_token.as_deref(), Some("tok"));

        let urls: Vec<String> = server.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec!["/accounts:signInWithPassword?key=api-key", "/accounts:lookup?key=api-key"]
        );
    }

    #[tokio::test]
    async fn test_bad_password() {
        let body = r#"{"error": {"code": 400, "message": "INVALID_LOGIN_CREDENTIALS"}}"#;
        let server = MockServer::start(vec![(400, body.to_string())]);

        let err = identity(&server).sign_in("a@example.com", "nope").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_idp_sign_in_posts_id_token() {
        let body = r#"{"localId": "g1", "email": "g@example.com", "displayName": "G User",
            "photoUrl": "https://img/g.png", "idToken": "fb-token"}"#;
        let server = MockServer::start(vec![(200, body.to_string())]);

        let credential = IdpCredential::GoogleIdToken("google.jwt".to_string());
        let user = identity(&server).sign_in_with_idp(&credential).await.unwrap();
        assert_eq!(user.uid, "g1");
        assert_eq!(user.display_name.as_deref(), Some("G User"));

        let sent: serde_json::Value = serde_json::from_str(&server.requests()[0].body).unwrap();
        assert_eq!(sent["postBody"], "id_token=google.jwt&providerId=google.com");
        assert_eq!(sent["requestUri"], IDP_REQUEST_URI);
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_network_error() {
        let firebase = FirebaseIdentity::with_base_url("k".to_string(), "http://127.0.0.1:1".to_string());
        let err = firebase.sign_in("a@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Network(_)));
    }
}
