//! ============================================================================
//! Google sign-in redirect (OAuth 2.0 + PKCE, installed-app flow)
//! ============================================================================
//! Opens Google's consent page, catches the redirect on a localhost port and
//! trades the code for an OpenID ID token. The token is then handed to the
//! identity provider through `SessionSynchronizer::handle_redirect_result`.
//! ============================================================================

use std::collections::HashMap;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tiny_http::{Header, Response, Server};
use tracing::{debug, error, info};

use super::provider::{AuthResult, IdpCredential};
use crate::error::AuthError;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// Google token endpoint
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const CALLBACK_PORT: u16 = 9876;
const CALLBACK_URL: &str = "http://localhost:9876/callback";
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

const SCOPES: &str = "openid email profile";

const SIGNED_IN_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Oldie But Goldie</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 20vh;">
    <h1>Sesión iniciada</h1>
    <p>Ya podés cerrar esta ventana.</p>
</body>
</html>
"#;

/// A redirect that has been started but not completed
#[derive(Debug, Clone)]
pub struct PendingRedirect {
    /// Consent page to open in the browser
    pub auth_url: String,
    code_verifier: String,
    state: String,
}

impl PendingRedirect {
    pub fn state(&self) -> &str {
        &self.state
    }
}

/// Google OAuth client for a desktop/installed app registration
pub struct GoogleOAuth {
    client_id: String,
    client_secret: Option<String>,
    token_url: String,
    client: Client,
}

impl GoogleOAuth {
    pub fn new(client_id: String, client_secret: Option<String>) -> Self {
        Self {
            client_id,
            client_secret,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Exchange codes against another token endpoint
    pub fn with_token_url(mut self, token_url: String) -> Self {
        self.token_url = token_url;
        self
    }

    /// Generate PKCE code verifier and challenge
    fn generate_pkce() -> (String, String) {
        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
        let verifier: String = (0..64)
            .map(|_| CHARSET[rand::random::<usize>() % CHARSET.len()] as char)
            .collect();

        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        (verifier, challenge)
    }

    fn generate_state() -> String {
        (0..32)
            .map(|_| format!("{:02x}", rand::random::<u8>()))
            .collect()
    }

    /// Start a redirect: fresh verifier, state and consent URL
    pub fn begin(&self) -> PendingRedirect {
        let (code_verifier, challenge) = Self::generate_pkce();
        let state = Self::generate_state();

        let auth_url = format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}&code_challenge={}&code_challenge_method=S256&prompt=select_account",
            GOOGLE_AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(CALLBACK_URL),
            urlencoding::encode(SCOPES),
            &state,
            &challenge
        );

        debug!("Generated Google auth URL with state: {}", state);
        PendingRedirect {
            auth_url,
            code_verifier,
            state,
        }
    }

    /// Block until Google redirects back to the localhost callback, then
    /// return the authorization code.
    pub fn wait_for_callback(expected_state: &str) -> AuthResult<String> {
        let addr = format!("127.0.0.1:{}", CALLBACK_PORT);
        let server = Server::http(&addr)
            .map_err(|e| AuthError::OAuth(format!("Failed to start callback server on {}: {}", addr, e)))?;

        info!("Waiting for Google OAuth callback on port {}", CALLBACK_PORT);

        let request = server
            .recv_timeout(CALLBACK_TIMEOUT)
            .map_err(|e| AuthError::OAuth(format!("Callback server error: {}", e)))?
            .ok_or_else(|| AuthError::OAuth("Timed out waiting for Google callback".to_string()))?;

        let url = request.url().to_string();
        debug!("Received callback: {}", url);

        if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..]) {
            let _ = request.respond(Response::from_string(SIGNED_IN_PAGE).with_header(header));
        }

        parse_callback(&url, expected_state)
    }

    /// Exchange the authorization code for an ID token credential
    pub async fn exchange_code(&self, code: &str, pending: &PendingRedirect) -> AuthResult<IdpCredential> {
        info!("Exchanging Google authorization code");

        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", CALLBACK_URL),
            ("client_id", self.client_id.as_str()),
            ("code_verifier", pending.code_verifier.as_str()),
        ];
        if let Some(secret) = self.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Google token exchange failed: {} - {}", status, error_text);
            return Err(AuthError::OAuth(format!("Token exchange failed ({}): {}", status, error_text)));
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            id_token: Option<String>,
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::OAuth(format!("Failed to parse token response: {}", e)))?;

        let id_token = token_response
            .id_token
            .ok_or_else(|| AuthError::OAuth("Token response carries no id_token".to_string()))?;

        info!("Obtained Google ID token");
        Ok(IdpCredential::GoogleIdToken(id_token))
    }

    /// Wait for the browser round-trip and exchange the code
    pub async fn complete(&self, pending: &PendingRedirect) -> AuthResult<IdpCredential> {
        let state = pending.state.clone();
        let code = tokio::task::spawn_blocking(move || Self::wait_for_callback(&state))
            .await
            .map_err(|e| AuthError::OAuth(format!("Callback task failed: {}", e)))??;
        self.exchange_code(&code, pending).await
    }
}

/// Pull the authorization code out of a callback path, checking `state`
fn parse_callback(path: &str, expected_state: &str) -> AuthResult<String> {
    let full_url = format!("http://localhost{}", path);
    let parsed = url::Url::parse(&full_url)
        .map_err(|e| AuthError::OAuth(format!("Failed to parse callback URL: {}", e)))?;
    let params: HashMap<_, _> = parsed.query_pairs().collect();

    let state = params
        .get("state")
        .ok_or_else(|| AuthError::OAuth("No state parameter in callback".to_string()))?;
    if state != expected_state {
        error!("State mismatch: expected {}, got {}", expected_state, state);
        return Err(AuthError::OAuth("State mismatch".to_string()));
    }

    if let Some(error) = params.get("error") {
        return Err(AuthError::OAuth(format!("Google denied sign-in: {}", error)));
    }

    params
        .get("code")
        .map(|code| code.to_string())
        .ok_or_else(|| AuthError::OAuth("No authorization code in callback".to_string()))
}
