// ============================================================================
// Application Configuration
// ============================================================================
// Everything comes from the environment (a `.env` file is loaded by the
// binary). Optional credentials stay `None` until a command needs them.
// ============================================================================

use crate::assistant::EventsAssistant;
use crate::auth::{FirebaseIdentity, GoogleOAuth, IDENTITY_TOOLKIT_URL};
use crate::catalog::{DiscogsClient, DISCOGS_API};
use crate::error::{GoldieError, Result};
use crate::order::{OrderMessenger, DEFAULT_CATALOG_SITE, DEFAULT_WHATSAPP_PHONE};

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub discogs_token: Option<String>,
    pub discogs_base_url: String,
    pub firebase_api_key: Option<String>,
    pub firebase_auth_url: String,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub gemini_api_key: Option<String>,
    pub whatsapp_phone: String,
    pub catalog_site_url: String,
    /// `None` falls back to ~/.goldie/goldie.redb
    pub db_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl AppConfig {
    /// Build from any key/value source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            discogs_token: get("DISCOGS_TOKEN"),
            discogs_base_url: get("DISCOGS_BASE_URL").unwrap_or_else(|| DISCOGS_API.to_string()),
            firebase_api_key: get("FIREBASE_API_KEY"),
            firebase_auth_url: get("FIREBASE_AUTH_URL").unwrap_or_else(|| IDENTITY_TOOLKIT_URL.to_string()),
            google_client_id: get("GOOGLE_CLIENT_ID"),
            google_client_secret: get("GOOGLE_CLIENT_SECRET"),
            gemini_api_key: get("GEMINI_API_KEY"),
            whatsapp_phone: get("WHATSAPP_PHONE").unwrap_or_else(|| DEFAULT_WHATSAPP_PHONE.to_string()),
            catalog_site_url: get("CATALOG_SITE_URL").unwrap_or_else(|| DEFAULT_CATALOG_SITE.to_string()),
            db_path: get("GOLDIE_DB_PATH"),
        }
    }

    pub fn discogs_client(&self) -> Result<DiscogsClient> {
        let token = self
            .discogs_token
            .clone()
            .ok_or_else(|| GoldieError::Config("DISCOGS_TOKEN is not set".to_string()))?;
        Ok(DiscogsClient::with_base_url(token, self.discogs_base_url.clone()))
    }

    pub fn identity_provider(&self) -> Result<FirebaseIdentity> {
        let api_key = self
            .firebase_api_key
            .clone()
            .ok_or_else(|| GoldieError::Config("FIREBASE_API_KEY is not set".to_string()))?;
        Ok(FirebaseIdentity::with_base_url(api_key, self.firebase_auth_url.clone()))
    }

    pub fn google_oauth(&self) -> Result<GoogleOAuth> {
        let client_id = self
            .google_client_id
            .clone()
            .ok_or_else(|| GoldieError::Config("GOOGLE_CLIENT_ID is not set".to_string()))?;
        Ok(GoogleOAuth::new(client_id, self.google_client_secret.clone()))
    }

    pub fn assistant(&self) -> EventsAssistant {
        EventsAssistant::new(self.gemini_api_key.clone())
    }

    pub fn messenger(&self) -> OrderMessenger {
        OrderMessenger::new(self.whatsapp_phone.clone(), self.catalog_site_url.clone())
    }
}
