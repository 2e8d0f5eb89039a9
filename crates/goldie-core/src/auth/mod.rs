//! ============================================================================
//! Auth Module - Identity and Session Flows
//! ============================================================================
//! - Identity Toolkit client (email/password, federated ID tokens)
//! - Google OAuth 2.0 + PKCE redirect leg
//! - Session synchronizer mirroring profiles into the document store
//! ============================================================================

mod firebase;
mod google;
mod provider;
mod session;

pub use firebase::{FirebaseIdentity, IDENTITY_TOOLKIT_URL};
pub use google::{GoogleOAuth, PendingRedirect, GOOGLE_TOKEN_URL};
pub use provider::{AuthResult, IdentityProvider, IdpCredential};
pub use session::{AuthSubscription, SessionSynchronizer};
