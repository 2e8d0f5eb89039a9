//! ============================================================================
//! Session Synchronizer
//! ============================================================================
//! Signs users in through the identity provider, mirrors their profile into
//! the document store and broadcasts session changes to listeners.
//! ============================================================================

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::provider::{IdentityProvider, IdpCredential};
use crate::error::{AuthError, Result};
use crate::store::DocumentStore;
use crate::types::{ProfilePatch, ProviderUser, UserIdentity};

/// Listener registration returned by
/// [`SessionSynchronizer::subscribe_to_auth_changes`]. Dropping it
/// unsubscribes.
pub struct AuthSubscription {
    task: Option<JoinHandle<()>>,
}

impl AuthSubscription {
    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub struct SessionSynchronizer {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    session: watch::Sender<Option<UserIdentity>>,
    /// One queue per live subscription. Every change is pushed to each of
    /// them under this lock, so listeners see all states in commit order.
    listeners: Mutex<Vec<mpsc::UnboundedSender<Option<UserIdentity>>>>,
}

impl SessionSynchronizer {
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<dyn DocumentStore>) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            provider,
            store,
            session,
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<Option<UserIdentity>>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Commit a session change and queue it for every listener. Returns the
    /// session it replaced.
    fn publish(&self, next: Option<UserIdentity>) -> Option<UserIdentity> {
        let mut listeners = self.listeners();
        let previous = self.session.send_replace(next.clone());
        listeners.retain(|tx| tx.send(next.clone()).is_ok());
        previous
    }

    /// Register, or sign in when the email is already registered
    pub async fn authenticate_user(&self, email: &str, password: &str) -> Result<UserIdentity> {
        let user = match self.provider.sign_up(email, password).await {
            Ok(user) => {
                info!("Registered new account {}", user.uid);
                user
            }
            Err(AuthError::EmailExists) => {
                debug!("Email already registered, signing in instead");
                self.provider.sign_in(email, password).await.map_err(|e| {
                    error!("Sign in fallback failed: {}", e);
                    e
                })?
            }
            Err(e) => {
                error!("Authentication failed: {}", e);
                return Err(e.into());
            }
        };

        self.complete_sign_in(user).await
    }

    /// Sign in with a Google ID token the caller already holds
    pub async fn sign_in_with_google(&self, credential: IdpCredential) -> Result<UserIdentity> {
        let user = self
            .provider
            .sign_in_with_idp(&credential)
            .await
            .map_err(|e| {
                error!("Error signing in with Google: {}", e);
                e
            })?;

        self.complete_sign_in(user).await
    }

    /// Finish a browser redirect. `None` means no redirect was pending.
    pub async fn handle_redirect_result(&self, pending: Option<IdpCredential>) -> Result<Option<UserIdentity>> {
        let Some(credential) = pending else {
            return Ok(None);
        };

        let user = self
            .provider
            .sign_in_with_idp(&credential)
            .await
            .map_err(|e| {
                error!("Error handling redirect result: {}", e);
                e
            })?;

        self.complete_sign_in(user).await.map(Some)
    }

    /// Merge the user's identity into their profile document and stamp
    /// `last_login`. Fields the provider doesn't supply are left as stored.
    pub async fn sync_user_profile(&self, user: &ProviderUser) -> Result<UserIdentity> {
        let patch = ProfilePatch {
            email: user.email.clone(),
            display_name: user.derived_display_name(),
            touch_last_login: true,
            ..Default::default()
        };

        let profile = self.store.merge_profile(&user.uid, patch).await.map_err(|e| {
            error!("Profile sync for {} failed: {}", user.uid, e);
            e
        })?;

        let mut identity = profile.identity();
        if user.photo_url.is_some() {
            identity.photo_url = user.photo_url.clone();
        }
        Ok(identity)
    }

    async fn complete_sign_in(&self, user: ProviderUser) -> Result<UserIdentity> {
        let identity = self.sync_user_profile(&user).await?;
        info!("Signed in as {}", identity.uid);
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    /// Call `callback` now with the current session, then after every sign-in
    /// and sign-out until the returned handle is dropped. Needs a tokio
    /// runtime.
    pub fn subscribe_to_auth_changes<F>(&self, callback: F) -> AuthSubscription
    where
        F: Fn(Option<UserIdentity>) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let current = {
            let mut listeners = self.listeners();
            listeners.push(tx);
            self.session.borrow().clone()
        };
        callback(current);

        let task = tokio::spawn(async move {
            while let Some(user) = rx.recv().await {
                callback(user);
            }
        });

        AuthSubscription { task: Some(task) }
    }

    /// Latest-value session channel for async consumers. Unlike
    /// [`subscribe_to_auth_changes`](Self::subscribe_to_auth_changes) it
    /// may skip intermediate states.
    pub fn auth_changes(&self) -> watch::Receiver<Option<UserIdentity>> {
        self.session.subscribe()
    }

    pub fn current_user(&self) -> Option<UserIdentity> {
        self.session.borrow().clone()
    }

    /// Adopt a session persisted by an earlier run
    pub fn restore(&self, identity: UserIdentity) {
        debug!("Restored session for {}", identity.uid);
        self.publish(Some(identity));
    }

    pub fn sign_out(&self) {
        if let Some(previous) = self.publish(None) {
            info!("Signed out {}", previous.uid);
        }
    }
}
