//! Authentication session lifecycle.
//!
//! A [`SessionManager`] is created at application start, restores the last
//! persisted session, and publishes every login/logout through a watch
//! channel so that views can observe the signed-in user.
use crate::core::profile::{ProfileStore, UserProfile, get_or_create_profile};
use crate::core::store::{KeyValueCollection, get_json, put_json};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

const SESSION_KEY: &str = "current";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: User,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    SignedIn(Session),
    /// The account exists but the email address must be confirmed first.
    ConfirmationRequired(User),
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<SignUpOutcome>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;
    async fn refresh(&self, refresh_token: &str) -> Result<Session>;
    async fn sign_out(&self, session: &Session) -> Result<()>;
}

/// What observers see: the current session and, once loaded, its profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub session: Option<Session>,
    pub profile: Option<UserProfile>,
}

pub struct SessionManager {
    auth: Arc<dyn AuthProvider>,
    profiles: Option<Arc<dyn ProfileStore>>,
    storage: Arc<dyn KeyValueCollection>,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        profiles: Option<Arc<dyn ProfileStore>>,
        storage: Arc<dyn KeyValueCollection>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            auth,
            profiles,
            storage,
            state,
        }
    }

    /// Restores the persisted session, refreshing it when expired.
    pub async fn start(&self) -> Result<Option<Session>> {
        let stored: Option<Session> = match get_json(self.storage.as_ref(), SESSION_KEY).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Discarding unreadable stored session: {e}");
                self.storage.remove(SESSION_KEY).await?;
                None
            }
        };

        let Some(session) = stored else {
            debug!("No stored session");
            return Ok(None);
        };

        if !session.is_expired(Utc::now()) {
            debug!("Restored session for user {}", session.user.id);
            self.publish(Some(session.clone()), None);
            return Ok(Some(session));
        }

        match session.refresh_token.as_deref() {
            Some(token) => match self.auth.refresh(token).await {
                Ok(refreshed) => {
                    info!("Refreshed expired session for user {}", refreshed.user.id);
                    self.persist(&refreshed).await?;
                    self.publish(Some(refreshed.clone()), None);
                    Ok(Some(refreshed))
                }
                Err(e) => {
                    warn!("Session refresh failed, signing out locally: {e}");
                    self.clear().await?;
                    Ok(None)
                }
            },
            None => {
                debug!("Stored session expired without a refresh token");
                self.clear().await?;
                Ok(None)
            }
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<SignUpOutcome> {
        let outcome = self.auth.sign_up(email, password, name).await?;
        if let SignUpOutcome::SignedIn(session) = &outcome {
            self.establish(session.clone()).await?;
        }
        Ok(outcome)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.auth.sign_in(email, password).await?;
        self.establish(session.clone()).await?;
        Ok(session)
    }

    /// Revokes the session remotely (best effort) and forgets it locally.
    pub async fn sign_out(&self) -> Result<()> {
        if let Some(session) = self.current() {
            if let Err(e) = self.auth.sign_out(&session).await {
                warn!("Remote sign out failed: {e}");
            }
        }
        self.clear().await
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().session.clone()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.state.borrow().profile.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Loads (or creates) the profile of the current user and publishes it.
    pub async fn load_profile(&self) -> Result<Option<UserProfile>> {
        let (Some(session), Some(profiles)) = (self.current(), self.profiles.as_ref()) else {
            return Ok(None);
        };
        let profile = get_or_create_profile(profiles.as_ref(), &session).await?;
        self.publish(Some(session), Some(profile.clone()));
        Ok(Some(profile))
    }

    /// Replaces the published profile after an update.
    pub fn set_profile(&self, profile: UserProfile) {
        self.state.send_modify(|state| {
            if state.session.is_some() {
                state.profile = Some(profile);
            }
        });
    }

    async fn establish(&self, session: Session) -> Result<()> {
        self.persist(&session).await?;
        self.publish(Some(session), None);
        if let Err(e) = self.load_profile().await {
            warn!("Failed to load user profile: {e}");
        }
        Ok(())
    }

    async fn persist(&self, session: &Session) -> Result<()> {
        put_json(self.storage.as_ref(), SESSION_KEY, session)
            .await
            .context("Failed to store session")
    }

    async fn clear(&self) -> Result<()> {
        self.storage
            .remove(SESSION_KEY)
            .await
            .context("Failed to remove stored session")?;
        self.publish(None, None);
        Ok(())
    }

    fn publish(&self, session: Option<Session>, profile: Option<UserProfile>) {
        self.state.send_replace(SessionState { session, profile });
    }
}
