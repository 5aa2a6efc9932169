use crate::core::session::{Session, User};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fallback display name when neither metadata nor email provide one.
pub const DEFAULT_DISPLAY_NAME: &str = "User";

/// A row of the `user_profiles` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.avatar_url.is_none()
    }
}

/// Name for a freshly created profile: metadata name, then the local part of
/// the email address, then [`DEFAULT_DISPLAY_NAME`].
pub fn default_display_name(user: &User) -> String {
    user.name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .or_else(|| {
            user.email
                .as_deref()
                .and_then(|e| e.split('@').next())
                .filter(|local| !local.is_empty())
        })
        .unwrap_or(DEFAULT_DISPLAY_NAME)
        .to_string()
}

impl UserProfile {
    pub fn new_for(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: default_display_name(user),
            email: user.email.clone(),
            avatar_url: None,
            created_at: None,
        }
    }
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch_profile(&self, session: &Session) -> Result<Option<UserProfile>>;
    async fn create_profile(&self, session: &Session, profile: &UserProfile)
    -> Result<UserProfile>;
    async fn update_profile(
        &self,
        session: &Session,
        update: &ProfileUpdate,
    ) -> Result<UserProfile>;
}

/// Fetches the signed-in user's profile, creating it on first sign in.
pub async fn get_or_create_profile(
    store: &dyn ProfileStore,
    session: &Session,
) -> Result<UserProfile> {
    if let Some(profile) = store.fetch_profile(session).await? {
        return Ok(profile);
    }
    tracing::debug!("No profile for user {}, creating one", session.user.id);
    store
        .create_profile(session, &UserProfile::new_for(&session.user))
        .await
}
