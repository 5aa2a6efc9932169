//! Client for the hosted Supabase backend: GoTrue authentication plus the
//! PostgREST tables holding user profiles and conversion history.
use crate::core::conversion::{ConversionRecord, ConversionStore};
use crate::core::profile::{ProfileStore, ProfileUpdate, UserProfile};
use crate::core::session::{AuthProvider, Session, SignUpOutcome, User};
use crate::providers::util::with_retry;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const PROFILES_TABLE: &str = "user_profiles";
const HISTORY_TABLE: &str = "conversion_history";
const GET_RETRIES: usize = 2;
const RETRY_DELAY_MS: u64 = 200;

pub struct SupabaseClient {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UserMetadata {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
}

impl From<UserResponse> for User {
    fn from(user: UserResponse) -> Self {
        User {
            id: user.id,
            email: user.email,
            name: user.user_metadata.and_then(|m| m.name),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: UserResponse,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(UserResponse),
}

/// Error bodies differ between the auth and REST services.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl ErrorResponse {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

async fn check_response(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .ok()
        .and_then(ErrorResponse::into_message)
        .unwrap_or_else(|| status.to_string());
    debug!("{action} failed with {status}: {body}");
    Err(anyhow!("{action} failed: {message}"))
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: Response, action: &str) -> Result<T> {
    let text = response.text().await?;
    serde_json::from_str(&text)
        .map_err(|e| anyhow!("Failed to parse JSON response for {action}: {e}"))
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("xrate/0.1")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            client,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("Supabase request: {method} {url}");
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
    }

    fn authed(&self, method: Method, path: &str, session: &Session) -> RequestBuilder {
        self.request(method, path).bearer_auth(&session.access_token)
    }

    async fn token(&self, grant_type: &str, body: serde_json::Value, action: &str) -> Result<Session> {
        let response = self
            .request(Method::POST, &format!("/auth/v1/token?grant_type={grant_type}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow!("Request error during {action}: {e}"))?;
        let response = check_response(response, action).await?;
        let token: TokenResponse = parse_json(response, action).await?;
        Ok(token.into_session(Utc::now()))
    }

    async fn fetch_rows<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        session: &Session,
        action: &str,
    ) -> Result<Vec<T>> {
        let response = with_retry(
            || self.authed(Method::GET, path, session).send(),
            GET_RETRIES,
            RETRY_DELAY_MS,
        )
        .await
        .map_err(|e| anyhow!("Request error during {action}: {e}"))?;
        let response = check_response(response, action).await?;
        parse_json(response, action).await
    }

    async fn write_row<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<T> {
        let response = request
            .header("Prefer", "return=representation")
            .send()
            .await
            .map_err(|e| anyhow!("Request error during {action}: {e}"))?;
        let response = check_response(response, action).await?;
        let rows: Vec<T> = parse_json(response, action).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow!("{action} returned no rows"))
    }
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<SignUpOutcome> {
        let action = "sign up";
        let response = self
            .request(Method::POST, "/auth/v1/signup")
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "name": name },
            }))
            .send()
            .await
            .map_err(|e| anyhow!("Request error during {action}: {e}"))?;
        let response = check_response(response, action).await?;
        Ok(match parse_json(response, action).await? {
            SignUpResponse::Session(token) => SignUpOutcome::SignedIn(token.into_session(Utc::now())),
            SignUpResponse::User(user) => SignUpOutcome::ConfirmationRequired(user.into()),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.token(
            "password",
            json!({ "email": email, "password": password }),
            "sign in",
        )
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        self.token(
            "refresh_token",
            json!({ "refresh_token": refresh_token }),
            "session refresh",
        )
        .await
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        let action = "sign out";
        let response = self
            .authed(Method::POST, "/auth/v1/logout", session)
            .send()
            .await
            .map_err(|e| anyhow!("Request error during {action}: {e}"))?;
        check_response(response, action).await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for SupabaseClient {
    async fn fetch_profile(&self, session: &Session) -> Result<Option<UserProfile>> {
        let path = format!(
            "/rest/v1/{PROFILES_TABLE}?select=*&id=eq.{}",
            session.user.id
        );
        let rows: Vec<UserProfile> = self.fetch_rows(&path, session, "profile fetch").await?;
        Ok(rows.into_iter().next())
    }

    async fn create_profile(
        &self,
        session: &Session,
        profile: &UserProfile,
    ) -> Result<UserProfile> {
        let request = self
            .authed(Method::POST, &format!("/rest/v1/{PROFILES_TABLE}"), session)
            .json(&[profile]);
        self.write_row(request, "profile creation").await
    }

    async fn update_profile(
        &self,
        session: &Session,
        update: &ProfileUpdate,
    ) -> Result<UserProfile> {
        let path = format!("/rest/v1/{PROFILES_TABLE}?id=eq.{}", session.user.id);
        let request = self.authed(Method::PATCH, &path, session).json(update);
        self.write_row(request, "profile update").await
    }
}

#[async_trait]
impl ConversionStore for SupabaseClient {
    async fn insert_conversion(&self, session: &Session, record: &ConversionRecord) -> Result<()> {
        let action = "conversion history insert";
        let response = self
            .authed(Method::POST, &format!("/rest/v1/{HISTORY_TABLE}"), session)
            .header("Prefer", "return=minimal")
            .json(&[record])
            .send()
            .await
            .map_err(|e| anyhow!("Request error during {action}: {e}"))?;
        check_response(response, action).await?;
        Ok(())
    }

    async fn list_conversions(
        &self,
        session: &Session,
        limit: usize,
    ) -> Result<Vec<ConversionRecord>> {
        let path = format!(
            "/rest/v1/{HISTORY_TABLE}?select=*&user_id=eq.{}&order=created_at.desc&limit={limit}",
            session.user.id
        );
        self.fetch_rows(&path, session, "conversion history fetch")
            .await
    }
}
