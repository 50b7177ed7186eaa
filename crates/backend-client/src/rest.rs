//! REST implementation of the backend traits for a Supabase-style service.
//!
//! Auth operations go through `/auth/v1/*`, table operations through
//! `/rest/v1/*`. The client holds the current session in memory and pushes
//! [`SessionChanged`] notifications whenever it changes.

use crate::api::{AuthApi, DataApi};
use crate::error::{BackendError, BackendResult};
use crate::types::{
    AuditEntry, BackendSession, BackendUser, ProfileRow, RoleAssignmentRow, SessionChanged,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::{broadcast, Mutex};

/// Capacity of the session-change broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 16;

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Token response from the auth token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: RawUser,
}

/// User payload as the auth endpoints shape it.
#[derive(Debug, Deserialize)]
struct RawUser {
    id: String,
    email: String,
    #[serde(default)]
    user_metadata: serde_json::Value,
}

impl RawUser {
    fn into_user(self) -> BackendUser {
        let display_name = self
            .user_metadata
            .get("display_name")
            .and_then(|v| v.as_str())
            .map(String::from);
        BackendUser {
            id: self.id,
            email: self.email,
            display_name,
        }
    }
}

/// Error body returned by the auth endpoints.
#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// REST backend client.
pub struct RestBackend {
    http_client: reqwest::Client,
    api_url: String,
    publishable_key: String,
    session: Mutex<Option<BackendSession>>,
    events: broadcast::Sender<SessionChanged>,
}

impl RestBackend {
    /// Create a new REST backend client.
    ///
    /// # Arguments
    /// * `api_url` - The project API URL (e.g. `https://xyz.supabase.co`)
    /// * `publishable_key` - The public API key sent as the `apikey` header
    pub fn new(api_url: impl Into<String>, publishable_key: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            http_client: reqwest::Client::new(),
            api_url: api_url.into(),
            publishable_key: publishable_key.into(),
            session: Mutex::new(None),
            events,
        }
    }

    /// Build the REST API URL for a table.
    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.api_url, table)
    }

    /// Build an auth endpoint URL.
    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.api_url, path)
    }

    fn session_from_token_response(token: TokenResponse) -> BackendSession {
        BackendSession {
            expires_at: chrono::Utc::now().timestamp() + token.expires_in,
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            user: token.user.into_user(),
        }
    }

    /// Map a non-success auth response into a `BackendError::Auth`.
    async fn auth_error_from(response: reqwest::Response) -> BackendError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let parsed: Option<AuthErrorBody> = serde_json::from_str(&body).ok();
        let (code, message) = match parsed {
            Some(b) => (
                b.error_code,
                b.msg
                    .or(b.error_description)
                    .unwrap_or_else(|| summarize_response_body(&body)),
            ),
            None => (None, summarize_response_body(&body)),
        };
        tracing::warn!(status, code = ?code, "Auth request failed");
        BackendError::Auth {
            status,
            code,
            message,
        }
    }

    /// Map a non-success data response into a `BackendError::Status`.
    async fn status_error_from(response: reqwest::Response) -> BackendError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let body_summary = summarize_response_body(&body);
        tracing::error!(status, body_summary = %body_summary, "Data request failed");
        BackendError::Status {
            status,
            message: body_summary,
        }
    }

    /// The bearer token of the current session, if any.
    async fn access_token(&self) -> BackendResult<String> {
        let session = self.session.lock().await;
        session
            .as_ref()
            .map(|s| s.access_token.clone())
            .ok_or(BackendError::NoSession)
    }

    /// Commit a session as current and notify subscribers.
    async fn install_session(&self, session: BackendSession, change: SessionChanged) {
        let mut current = self.session.lock().await;
        *current = Some(session);
        let _ = self.events.send(change);
    }

    /// Refresh using an explicit refresh token. Does not touch the stored
    /// session; callers install the result.
    async fn refresh_with_token(&self, refresh_token: &str) -> BackendResult<BackendSession> {
        let url = format!("{}?grant_type=refresh_token", self.auth_url("token"));
        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::auth_error_from(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Self::session_from_token_response(token))
    }

    /// GET a single row from a table filtered by a column equality.
    async fn fetch_one<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        column: &str,
        value: &str,
        select: &str,
    ) -> BackendResult<Option<T>> {
        let url = format!(
            "{}?{}=eq.{}&select={}&limit=1",
            self.rest_url(table),
            column,
            value,
            select
        );

        let token = self.access_token().await?;
        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error_from(response).await);
        }

        let rows: Vec<T> = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(rows.into_iter().next())
    }

    /// POST a row into a table.
    async fn insert_row<T: serde::Serialize>(&self, table: &str, row: &T) -> BackendResult<()> {
        let token = self.access_token().await?;
        let response = self
            .http_client
            .post(self.rest_url(table))
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error_from(response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl AuthApi for RestBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> BackendResult<BackendSession> {
        let url = format!("{}?grant_type=password", self.auth_url("token"));

        tracing::debug!(email, "Signing in with password");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::auth_error_from(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        let session = Self::session_from_token_response(token);
        self.install_session(session.clone(), SessionChanged::SignedIn(session.clone()))
            .await;

        tracing::info!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
        redirect_to: &str,
    ) -> BackendResult<BackendUser> {
        let mut body = serde_json::json!({ "email": email, "password": password });
        if let Some(name) = display_name {
            body["data"] = serde_json::json!({ "display_name": name });
        }

        let url = format!(
            "{}?redirect_to={}",
            self.auth_url("signup"),
            urlencoding::encode(redirect_to)
        );

        tracing::debug!(email, "Signing up");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::auth_error_from(response).await);
        }

        let user: RawUser = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        tracing::info!(user_id = %user.id, "Signed up, awaiting confirmation");
        Ok(user.into_user())
    }

    async fn sign_out(&self) -> BackendResult<()> {
        let token = {
            let mut session = self.session.lock().await;
            let token = session.as_ref().map(|s| s.access_token.clone());
            // Local session is dropped regardless of the remote outcome.
            *session = None;
            token
        };
        let _ = self.events.send(SessionChanged::SignedOut);

        let Some(token) = token else {
            return Ok(());
        };

        let response = self
            .http_client
            .post(self.auth_url("logout"))
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::auth_error_from(response).await);
        }
        tracing::info!("Signed out");
        Ok(())
    }

    async fn get_session(&self) -> BackendResult<Option<BackendSession>> {
        let stale = {
            let session = self.session.lock().await;
            match session.as_ref() {
                None => return Ok(None),
                Some(s) if !s.is_expired() => return Ok(Some(s.clone())),
                Some(s) => s.refresh_token.clone(),
            }
        };

        // Token is stale; mint a replacement before handing it out.
        let refreshed = self.refresh_with_token(&stale).await?;
        self.install_session(
            refreshed.clone(),
            SessionChanged::TokenRefreshed(refreshed.clone()),
        )
        .await;
        Ok(Some(refreshed))
    }

    async fn refresh_session(&self) -> BackendResult<BackendSession> {
        let refresh_token = {
            let session = self.session.lock().await;
            session
                .as_ref()
                .map(|s| s.refresh_token.clone())
                .ok_or(BackendError::NoSession)?
        };

        let refreshed = self.refresh_with_token(&refresh_token).await?;
        self.install_session(
            refreshed.clone(),
            SessionChanged::TokenRefreshed(refreshed.clone()),
        )
        .await;
        tracing::debug!(user_id = %refreshed.user.id, "Session refreshed");
        Ok(refreshed)
    }

    async fn restore_session(&self, session: BackendSession) -> BackendResult<BackendSession> {
        let session = if session.is_expired() {
            tracing::debug!("Persisted session stale, refreshing before restore");
            self.refresh_with_token(&session.refresh_token).await?
        } else {
            session
        };

        self.install_session(session.clone(), SessionChanged::SignedIn(session.clone()))
            .await;
        tracing::info!(user_id = %session.user.id, "Session restored");
        Ok(session)
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChanged> {
        self.events.subscribe()
    }
}

#[async_trait]
impl DataApi for RestBackend {
    async fn is_site_admin(&self, user_id: &str) -> BackendResult<bool> {
        #[derive(Deserialize)]
        struct SiteAdminRow {
            #[allow(dead_code)]
            user_id: String,
        }

        let row: Option<SiteAdminRow> = self
            .fetch_one("site_admins", "user_id", user_id, "user_id")
            .await?;
        Ok(row.is_some())
    }

    async fn fetch_profile(&self, user_id: &str) -> BackendResult<Option<ProfileRow>> {
        self.fetch_one("profiles", "id", user_id, "id,role,display_name,email")
            .await
    }

    async fn insert_profile(&self, row: &ProfileRow) -> BackendResult<()> {
        self.insert_row("profiles", row).await
    }

    async fn update_profile_role(&self, user_id: &str, role: &str) -> BackendResult<()> {
        let url = format!("{}?id=eq.{}", self.rest_url("profiles"), user_id);
        let token = self.access_token().await?;

        let response = self
            .http_client
            .patch(&url)
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "role": role }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error_from(response).await);
        }
        Ok(())
    }

    async fn delete_profile(&self, user_id: &str) -> BackendResult<()> {
        let url = format!("{}?id=eq.{}", self.rest_url("profiles"), user_id);
        let token = self.access_token().await?;

        let response = self
            .http_client
            .delete(&url)
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error_from(response).await);
        }
        Ok(())
    }

    async fn fetch_role_assignment(
        &self,
        user_id: &str,
    ) -> BackendResult<Option<RoleAssignmentRow>> {
        self.fetch_one("role_assignments", "user_id", user_id, "user_id,role")
            .await
    }

    async fn insert_audit_entry(&self, entry: &AuditEntry) -> BackendResult<()> {
        self.insert_row("audit_log", entry).await
    }
}
