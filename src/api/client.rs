use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::{StatusCode, Url};
use tracing::debug;

use super::{ApiError, AuthStatus, ChatReply, ChatRequest, LoginRequest, LoginResponse};
use crate::utils::url::{construct_api_url, normalize_base_url};

/// HTTP side of the chat server: authentication, catalog and one-shot chat.
///
/// The session lives in a cookie, so clones share one jar and one login.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            jar,
            base_url: normalize_base_url(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn url(&self, endpoint: &str) -> String {
        construct_api_url(&self.base_url, endpoint)
    }

    /// `Cookie` header value to present on the WebSocket handshake.
    pub fn session_cookie(&self) -> Option<String> {
        let url = Url::parse(&self.base_url).ok()?;
        self.jar
            .cookies(&url)
            .and_then(|value| value.to_str().ok().map(str::to_owned))
    }

    pub async fn check_auth(&self) -> Result<AuthStatus, ApiError> {
        let response = self.http.get(self.url("/api/auth/check")).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(AuthStatus::default());
        }
        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }
        Ok(response.json::<AuthStatus>().await?)
    }

    /// Log in. Rejected credentials are `Ok` with `authenticated == false`.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthStatus, ApiError> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            debug!("login rejected for {username}");
            return Ok(AuthStatus::default());
        }
        if !status.is_success() {
            return Err(ApiError::from_response(response).await);
        }

        let body = response.json::<LoginResponse>().await?;
        if let Some(error) = body.error.filter(|_| !body.success) {
            debug!("login refused: {error}");
        }
        Ok(AuthStatus {
            authenticated: body.success,
            is_admin: body.is_admin,
        })
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let response = self.http.post(self.url("/api/auth/logout")).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }
        Ok(())
    }

    /// Single request/response exchange; returns the whole assistant reply.
    pub async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError> {
        debug!(model = %request.model, turns = request.messages.len(), "one-shot chat request");
        let response = self
            .http
            .post(self.url("/api/chat"))
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }
        let reply = response
            .json::<ChatReply>()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        Ok(reply.into_content())
    }
}
