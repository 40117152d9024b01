//! Session establishment against the chat server.
//!
//! The server keeps the session in a cookie held by the shared
//! [`BackendClient`]. Credentials come from the keyring when a password was
//! remembered, otherwise from a [`CredentialPrompt`].

use std::error::Error;
use std::fmt;

use tracing::{info, warn};

use crate::api::{ApiError, AuthStatus, BackendClient};
use crate::core::keyring::PasswordStore;
use crate::utils::line_editor::LineEditorError;

mod prompt;

pub use prompt::{CredentialPrompt, TerminalPrompt};

const MAX_LOGIN_ATTEMPTS: usize = 3;

#[derive(Debug)]
pub enum AuthError {
    Api(ApiError),
    Prompt(LineEditorError),
    MissingUsername,
    Rejected { attempts: usize },
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Api(err) => write!(f, "{err}"),
            AuthError::Prompt(err) => write!(f, "{err}"),
            AuthError::MissingUsername => write!(f, "A username is required to log in"),
            AuthError::Rejected { attempts } => {
                write!(f, "Login failed after {attempts} attempt(s)")
            }
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AuthError::Api(err) => Some(err),
            AuthError::Prompt(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        AuthError::Api(err)
    }
}

impl From<LineEditorError> for AuthError {
    fn from(err: LineEditorError) -> Self {
        AuthError::Prompt(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedIn {
    /// `None` when an existing session cookie was reused.
    pub username: Option<String>,
    pub is_admin: bool,
}

pub struct AuthManager {
    client: BackendClient,
    passwords: PasswordStore,
}

impl AuthManager {
    pub fn new(client: BackendClient, passwords: PasswordStore) -> Self {
        Self { client, passwords }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Reuse a live session if the server still recognises it, else log in.
    pub async fn ensure_session(
        &self,
        username: Option<&str>,
        prompt: &mut dyn CredentialPrompt,
    ) -> Result<LoggedIn, AuthError> {
        let status = self.client.check_auth().await?;
        if status.authenticated {
            return Ok(LoggedIn {
                username: None,
                is_admin: status.is_admin,
            });
        }
        self.login(username, prompt, false).await
    }

    /// Log in, trying a remembered password first. With `remember`, a password
    /// typed at the prompt is stored in the keyring on success.
    pub async fn login(
        &self,
        username: Option<&str>,
        prompt: &mut dyn CredentialPrompt,
        remember: bool,
    ) -> Result<LoggedIn, AuthError> {
        let username = match username.map(str::trim).filter(|u| !u.is_empty()) {
            Some(name) => name.to_string(),
            None => prompt.username(None)?,
        };
        if username.is_empty() {
            return Err(AuthError::MissingUsername);
        }
        let server = self.client.base_url().to_string();

        match self.passwords.get(&username, &server) {
            Ok(Some(password)) => {
                let status = self.client.login(&username, &password).await?;
                if status.authenticated {
                    info!(username = %username, "logged in with remembered password");
                    return Ok(logged_in(username, status));
                }
                prompt.notify("The remembered password was rejected.");
            }
            Ok(None) => {}
            Err(err) => warn!("{err}; asking for the password instead"),
        }

        for attempt in 1..=MAX_LOGIN_ATTEMPTS {
            let password = prompt.password(&username)?;
            let status = self.client.login(&username, &password).await?;
            if status.authenticated {
                info!(username = %username, attempt, "logged in");
                if remember {
                    if let Err(err) = self.passwords.set(&username, &server, &password) {
                        warn!("could not remember password: {err}");
                        prompt.notify(&format!("Password not saved: {err}"));
                    }
                }
                return Ok(logged_in(username, status));
            }
            prompt.notify("Invalid username or password.");
        }

        Err(AuthError::Rejected {
            attempts: MAX_LOGIN_ATTEMPTS,
        })
    }

    /// End the server session; with `forget`, also drop the remembered password.
    pub async fn logout(&self, username: Option<&str>, forget: bool) -> Result<(), AuthError> {
        self.client.logout().await?;
        if let (true, Some(username)) = (forget, username) {
            match self.passwords.remove(username, self.client.base_url()) {
                Ok(true) => info!(username, "forgot remembered password"),
                Ok(false) => {}
                Err(err) => warn!("could not forget password: {err}"),
            }
        }
        Ok(())
    }
}

fn logged_in(username: String, status: AuthStatus) -> LoggedIn {
    LoggedIn {
        username: Some(username),
        is_admin: status.is_admin,
    }
}
