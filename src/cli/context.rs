//! Resolves flags and config into the collaborators one command needs.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::api::BackendClient;
use crate::auth::{AuthManager, LoggedIn, TerminalPrompt};
use crate::core::config::Config;
use crate::core::keyring::PasswordStore;
use crate::core::preferences::{ConfigFilePreferences, PreferenceSource, StaticPreferences};
use crate::core::session::ChatSession;
use crate::core::transport::{
    EventSender, HttpOneShot, OneShotChannel, PersistentChannel, SocketChannel,
};
use crate::logging::LogTarget;
use crate::utils::url::{normalize_base_url, websocket_url};

use super::Args;

pub struct ChatContext {
    pub config: Config,
    config_path: Option<PathBuf>,
    pub server_url: String,
    pub streaming: bool,
    pub requested_model: Option<String>,
    client: BackendClient,
}

impl ChatContext {
    pub fn resolve(args: &Args) -> Result<Self, Box<dyn Error>> {
        let config_path = Config::config_path().ok();
        let config = match &config_path {
            Some(path) => Config::load_from_path(path)?,
            None => Config::default(),
        };
        Self::from_parts(args, config, config_path)
    }

    pub fn from_parts(
        args: &Args,
        config: Config,
        config_path: Option<PathBuf>,
    ) -> Result<Self, Box<dyn Error>> {
        let server_url = normalize_base_url(args.server.as_deref().unwrap_or(config.server_url()));
        let streaming = config.streaming_enabled() && !args.one_shot;
        let client = BackendClient::new(&server_url, config.request_timeout())?;
        let requested_model = args
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        Ok(Self {
            config,
            config_path,
            server_url,
            streaming,
            requested_model,
            client,
        })
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    pub fn socket_url(&self) -> String {
        websocket_url(&self.server_url, self.config.socket_path())
    }

    /// `--log` wins, then the config file, then the data directory.
    pub fn log_target(&self, args: &Args) -> LogTarget {
        args.log
            .clone()
            .or_else(|| self.config.log_file.clone())
            .or_else(Config::default_log_path)
            .map(LogTarget::File)
            .unwrap_or(LogTarget::Off)
    }

    fn auth(&self) -> AuthManager {
        AuthManager::new(self.client.clone(), PasswordStore::new(true))
    }

    pub async fn ensure_session(&self) -> Result<LoggedIn, Box<dyn Error>> {
        let logged = self
            .auth()
            .ensure_session(self.config.username.as_deref(), &mut TerminalPrompt)
            .await?;
        info!(server = %self.server_url, "session ready");
        Ok(logged)
    }

    pub async fn login(&self, remember: bool) -> Result<LoggedIn, Box<dyn Error>> {
        let logged = self
            .auth()
            .login(self.config.username.as_deref(), &mut TerminalPrompt, remember)
            .await?;
        Ok(logged)
    }

    pub async fn logout(&self, forget: bool) -> Result<(), Box<dyn Error>> {
        self.auth()
            .logout(self.config.username.as_deref(), forget)
            .await?;
        Ok(())
    }

    pub fn one_shot_channel(&self) -> Arc<dyn OneShotChannel> {
        Arc::new(HttpOneShot::new(self.client.clone()))
    }

    fn preferences(&self) -> Box<dyn PreferenceSource> {
        match &self.config_path {
            Some(path) => Box::new(ConfigFilePreferences::new(path.clone())),
            None => Box::new(StaticPreferences::default()),
        }
    }

    /// Build a session whose persistent channel (when streaming is enabled)
    /// is already connecting and reports to `events`.
    pub fn build_session(&self, events: EventSender) -> ChatSession {
        let channel: Option<Box<dyn PersistentChannel>> = if self.streaming {
            let socket = SocketChannel::new(self.socket_url(), self.client.session_cookie(), events);
            socket.connect();
            debug!(url = %socket.url(), "connecting persistent channel");
            Some(Box::new(socket))
        } else {
            None
        };
        ChatSession::new(self.config.max_input_chars(), channel, self.preferences())
            .with_requested_model(self.requested_model.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn context(argv: &[&str], config: Config) -> ChatContext {
        let args = Args::parse_from(argv);
        ChatContext::from_parts(&args, config, None).unwrap()
    }

    #[test]
    fn server_flag_overrides_config() {
        let config = Config {
            server_url: Some("http://config:5000".into()),
            ..Default::default()
        };
        let ctx = context(&["causerie", "--server", "http://flag:8080/"], config.clone());
        assert_eq!(ctx.server_url, "http://flag:8080");

        let ctx = context(&["causerie"], config);
        assert_eq!(ctx.server_url, "http://config:5000");
        assert_eq!(ctx.socket_url(), "ws://config:5000/ws/socket.io");
    }

    #[test]
    fn one_shot_flag_or_config_disables_streaming() {
        assert!(context(&["causerie"], Config::default()).streaming);
        assert!(!context(&["causerie", "--one-shot"], Config::default()).streaming);
        let config = Config {
            streaming: Some(false),
            ..Default::default()
        };
        assert!(!context(&["causerie"], config).streaming);
    }

    #[test]
    fn blank_model_flag_is_ignored() {
        assert_eq!(
            context(&["causerie", "-m", " "], Config::default()).requested_model,
            None
        );
        assert_eq!(
            context(&["causerie", "--model", "llama3"], Config::default())
                .requested_model
                .as_deref(),
            Some("llama3")
        );
    }

    #[test]
    fn log_flag_wins_over_config() {
        let config = Config {
            log_file: Some(PathBuf::from("/tmp/from-config.log")),
            ..Default::default()
        };
        let args = Args::parse_from(["causerie", "--log", "/tmp/flag.log"]);
        let ctx = ChatContext::from_parts(&args, config.clone(), None).unwrap();
        assert_eq!(
            ctx.log_target(&args),
            LogTarget::File(PathBuf::from("/tmp/flag.log"))
        );

        let args = Args::parse_from(["causerie"]);
        let ctx = ChatContext::from_parts(&args, config, None).unwrap();
        assert_eq!(
            ctx.log_target(&args),
            LogTarget::File(PathBuf::from("/tmp/from-config.log"))
        );
    }

    #[tokio::test]
    async fn one_shot_session_has_no_persistent_channel() {
        let ctx = context(&["causerie", "--one-shot"], Config::default());
        let (tx, _rx) = crate::core::transport::event_channel();
        let session = ctx.build_session(tx);
        assert_eq!(
            session.channel_mode(),
            crate::core::transport::ChannelMode::OneShot
        );
    }
}
