pub mod aggregator;
pub mod composer;
pub mod config;
pub mod constants;
pub mod keyring;
pub mod message;
pub mod preferences;
pub mod session;
pub mod transcript;
pub mod transport;
