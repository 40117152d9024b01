//! Causerie is a full-screen terminal client for a self-hosted chat server.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the chat session: transcript, composer, transport
//!   selection and reply aggregation, plus configuration and preferences.
//! - [`api`] defines the server's payloads and the HTTP client.
//! - [`auth`] establishes the cookie session, with optional keyring storage.
//! - [`ui`] renders the session and runs the interactive event loop.
//! - [`cli`] parses arguments and dispatches commands.
//!
//! The binary (`src/main.rs`) calls [`cli::main`].

pub mod api;
pub mod auth;
pub mod cli;
pub mod core;
pub mod logging;
pub mod ui;
pub mod utils;
