//! Terminal UI layer for interactive chat sessions.
//!
//! - [`chat_loop`]: the loop that feeds input and transport events to the
//!   [`crate::core::session::ChatSession`] it owns.
//! - [`renderer`] and [`transcript_view`]: frame output.
//!
//! This layer only presents the session; [`crate::core`] owns its state.

pub mod chat_loop;
pub mod renderer;
pub mod transcript_view;
