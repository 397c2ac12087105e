//! llamash is a friendlier front end for a locally running Ollama daemon.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns model identifiers, the streaming decoders for chat and
//!   pull responses, conversations, attachments, the model inventory, and
//!   configuration.
//! - [`api`] defines the daemon's wire payloads and the HTTP client that
//!   drives them.
//! - [`cli`] parses arguments and implements each subcommand, including the
//!   interactive shell.
//! - [`web`] serves the browser chat backend with per-session histories.
//!
//! The binary (`src/main.rs`) only forwards to [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
pub mod web;
