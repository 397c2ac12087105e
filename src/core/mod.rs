pub mod attachments;
pub mod catalog;
pub mod chat_stream;
pub mod config;
pub mod conversation;
pub mod error;
pub mod local_models;
pub mod model_id;
pub mod ndjson;
pub mod progress;
pub mod pull;
pub mod sessions;
