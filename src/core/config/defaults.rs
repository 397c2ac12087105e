use std::time::Duration;

use crate::api::client::{DEFAULT_DAEMON_URL, DEFAULT_REQUEST_TIMEOUT};
use crate::core::catalog::DEFAULT_CATALOG_URL;
use crate::core::config::data::Config;
use crate::core::model_id::ModelIdentifier;

pub const DAEMON_URL_ENV: &str = "LLAMASH_DAEMON_URL";
pub const DEFAULT_WEB_PORT: u16 = 8080;

impl Config {
    pub fn current_model(&self) -> Option<ModelIdentifier> {
        self.model
            .as_deref()
            .filter(|model| !model.trim().is_empty())
            .map(ModelIdentifier::normalize)
    }

    pub fn set_model(&mut self, model: &ModelIdentifier) {
        self.model = Some(model.canonical());
    }

    /// `LLAMASH_DAEMON_URL` wins over the file.
    pub fn daemon_url(&self) -> String {
        self.resolve_daemon_url(std::env::var(DAEMON_URL_ENV).ok().as_deref())
    }

    pub(crate) fn resolve_daemon_url(&self, env_value: Option<&str>) -> String {
        env_value
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .or(self.daemon_url.as_deref())
            .unwrap_or(DEFAULT_DAEMON_URL)
            .to_string()
    }

    pub fn catalog_url(&self) -> &str {
        self.catalog_url.as_deref().unwrap_or(DEFAULT_CATALOG_URL)
    }

    pub fn web_port(&self) -> u16 {
        self.web_port.unwrap_or(DEFAULT_WEB_PORT)
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }
}
