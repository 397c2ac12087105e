use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk settings. Every key is optional; accessors in `defaults` fill in
/// the fallbacks.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Current model in canonical `name:tag` form
    pub model: Option<String>,
    /// Base URL of the local daemon
    pub daemon_url: Option<String>,
    /// Library page scraped for `list`
    pub catalog_url: Option<String>,
    /// Port for the browser chat backend
    pub web_port: Option<u16>,
    /// Ceiling for a whole chat or pull call
    pub request_timeout_secs: Option<u64>,
}

/// Display a path with the home directory shortened to `~` on Unix.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
