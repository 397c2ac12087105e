use std::path::Path;

use tokio::process::Command;
use tracing::info;

const WSL_INTEROP: &str = "/proc/sys/fs/binfmt_misc/WSLInterop";

fn opener(url: &str) -> Option<(&'static str, Vec<String>)> {
    if cfg!(target_os = "windows") {
        Some(("cmd", vec!["/c".into(), "start".into(), url.into()]))
    } else if cfg!(target_os = "macos") {
        Some(("open", vec![url.into()]))
    } else if Path::new(WSL_INTEROP).exists() {
        None
    } else {
        Some(("xdg-open", vec![url.into()]))
    }
}

/// Opens `url` in the desktop browser. Under WSL there is no usable opener,
/// so the URL is only logged.
pub async fn open_browser(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some((program, args)) = opener(url) else {
        info!(url, "WSL detected; open the URL manually");
        return Ok(());
    };

    let status = Command::new(program).args(&args).status().await?;
    if !status.success() {
        return Err(format!("{program} exited with {status}").into());
    }
    Ok(())
}
