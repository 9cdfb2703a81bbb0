//! Open a URL in the user's browser via the platform handler.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::process::{Command, Stdio};

/// Hand a URL to the system opener. The child is detached; its output is
/// discarded so it cannot write over the terminal UI.
pub fn open_url(url: &str) -> Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(eyre!("Refusing to open non-HTTP URL: {}", url));
    }

    #[cfg(target_os = "macos")]
    let mut command = {
        let mut c = Command::new("open");
        c.arg(url);
        c
    };

    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    };

    #[cfg(all(unix, not(target_os = "macos")))]
    let mut command = {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };

    command
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| eyre!("Could not start URL handler: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_urls() {
        assert!(open_url("file:///etc/passwd").is_err());
        assert!(open_url("ftp://example.com").is_err());
    }
}
