//! System Browser
//!
//! Implements LinkOpener by handing the URL to the platform's opener.

use crate::domain::ports::LinkOpener;
use crate::error::UploadError;
use std::process::{Command, Stdio};

/// Opens links with `xdg-open`, `open` or `cmd /C start`.
#[derive(Debug, Default, Clone)]
pub struct SystemBrowser;

impl SystemBrowser {
    pub fn new() -> Self {
        Self
    }

    fn command(url: &str) -> Command {
        #[cfg(target_os = "macos")]
        let cmd = {
            let mut cmd = Command::new("open");
            cmd.arg(url);
            cmd
        };

        #[cfg(target_os = "windows")]
        let cmd = {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", "", url]);
            cmd
        };

        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let cmd = {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url);
            cmd
        };

        cmd
    }
}

impl LinkOpener for SystemBrowser {
    fn open(&self, url: &str) -> Result<(), UploadError> {
        tracing::debug!("opening browser at {}", url);
        Self::command(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }
}
