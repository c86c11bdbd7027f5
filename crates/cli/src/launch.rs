//! Local headless browser launch for `--launch`.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::info;

use crate::driver::probe;

const CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

/// A browser process this keeper spawned. Killed on drop.
pub struct LaunchedBrowser {
    child: Child,
    endpoint: String,
}

impl LaunchedBrowser {
    pub async fn launch(port: u16) -> anyhow::Result<Self> {
        let executable = find_browser().context(
            "could not find a Chromium/Chrome executable; install one or attach with --cdp-endpoint",
        )?;
        let profile = std::env::temp_dir().join(format!("wakefleet-profile-{port}"));

        let mut cmd = Command::new(&executable);
        cmd.args([
            format!("--remote-debugging-port={port}"),
            "--headless=new".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            format!("--user-data-dir={}", profile.display()),
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to launch {}", executable.display()))?;

        let endpoint = format!("http://127.0.0.1:{port}");
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(400))
            .build()?;

        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(250)).await;

            if let Ok(Some(status)) = child.try_wait() {
                bail!("browser exited before its debugging endpoint came up (status: {status})");
            }

            if let Ok(version) = probe(&client, &endpoint).await {
                info!(
                    target = "wakefleet",
                    browser = version.browser.as_deref().unwrap_or("unknown"),
                    %endpoint,
                    "launched local browser"
                );
                return Ok(Self { child, endpoint });
            }
        }

        let _ = child.kill();
        bail!("browser launched but {endpoint}/json/version never became reachable");
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Drop for LaunchedBrowser {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

fn find_browser() -> Option<PathBuf> {
    CANDIDATES.iter().find_map(|name| which::which(name).ok())
}
