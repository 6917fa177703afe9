//! Headless Chrome surface driven over CDP. The image-search page renders its results
//! with scripts, so scrolling and extraction run against the live page.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::process::{Child, Command};
use tracing::{debug, info};

use super::cdp::{CdpClient, CdpError};
use super::document::HtmlDocument;
use super::extract::{Extraction, extract_matches};
use super::surface::{Surface, SurfaceError, SurfaceProvider};

const LAUNCH_TIMEOUT: Duration = Duration::from_secs(15);
const DISCOVERY_POLL: Duration = Duration::from_millis(200);

const BINARY_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

const SCROLL_JS: &str = "window.scrollTo(0, 500); window.scrollTo(0, 1000); window.scrollTo(0, 0); true";
const SNAPSHOT_JS: &str = "({ url: location.href, html: document.documentElement.outerHTML })";

impl From<CdpError> for SurfaceError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::Connect(_) | CdpError::Closed => SurfaceError::Unavailable(e.to_string()),
            _ => SurfaceError::Script(e.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct ChromeProvider {
    http: Client,
    binary: Option<String>,
}

impl ChromeProvider {
    /// `binary` overrides the search of well-known install locations.
    pub fn new(http: Client, binary: Option<String>) -> Self {
        Self { http, binary }
    }

    fn find_binary(&self) -> Option<String> {
        if let Some(ref path) = self.binary {
            return Some(path.clone());
        }
        BINARY_CANDIDATES
            .iter()
            .find(|c| {
                if c.contains('/') {
                    Path::new(c).exists()
                } else {
                    which::which(c).is_ok()
                }
            })
            .map(|c| c.to_string())
    }

    /// Polls the debugging endpoint until the initial page target shows up.
    async fn page_ws_url(&self, port: u16) -> Result<String, SurfaceError> {
        let list_url = format!("http://127.0.0.1:{port}/json/list");
        let deadline = Instant::now() + LAUNCH_TIMEOUT;

        while Instant::now() < deadline {
            if let Ok(response) = self.http.get(&list_url).send().await
                && let Ok(targets) = response.json::<Vec<Value>>().await
                && let Some(url) = page_target(&targets)
            {
                return Ok(url);
            }
            tokio::time::sleep(DISCOVERY_POLL).await;
        }
        Err(SurfaceError::Unavailable(format!(
            "Chrome debugging endpoint on port {port} not ready after {}s",
            LAUNCH_TIMEOUT.as_secs()
        )))
    }
}

fn page_target(targets: &[Value]) -> Option<String> {
    targets
        .iter()
        .filter(|t| t.get("type").and_then(Value::as_str) == Some("page"))
        .find_map(|t| t.get("webSocketDebuggerUrl").and_then(Value::as_str))
        .map(str::to_string)
}

fn chrome_args(port: u16, profile_dir: &Path) -> Vec<String> {
    vec![
        format!("--remote-debugging-port={port}"),
        format!("--user-data-dir={}", profile_dir.display()),
        "--headless=new".to_string(),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-extensions".to_string(),
        "--disable-sync".to_string(),
        "--mute-audio".to_string(),
        "--window-size=1280,2000".to_string(),
        "about:blank".to_string(),
    ]
}

async fn free_port() -> Result<u16, SurfaceError> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| SurfaceError::Unavailable(format!("no free port: {e}")))?;
    let port = listener
        .local_addr()
        .map_err(|e| SurfaceError::Unavailable(format!("no free port: {e}")))?
        .port();
    Ok(port)
}

impl SurfaceProvider for ChromeProvider {
    type Surface = ChromeSurface;

    async fn open(&self, target_url: &str) -> Result<ChromeSurface, SurfaceError> {
        let binary = self.find_binary().ok_or_else(|| {
            SurfaceError::Unavailable(
                "no Chrome or Chromium found; set LENSMATCH_CHROME or use --surface static".into(),
            )
        })?;
        let port = free_port().await?;
        let profile_dir = std::env::temp_dir().join(format!("lensmatch-chrome-{port}"));

        info!(%binary, port, "launching headless Chrome");
        // the child dies with this handle if any later step fails
        let process = Command::new(&binary)
            .args(chrome_args(port, &profile_dir))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SurfaceError::Unavailable(format!("failed to launch {binary}: {e}")))?;

        let ws_url = self.page_ws_url(port).await?;
        let page = PageDriver::attach(&ws_url).await?;
        page.cdp.navigate(target_url).await?;
        debug!(target = target_url, "surface opened");

        Ok(ChromeSurface {
            page,
            process,
            profile_dir,
            closed: false,
        })
    }
}

/// Scroll and snapshot operations on one attached page.
pub struct PageDriver {
    cdp: CdpClient,
}

#[derive(Deserialize)]
struct PageSnapshot {
    url: String,
    html: String,
}

impl PageDriver {
    pub async fn attach(ws_url: &str) -> Result<Self, CdpError> {
        let cdp = CdpClient::connect(ws_url).await?;
        cdp.send("Page.enable", json!({})).await?;
        cdp.send("Runtime.enable", json!({})).await?;
        Ok(Self { cdp })
    }

    pub async fn scroll(&self) -> Result<(), CdpError> {
        self.cdp.evaluate(SCROLL_JS).await.map(|_| ())
    }

    /// Serializes the rendered DOM and runs the extraction routine over it.
    pub async fn snapshot(&self) -> Result<Extraction, CdpError> {
        let value = self.cdp.evaluate(SNAPSHOT_JS).await?;
        let snapshot: PageSnapshot = serde_json::from_value(value)
            .map_err(|e| CdpError::Protocol(format!("unexpected page snapshot: {e}")))?;
        let doc = HtmlDocument::parse(&snapshot.html, Some(&snapshot.url));
        Ok(extract_matches(&doc))
    }
}

pub struct ChromeSurface {
    page: PageDriver,
    process: Child,
    profile_dir: PathBuf,
    closed: bool,
}

impl Surface for ChromeSurface {
    async fn scroll(&mut self) -> Result<(), SurfaceError> {
        if self.closed {
            return Err(SurfaceError::Unavailable("surface closed".into()));
        }
        Ok(self.page.scroll().await?)
    }

    async fn extract(&mut self) -> Result<Extraction, SurfaceError> {
        if self.closed {
            return Err(SurfaceError::Unavailable("surface closed".into()));
        }
        Ok(self.page.snapshot().await?)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.process.start_kill() {
            debug!(error = %e, "Chrome already exited");
        }
        if let Err(e) = std::fs::remove_dir_all(&self.profile_dir) {
            debug!(error = %e, dir = %self.profile_dir.display(), "profile dir not removed");
        }
    }
}
