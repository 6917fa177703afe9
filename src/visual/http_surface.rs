//! Static-page surface: fetches the results page over HTTP and extracts from its markup.
//!
//! No script execution, so scrolling has nothing to trigger and client-rendered results
//! never appear. Fallback for hosts without Chrome; see `chrome` for the real surface.

use reqwest::Client;
use tracing::debug;

use super::document::HtmlDocument;
use super::extract::{Extraction, extract_matches};
use super::surface::{Surface, SurfaceError, SurfaceProvider};

const BROWSER_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

#[derive(Clone)]
pub struct HttpSurfaceProvider {
    http: Client,
}

impl HttpSurfaceProvider {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

pub struct HttpSurface {
    http: Client,
    url: String,
    closed: bool,
}

impl HttpSurface {
    async fn load(&self) -> Result<(String, String), SurfaceError> {
        let response = self
            .http
            .get(&self.url)
            .header("User-Agent", BROWSER_UA)
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SurfaceError::Unavailable(format!("status {status}")));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !content_type.is_empty() && !content_type.contains("html") {
            return Err(SurfaceError::Script(format!(
                "cannot run extraction on {content_type}"
            )));
        }
        let final_url = response.url().to_string();
        let html = response.text().await?;
        Ok((final_url, html))
    }
}

impl SurfaceProvider for HttpSurfaceProvider {
    type Surface = HttpSurface;

    async fn open(&self, target_url: &str) -> Result<HttpSurface, SurfaceError> {
        let surface = HttpSurface {
            http: self.http.clone(),
            url: target_url.to_string(),
            closed: false,
        };
        // Follow the upload redirect once so later polls hit the results page directly.
        let (final_url, _) = surface.load().await?;
        debug!(url = %final_url, "surface opened");
        Ok(HttpSurface {
            url: final_url,
            ..surface
        })
    }
}

impl Surface for HttpSurface {
    async fn scroll(&mut self) -> Result<(), SurfaceError> {
        Ok(())
    }

    async fn extract(&mut self) -> Result<Extraction, SurfaceError> {
        if self.closed {
            return Err(SurfaceError::Unavailable("surface closed".into()));
        }
        let (final_url, html) = self.load().await?;
        let doc = HtmlDocument::parse(&html, Some(&final_url));
        Ok(extract_matches(&doc))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
