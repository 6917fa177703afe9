//! Runtime choice between the browser surface and the static-page fallback.

use super::chrome::{ChromeProvider, ChromeSurface};
use super::extract::Extraction;
use super::http_surface::{HttpSurface, HttpSurfaceProvider};
use super::surface::{Surface, SurfaceError, SurfaceProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SurfaceKind {
    /// Headless Chrome; runs the results page's scripts
    #[default]
    Chrome,
    /// Plain HTTP fetch of the results markup
    Static,
}

pub enum BackendProvider {
    Chrome(ChromeProvider),
    Static(HttpSurfaceProvider),
}

pub enum BackendSurface {
    Chrome(ChromeSurface),
    Static(HttpSurface),
}

impl SurfaceProvider for BackendProvider {
    type Surface = BackendSurface;

    async fn open(&self, target_url: &str) -> Result<BackendSurface, SurfaceError> {
        match self {
            BackendProvider::Chrome(p) => p.open(target_url).await.map(BackendSurface::Chrome),
            BackendProvider::Static(p) => p.open(target_url).await.map(BackendSurface::Static),
        }
    }
}

impl Surface for BackendSurface {
    async fn scroll(&mut self) -> Result<(), SurfaceError> {
        match self {
            BackendSurface::Chrome(s) => s.scroll().await,
            BackendSurface::Static(s) => s.scroll().await,
        }
    }

    async fn extract(&mut self) -> Result<Extraction, SurfaceError> {
        match self {
            BackendSurface::Chrome(s) => s.extract().await,
            BackendSurface::Static(s) => s.extract().await,
        }
    }

    fn close(&mut self) {
        match self {
            BackendSurface::Chrome(s) => s.close(),
            BackendSurface::Static(s) => s.close(),
        }
    }
}
