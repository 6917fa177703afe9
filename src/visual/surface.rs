use std::ops::{Deref, DerefMut};

use tracing::debug;

use super::extract::Extraction;

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("search surface unavailable: {0}")]
    Unavailable(String),

    #[error("script injection failed: {0}")]
    Script(String),

    #[error("surface request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// A hidden, unfocused page the image-search service runs in.
pub trait Surface {
    /// Scrolls down and back to the top so lazy-loaded results materialize.
    async fn scroll(&mut self) -> Result<(), SurfaceError>;

    /// Runs the extraction routine against the current page.
    async fn extract(&mut self) -> Result<Extraction, SurfaceError>;

    /// Closes the surface. Must not fail; errors are the implementation's to log.
    fn close(&mut self);
}

pub trait SurfaceProvider {
    type Surface: Surface;

    async fn open(&self, target_url: &str) -> Result<Self::Surface, SurfaceError>;
}

/// Exclusive hold on an open surface; closes it exactly once when dropped.
pub struct Lease<S: Surface> {
    surface: S,
}

impl<S: Surface> Lease<S> {
    pub fn new(surface: S) -> Self {
        Self { surface }
    }

    pub fn release(self) {
        drop(self);
    }
}

impl<S: Surface> Deref for Lease<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.surface
    }
}

impl<S: Surface> DerefMut for Lease<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

impl<S: Surface> Drop for Lease<S> {
    fn drop(&mut self) {
        debug!("releasing search surface");
        self.surface.close();
    }
}
