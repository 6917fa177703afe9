//! Visual search: drives an image-search surface and polls it for marketplace listings.

pub mod backend;
pub mod cdp;
pub mod chrome;
pub mod document;
pub mod extract;
pub mod http_surface;
pub mod surface;

use std::time::Duration;

use percent_encoding::utf8_percent_encode;
use tracing::{debug, info, warn};

use crate::COMPONENT_ENCODE_SET;
use crate::product::MatchResult;
use surface::{Lease, Surface, SurfaceError, SurfaceProvider};

pub const DEFAULT_LENS_URL: &str = "https://lens.google.com";

#[derive(Debug, thiserror::Error)]
pub enum VisualError {
    #[error("No image URL provided")]
    MissingImage,

    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// Timing of the polling loop. Fixed interval: the bottleneck is the image service's
/// processing latency, not contention.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub settle_delay: Duration,
    pub interval: Duration,
    pub max_attempts: u32,
    /// A ready page with no matches is only accepted after this many attempts.
    pub ready_grace: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(5),
            interval: Duration::from_secs(2),
            max_attempts: 25,
            ready_grace: 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Pending,
    Found,
    Empty,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSession {
    pub attempt: u32,
    pub max_attempts: u32,
    pub status: SessionStatus,
}

impl SearchSession {
    fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            status: SessionStatus::Pending,
        }
    }

    /// Advances the counter; false once the ceiling is exceeded.
    fn next_attempt(&mut self) -> bool {
        self.attempt += 1;
        self.attempt <= self.max_attempts
    }

    fn has_attempts_left(&self) -> bool {
        self.attempt < self.max_attempts
    }
}

#[derive(Debug)]
pub struct SessionReport {
    pub session: SearchSession,
    pub matches: Vec<MatchResult>,
}

/// Suspension between polls; swapped out in tests.
pub trait Sleep {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleep;

impl Sleep for TokioSleep {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub struct VisualSearch<P, S = TokioSleep> {
    provider: P,
    sleeper: S,
    policy: PollPolicy,
    lens_url: String,
}

impl<P: SurfaceProvider> VisualSearch<P> {
    pub fn new(provider: P, policy: PollPolicy, lens_url: &str) -> Self {
        Self::with_sleeper(provider, TokioSleep, policy, lens_url)
    }
}

impl<P: SurfaceProvider, S: Sleep> VisualSearch<P, S> {
    pub fn with_sleeper(provider: P, sleeper: S, policy: PollPolicy, lens_url: &str) -> Self {
        Self {
            provider,
            sleeper,
            policy,
            lens_url: lens_url.trim_end_matches('/').to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn provider(&self) -> &P {
        &self.provider
    }

    pub fn target_url(&self, image_url: &str) -> String {
        format!(
            "{}/uploadbyurl?url={}",
            self.lens_url,
            utf8_percent_encode(image_url, COMPONENT_ENCODE_SET)
        )
    }

    pub async fn search_by_image(&self, image_url: &str) -> Result<Vec<MatchResult>, VisualError> {
        let report = self.run_session(image_url).await?;
        info!(
            status = ?report.session.status,
            attempts = report.session.attempt,
            max_attempts = report.session.max_attempts,
            "visual search session finished"
        );
        Ok(report.matches)
    }

    pub async fn run_session(&self, image_url: &str) -> Result<SessionReport, VisualError> {
        if image_url.trim().is_empty() {
            return Err(VisualError::MissingImage);
        }

        let target = self.target_url(image_url);
        let mut session = SearchSession::new(self.policy.max_attempts);
        info!(%target, "opening visual search surface");

        let mut surface = match self.provider.open(&target).await {
            Ok(s) => Lease::new(s),
            Err(e) => {
                session.status = SessionStatus::Error;
                warn!(error = %e, status = ?session.status, "could not open search surface");
                return Err(e.into());
            }
        };

        self.sleeper.sleep(self.policy.settle_delay).await;

        while session.next_attempt() {
            let attempt = session.attempt;
            match poll_once(&mut surface).await {
                Err(e) => {
                    debug!(attempt, error = %e, "extraction unavailable, retrying");
                }
                Ok(extraction) if !extraction.matches.is_empty() => {
                    info!(attempt, found = extraction.matches.len(), "visual matches found");
                    surface.release();
                    session.status = SessionStatus::Found;
                    return Ok(SessionReport {
                        session,
                        matches: extraction.matches,
                    });
                }
                Ok(extraction) if extraction.page_ready && attempt > self.policy.ready_grace => {
                    info!(attempt, trace = ?extraction.debug_trace, "page ready, no marketplace matches");
                    surface.release();
                    session.status = SessionStatus::Empty;
                    return Ok(SessionReport {
                        session,
                        matches: Vec::new(),
                    });
                }
                Ok(extraction) => {
                    debug!(attempt, ready = extraction.page_ready, links = extraction.link_count, "no matches yet");
                }
            }

            if session.has_attempts_left() {
                self.sleeper.sleep(self.policy.interval).await;
            }
        }

        info!(attempts = self.policy.max_attempts, "attempt ceiling reached");
        surface.release();
        session.attempt = session.max_attempts;
        session.status = SessionStatus::Empty;
        Ok(SessionReport {
            session,
            matches: Vec::new(),
        })
    }
}

async fn poll_once<S: Surface>(surface: &mut Lease<S>) -> Result<extract::Extraction, SurfaceError> {
    surface.scroll().await?;
    surface.extract().await
}
