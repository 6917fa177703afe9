//! Message contract between the sidebar, the page, and the search core.

mod errors;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{info, warn};

use errors::{keyword_to_response, visual_to_response};

use crate::keyword::KeywordSearch;
use crate::product::MatchResult;
use crate::visual::surface::SurfaceProvider;
use crate::visual::{Sleep, VisualSearch};

/// Requests the sidebar sends to the search core.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "action")]
pub enum Request {
    #[serde(rename = "VISUAL_SEARCH", rename_all = "camelCase")]
    VisualSearch {
        #[serde(default)]
        image_url: String,
    },
    #[serde(rename = "SEARCH_DARAZ")]
    SearchDaraz {
        #[serde(default)]
        query: String,
    },
}

/// Messages delivered to the page collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageMessage {
    ContextSearchTrigger {
        #[serde(default)]
        text: String,
    },
}

/// Window messages exchanged between the page and the sidebar frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrameMessage {
    RefreshData,
    CloseSidebar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Empty,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<MatchResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_suggested: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    pub fn success(results: Vec<MatchResult>) -> Self {
        Self {
            status: Status::Success,
            results: Some(results),
            fallback_suggested: None,
            message: None,
        }
    }

    pub fn empty(fallback_suggested: bool) -> Self {
        Self {
            status: Status::Empty,
            results: Some(Vec::new()),
            fallback_suggested: fallback_suggested.then_some(true),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            results: None,
            fallback_suggested: None,
            message: Some(message.into()),
        }
    }

    pub fn results(&self) -> &[MatchResult] {
        self.results.as_deref().unwrap_or_default()
    }
}

/// Dispatches sidebar requests onto the visual and keyword search paths.
pub struct Core<P, S, K> {
    visual: VisualSearch<P, S>,
    keyword: K,
}

impl<P, S, K> Core<P, S, K>
where
    P: SurfaceProvider,
    S: Sleep,
    K: KeywordSearch,
{
    pub fn new(visual: VisualSearch<P, S>, keyword: K) -> Self {
        Self { visual, keyword }
    }

    #[cfg(test)]
    pub(crate) fn visual(&self) -> &VisualSearch<P, S> {
        &self.visual
    }

    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::VisualSearch { image_url } => {
                info!(image = %truncate(&image_url, 100), "VISUAL_SEARCH");
                match self.visual.search_by_image(&image_url).await {
                    Ok(results) if !results.is_empty() => {
                        info!(results = results.len(), "visual search found results");
                        Response::success(results)
                    }
                    Ok(_) => Response::empty(true),
                    Err(e) => visual_to_response(e),
                }
            }
            Request::SearchDaraz { query } => {
                info!(%query, "SEARCH_DARAZ");
                match self.keyword.search(&query).await {
                    Ok(results) if !results.is_empty() => Response::success(results),
                    Ok(_) => Response::empty(false),
                    Err(e) => keyword_to_response(e),
                }
            }
        }
    }

    /// Handles `request` and sends the response, abandoning the search if the
    /// requester hangs up first. Abandoning drops the search, which releases its surface.
    pub async fn respond(&self, request: Request, mut reply: oneshot::Sender<Response>) {
        let outcome = tokio::select! {
            response = self.handle(request) => Some(response),
            () = reply.closed() => None,
        };

        match outcome {
            Some(response) => {
                if reply.send(response).is_err() {
                    warn!("requester went away before the response was delivered");
                }
            }
            None => info!("requester went away, search abandoned"),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
