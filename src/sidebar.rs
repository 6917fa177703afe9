//! Page and sidebar state: what the shopper sees and which search runs next.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::keyword::KeywordSearch;
use crate::messages::{Core, FrameMessage, PageMessage, Request, Response, Status};
use crate::product::{MatchResult, PageMeta, ScrapedProduct};
use crate::title::{expand_queries, normalize};
use crate::visual::Sleep;
use crate::visual::document::{DomNode, Document};
use crate::visual::surface::SurfaceProvider;

pub const PRODUCT_KEY: &str = "aliProduct";

/// Transient session storage holding the last scraped product.
#[derive(Debug, Default)]
pub struct ProductStore {
    slots: Mutex<HashMap<&'static str, ScrapedProduct>>,
}

impl ProductStore {
    pub fn save(&self, product: ScrapedProduct) {
        debug!(key = PRODUCT_KEY, title = %product.title, "product stored");
        self.lock().insert(PRODUCT_KEY, product);
    }

    pub fn load(&self) -> Option<ScrapedProduct> {
        self.lock().get(PRODUCT_KEY).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<&'static str, ScrapedProduct>> {
        // a poisoned slot still holds a complete record
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// The wholesale product page: scrapes itself and owns the sidebar's open state.
pub struct Page<'s> {
    store: &'s ProductStore,
    url: String,
    sidebar_open: bool,
}

impl<'s> Page<'s> {
    pub fn new(store: &'s ProductStore, url: &str) -> Self {
        Self {
            store,
            url: url.to_string(),
            sidebar_open: false,
        }
    }

    pub fn scrape(&self, meta: PageMeta) -> ScrapedProduct {
        let product = ScrapedProduct::from_page(PageMeta {
            url: self.url.clone(),
            ..meta
        });
        self.store.save(product.clone());
        product
    }

    pub fn is_sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn toggle_sidebar(&mut self) -> bool {
        self.sidebar_open = !self.sidebar_open;
        self.sidebar_open
    }

    /// Returns the message to forward to the sidebar frame, if any.
    pub fn on_message(&mut self, message: PageMessage) -> Option<FrameMessage> {
        match message {
            PageMessage::ContextSearchTrigger { text } => {
                self.store
                    .save(ScrapedProduct::from_selection(&text, &self.url));
                if !self.sidebar_open {
                    self.toggle_sidebar();
                }
                Some(FrameMessage::RefreshData)
            }
        }
    }

    pub fn on_frame_message(&mut self, message: FrameMessage) {
        match message {
            FrameMessage::CloseSidebar if self.sidebar_open => {
                self.toggle_sidebar();
            }
            _ => {}
        }
    }
}

/// Reads the Open Graph title and image plus the document title from page markup.
pub fn read_page_meta<D: Document>(doc: &D, url: &str) -> PageMeta {
    let og = |property: &str| {
        doc.query_all(&format!("meta[property=\"{property}\"]"))
            .ok()?
            .into_iter()
            .find_map(|node| node.attr("content"))
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
    };
    let document_title = doc
        .query_all("title")
        .ok()
        .and_then(|nodes| nodes.first().map(DomNode::inner_text))
        .unwrap_or_default();

    PageMeta {
        og_title: og("og:title"),
        document_title: document_title.trim().to_string(),
        og_image: og("og:image").and_then(|src| doc.resolve_url(&src)),
        url: url.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Visual,
    Keyword,
}

/// What the sidebar tells the shopper instead of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    NoProduct,
    NoImage,
    NoVisualMatches,
    NoKeywordMatches,
    Failed(String),
}

impl Notice {
    /// True when the other search mode is worth a try.
    pub fn suggests_keyword(&self) -> bool {
        matches!(self, Notice::NoImage | Notice::NoVisualMatches)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NoProduct => f.write_str("No product data found. Refresh the product page."),
            Notice::NoImage => f.write_str("No product image available for visual search."),
            Notice::NoVisualMatches => {
                f.write_str("No visual matches on Daraz. Try keyword search below.")
            }
            Notice::NoKeywordMatches => f.write_str("No keyword matches found."),
            Notice::Failed(message) => write!(f, "Search failed: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayProduct {
    pub title: String,
    pub original_title: String,
    pub image: String,
}

#[derive(Debug, Default)]
pub struct Sidebar {
    pub product: Option<DisplayProduct>,
    pub results: Vec<MatchResult>,
    pub mode: SearchMode,
    pub notice: Option<Notice>,
}

impl Sidebar {
    /// Reloads the stored product and starts a visual search for it.
    pub async fn refresh<P, S, K>(&mut self, store: &ProductStore, core: &Core<P, S, K>)
    where
        P: SurfaceProvider,
        S: Sleep,
        K: KeywordSearch,
    {
        let Some(product) = store.load() else {
            self.product = None;
            self.results.clear();
            self.notice = Some(Notice::NoProduct);
            return;
        };

        let shown = DisplayProduct {
            title: normalize(&product.title),
            original_title: product.title,
            image: product.image,
        };
        info!(title = %shown.title, "sidebar refreshed");
        self.product = Some(shown);
        self.visual_search(core).await;
    }

    pub async fn visual_search<P, S, K>(&mut self, core: &Core<P, S, K>)
    where
        P: SurfaceProvider,
        S: Sleep,
        K: KeywordSearch,
    {
        self.start(SearchMode::Visual);
        let image = self
            .product
            .as_ref()
            .map(|p| p.image.clone())
            .unwrap_or_default();
        if image.is_empty() {
            self.notice = Some(Notice::NoImage);
            return;
        }

        let response = core.handle(Request::VisualSearch { image_url: image }).await;
        self.apply_visual(response);
    }

    /// Searches the catalog for `query`. Without one, tries each expanded query for the
    /// product title in turn and keeps the first that finds anything.
    pub async fn keyword_search<P, S, K>(&mut self, core: &Core<P, S, K>, query: Option<&str>)
    where
        P: SurfaceProvider,
        S: Sleep,
        K: KeywordSearch,
    {
        let queries: Vec<String> = match query {
            Some(q) => vec![q.to_string()],
            None => self
                .product
                .as_ref()
                .map(|p| expand_queries(&p.original_title))
                .unwrap_or_default(),
        }
        .into_iter()
        .filter(|q| !q.trim().is_empty())
        .collect();
        if queries.is_empty() {
            return;
        }

        self.start(SearchMode::Keyword);
        let mut response = Response::empty(false);
        for query in queries {
            response = core.handle(Request::SearchDaraz { query: query.clone() }).await;
            if response.status != Status::Empty {
                break;
            }
            debug!(%query, "no keyword matches, trying next query");
        }
        self.apply_keyword(response);
    }

    fn start(&mut self, mode: SearchMode) {
        self.mode = mode;
        self.results.clear();
        self.notice = None;
    }

    fn apply_visual(&mut self, response: Response) {
        self.notice = match response.status {
            Status::Success if !response.results().is_empty() => {
                self.results = response.results.unwrap_or_default();
                None
            }
            Status::Error => Some(Notice::Failed(response.message.unwrap_or_default())),
            _ => {
                debug!(fallback = ?response.fallback_suggested, "no visual matches");
                Some(Notice::NoVisualMatches)
            }
        };
    }

    fn apply_keyword(&mut self, response: Response) {
        self.notice = match response.status {
            Status::Success => {
                self.results = response.results.unwrap_or_default();
                None
            }
            Status::Empty => Some(Notice::NoKeywordMatches),
            Status::Error => Some(Notice::Failed(response.message.unwrap_or_default())),
        };
    }
}
