use serde::{Deserialize, Serialize};

/// Product data scraped from a wholesale listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedProduct {
    #[serde(default)]
    pub title: String,
    /// Image URL; empty when the product was seeded from selected text.
    #[serde(default)]
    pub image: String,
    #[serde(default, alias = "url")]
    pub source_url: String,
}

/// Page metadata as read by the content collaborator.
#[derive(Debug, Default, Clone)]
pub struct PageMeta {
    pub og_title: Option<String>,
    pub document_title: String,
    pub og_image: Option<String>,
    pub url: String,
}

impl ScrapedProduct {
    pub fn from_page(meta: PageMeta) -> Self {
        let raw = meta
            .og_title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(meta.document_title);
        Self {
            title: strip_site_suffix(&raw),
            image: meta.og_image.unwrap_or_default(),
            source_url: meta.url,
        }
    }

    /// Product seeded from a context-menu text selection.
    pub fn from_selection(text: &str, page_url: &str) -> Self {
        Self {
            title: text.to_string(),
            image: String::new(),
            source_url: page_url.to_string(),
        }
    }
}

/// Drops " - Alibaba.com" and any other trailing " - ..." segment.
fn strip_site_suffix(title: &str) -> String {
    let lower = title.to_ascii_lowercase();
    let without_site = match lower.find(" - alibaba.com") {
        Some(i) => {
            let end = i + " - alibaba.com".len();
            format!("{}{}", &title[..i], &title[end..])
        }
        None => title.to_string(),
    };
    let head = match without_site.find(" - ") {
        Some(i) => &without_site[..i],
        None => &without_site,
    };
    head.trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Visual,
    Keyword,
}

/// One retail listing found by either search path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub url: String,
    pub title: String,
    pub image: String,
    pub price: String,
    pub rating: Option<String>,
    pub source: MatchSource,
}
