//! Minimal document capability set the extraction routine runs against.

use scraper::{ElementRef, Html, Selector};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum DomError {
    #[error("invalid selector: {0}")]
    InvalidSelector(String),
}

/// Read-only view of a rendered page.
pub trait Document {
    type Node<'a>: DomNode
    where
        Self: 'a;

    fn query_all(&self, selector: &str) -> Result<Vec<Self::Node<'_>>, DomError>;

    /// Visible text of the page body.
    fn body_text(&self) -> String;

    /// Resolves a possibly relative link against the document URL.
    fn resolve_url(&self, href: &str) -> Option<String>;

    fn host(&self) -> Option<String>;
}

pub trait DomNode: Sized + Clone {
    fn tag_name(&self) -> String;
    fn attr(&self, name: &str) -> Option<String>;
    /// Text of all descendants, one trimmed text run per line.
    fn inner_text(&self) -> String;
    /// Text of direct child text nodes only.
    fn own_text(&self) -> String;
    fn inner_html(&self) -> String;
    fn parent(&self) -> Option<Self>;
    fn query_all(&self, selector: &str) -> Result<Vec<Self>, DomError>;
}

/// Parsed static HTML, backed by `scraper`.
pub struct HtmlDocument {
    html: Html,
    base: Option<Url>,
}

impl HtmlDocument {
    pub fn parse(markup: &str, base: Option<&str>) -> Self {
        Self {
            html: Html::parse_document(markup),
            base: base.and_then(|b| Url::parse(b).ok()),
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector, DomError> {
    Selector::parse(selector).map_err(|e| DomError::InvalidSelector(format!("{selector}: {e}")))
}

impl Document for HtmlDocument {
    type Node<'a> = ElementRef<'a>;

    fn query_all(&self, selector: &str) -> Result<Vec<ElementRef<'_>>, DomError> {
        let selector = parse_selector(selector)?;
        Ok(self.html.select(&selector).collect())
    }

    fn body_text(&self) -> String {
        match self.query_all("body") {
            Ok(bodies) => bodies.first().map(DomNode::inner_text).unwrap_or_default(),
            Err(_) => String::new(),
        }
    }

    fn resolve_url(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        match &self.base {
            Some(base) => base.join(href).ok().map(String::from),
            None => Url::parse(href).ok().map(String::from),
        }
    }

    fn host(&self) -> Option<String> {
        self.base
            .as_ref()
            .and_then(|b| b.host_str())
            .map(str::to_ascii_lowercase)
    }
}

const NON_VISIBLE: &[&str] = &["script", "style", "noscript", "template"];

impl DomNode for ElementRef<'_> {
    fn tag_name(&self) -> String {
        self.value().name().to_ascii_lowercase()
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.value().attr(name).map(str::to_string)
    }

    fn inner_text(&self) -> String {
        let mut lines = Vec::new();
        for node in self.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node
                .parent()
                .and_then(|p| p.value().as_element().map(|e| NON_VISIBLE.contains(&e.name())))
                .unwrap_or(false);
            let trimmed = text.trim();
            if !hidden && !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
        lines.join("\n")
    }

    fn own_text(&self) -> String {
        self.children()
            .filter_map(|c| c.value().as_text().map(|t| t.trim().to_string()))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn inner_html(&self) -> String {
        ElementRef::inner_html(self)
    }

    fn parent(&self) -> Option<Self> {
        // NodeRef::parent, not this trait method
        (**self).parent().and_then(ElementRef::wrap)
    }

    fn query_all(&self, selector: &str) -> Result<Vec<Self>, DomError> {
        let selector = parse_selector(selector)?;
        Ok(self.select(&selector).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>t</title><script>var hidden = 1;</script></head>
<body>
  <div id="card" data-hveid="x">
    Intro <span>Steel Mug</span>
    <a href="/p/1"><img src="https://img.example/a.jpg"></a>
    <style>.c { color: red }</style>
  </div>
</body></html>"#;

    fn doc() -> HtmlDocument {
        HtmlDocument::parse(PAGE, Some("https://lens.google.com/search?p=1"))
    }

    #[test]
    fn body_text_skips_scripts_and_styles() {
        let text = doc().body_text();
        assert!(text.contains("Steel Mug"));
        assert!(!text.contains("hidden"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn resolves_relative_links_against_base() {
        assert_eq!(
            doc().resolve_url("/p/1").as_deref(),
            Some("https://lens.google.com/p/1")
        );
        assert_eq!(doc().host().as_deref(), Some("lens.google.com"));
    }

    #[test]
    fn without_base_only_absolute_links_resolve() {
        let d = HtmlDocument::parse(PAGE, None);
        assert!(d.resolve_url("/p/1").is_none());
        assert!(d.resolve_url("https://a.com/x").is_some());
    }

    #[test]
    fn node_navigation_and_text() {
        let d = doc();
        let anchors = d.query_all("a").unwrap();
        let card = anchors[0].parent().unwrap();
        assert_eq!(card.attr("id").as_deref(), Some("card"));
        assert_eq!(card.own_text(), "Intro");
        assert_eq!(card.query_all("img").unwrap().len(), 1);
        assert!(card.inner_html().contains("img.example"));
    }

    #[test]
    fn bad_selector_is_an_error() {
        assert!(matches!(doc().query_all("a[["), Err(DomError::InvalidSelector(_))));
    }
}
