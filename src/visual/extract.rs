//! Extraction of marketplace listings from a rendered image-search results page.
//!
//! Runs synchronously against a [`Document`] and never fails: errors are written to the
//! debug trace and whatever was collected so far is returned.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::document::{Document, DomError, DomNode};
use crate::marketplace::{self, BRAND};
use crate::product::{MatchResult, MatchSource};

/// Below this much visible text the results page is still loading.
pub const READY_TEXT_LEN: usize = 500;
const CONTAINER_DEPTH: usize = 5;
const FALLBACK_TITLE: &str = "Daraz Product";
const CARD_SELECTOR: &str = "[data-item-id], [jsname], [data-hveid]";

static PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(BDT|৳)\s*[0-9,]+").expect("valid price pattern"));
static BARE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{2,6}").expect("valid number pattern"));
static RATING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]\.?[0-9]?)\s*[★⭐]").expect("valid rating pattern"));

/// Outcome of one extraction pass.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub page_ready: bool,
    pub link_count: usize,
    pub matches: Vec<MatchResult>,
    pub debug_trace: Vec<String>,
}

/// Insertion-ordered match list, unique by url.
#[derive(Debug, Default)]
pub struct MatchSet {
    seen: HashSet<String>,
    items: Vec<MatchResult>,
}

impl MatchSet {
    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Returns false when a match with the same url is already present.
    pub fn push(&mut self, item: MatchResult) -> bool {
        if !self.seen.insert(item.url.clone()) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<MatchResult> {
        self.items
    }
}

pub fn extract_matches<D: Document>(doc: &D) -> Extraction {
    let mut out = Extraction::default();

    let text_len = doc.body_text().chars().count();
    if text_len < READY_TEXT_LEN {
        out.debug_trace.push("Page not ready yet".to_string());
        return out;
    }
    out.page_ready = true;

    let mut found = MatchSet::default();
    if let Err(e) = run_strategies(doc, &mut found, &mut out) {
        out.debug_trace.push(format!("Error: {e}"));
    }
    out.matches = found.into_vec();
    out
}

fn run_strategies<D: Document>(
    doc: &D,
    found: &mut MatchSet,
    out: &mut Extraction,
) -> Result<(), DomError> {
    scan_anchors(doc, found, out)?;
    if found.is_empty() {
        scan_brand_mentions(doc, found, out)?;
    }
    scan_cards(doc, found, out)?;
    out.debug_trace.push(format!("Total matches: {}", found.len()));
    Ok(())
}

fn scan_anchors<D: Document>(
    doc: &D,
    found: &mut MatchSet,
    out: &mut Extraction,
) -> Result<(), DomError> {
    let anchors = doc.query_all("a")?;
    out.link_count = anchors.len();
    out.debug_trace.push(format!("Found {} total links", anchors.len()));

    for anchor in anchors {
        let Some(url) = anchor
            .attr("href")
            .and_then(|h| doc.resolve_url(&h))
            .and_then(|h| marketplace::marketplace_target(&h))
        else {
            continue;
        };
        if found.contains(&url) {
            continue;
        }

        let container = image_container(doc, &anchor)?;
        let text = container.inner_text();
        let image = best_image(doc, &container)?;
        let title = listing_title(&text);
        let price = listing_price(&text);

        out.debug_trace.push(format!(
            "Found: {}, img: {}, price: {price}",
            title.chars().take(30).collect::<String>(),
            if image.is_empty() { "NO" } else { "YES" },
        ));
        found.push(MatchResult {
            url,
            title,
            image,
            price,
            rating: listing_rating(&text),
            source: MatchSource::Visual,
        });
    }
    Ok(())
}

fn scan_brand_mentions<D: Document>(
    doc: &D,
    found: &mut MatchSet,
    out: &mut Extraction,
) -> Result<(), DomError> {
    let mentions: Vec<_> = doc
        .query_all("body *")?
        .into_iter()
        .filter(|el| {
            let own = el.own_text();
            own.contains(BRAND) || own.contains(marketplace::DOMAINS[0])
        })
        .collect();
    out.debug_trace
        .push(format!("Found {} Daraz text mentions", mentions.len()));

    let surface_host = doc.host();
    for node in mentions {
        let Some(link) = closest(&node, |n| n.tag_name() == "a" && n.attr("href").is_some())
        else {
            continue;
        };
        let Some(url) = link.attr("href").and_then(|h| doc.resolve_url(&h)) else {
            continue;
        };
        let off_platform = url::Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
            .is_some_and(|h| Some(&h) != surface_host.as_ref());
        if !off_platform || found.contains(&url) {
            continue;
        }

        let container = closest(&link, |n| {
            n.attr("data-attrid").is_some() || n.attr("data-ved").is_some() || n.tag_name() == "div"
        })
        .or_else(|| link.parent())
        .unwrap_or_else(|| link.clone());

        let text = container.inner_text();
        let title = text
            .lines()
            .next()
            .filter(|l| !l.is_empty())
            .unwrap_or(FALLBACK_TITLE)
            .to_string();
        found.push(minimal_match(url, title, first_image(doc, &container)?));
    }
    Ok(())
}

fn scan_cards<D: Document>(
    doc: &D,
    found: &mut MatchSet,
    out: &mut Extraction,
) -> Result<(), DomError> {
    let cards = doc.query_all(CARD_SELECTOR)?;
    out.debug_trace
        .push(format!("Found {} product cards", cards.len()));

    let brand_lower = BRAND.to_lowercase();
    for card in cards {
        let text = card.inner_text();
        let mentions_brand = text.to_lowercase().contains(&brand_lower)
            || card.inner_html().contains(marketplace::DOMAINS[0]);
        if !mentions_brand {
            continue;
        }

        let Some(url) = card_link(doc, &card)? else {
            continue;
        };
        if found.contains(&url) {
            continue;
        }

        let title = text
            .lines()
            .find(|l| l.chars().count() > 5)
            .unwrap_or(FALLBACK_TITLE)
            .to_string();
        found.push(minimal_match(url, title, first_image(doc, &card)?));
    }
    Ok(())
}

/// Marketplace link inside the card, or on one of its ancestors.
///
/// Looser than the anchor scan: any link mentioning the brand counts, which catches
/// tracking redirects that hide the marketplace URL.
fn card_link<D: Document, N: DomNode>(doc: &D, card: &N) -> Result<Option<String>, DomError> {
    let brand = BRAND.to_lowercase();
    let target = |n: &N| {
        let href = doc.resolve_url(&n.attr("href")?)?;
        marketplace::marketplace_target(&href)
            .or_else(|| href.to_lowercase().contains(&brand).then_some(href))
    };

    if let Some(url) = card.query_all("a[href]")?.iter().find_map(target) {
        return Ok(Some(url));
    }
    let mut current = Some(card.clone());
    while let Some(node) = current {
        if node.tag_name() == "a"
            && let Some(url) = target(&node)
        {
            return Ok(Some(url));
        }
        current = node.parent();
    }
    Ok(None)
}

fn minimal_match(url: String, title: String, image: String) -> MatchResult {
    MatchResult {
        url,
        title,
        image,
        price: String::new(),
        rating: None,
        source: MatchSource::Visual,
    }
}

/// Nearest node (itself included) satisfying `pred`.
fn closest<N: DomNode>(node: &N, pred: impl Fn(&N) -> bool) -> Option<N> {
    let mut current = Some(node.clone());
    while let Some(n) = current {
        if pred(&n) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

/// Nearest ancestor within reach that holds an image with an absolute source.
fn image_container<D: Document, N: DomNode>(doc: &D, anchor: &N) -> Result<N, DomError> {
    let mut current = anchor.clone();
    for _ in 0..CONTAINER_DEPTH {
        let Some(parent) = current.parent() else {
            break;
        };
        if !best_image(doc, &parent)?.is_empty() {
            return Ok(parent);
        }
        current = parent;
    }
    Ok(anchor.clone())
}

fn best_image<D: Document, N: DomNode>(doc: &D, container: &N) -> Result<String, DomError> {
    for img in container.query_all("img")? {
        let src = img
            .attr("src")
            .filter(|s| !s.is_empty())
            .or_else(|| img.attr("data-src"))
            .and_then(|s| absolute_image(doc, &s));
        if let Some(src) = src.filter(|s| s.len() > 20) {
            return Ok(src);
        }

        let candidate = img
            .attr("srcset")
            .and_then(|set| {
                set.split(',')
                    .next()
                    .and_then(|c| c.split_whitespace().next())
                    .map(str::to_string)
            })
            .and_then(|c| absolute_image(doc, &c));
        if let Some(candidate) = candidate {
            return Ok(candidate);
        }
    }
    Ok(String::new())
}

fn first_image<D: Document, N: DomNode>(doc: &D, container: &N) -> Result<String, DomError> {
    Ok(container
        .query_all("img")?
        .first()
        .and_then(|img| img.attr("src"))
        .and_then(|s| doc.resolve_url(&s))
        .unwrap_or_default())
}

fn absolute_image<D: Document>(doc: &D, raw: &str) -> Option<String> {
    if raw.starts_with("data:") {
        return None;
    }
    doc.resolve_url(raw)
        .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
}

fn listing_title(text: &str) -> String {
    let brand = BRAND.to_lowercase();
    text.lines()
        .map(str::trim)
        .filter(|l| l.chars().count() > 5)
        .filter(|l| !marketplace::starts_with_currency(l))
        .find(|l| !l.to_lowercase().contains(&brand))
        .unwrap_or(FALLBACK_TITLE)
        .to_string()
}

fn listing_price(text: &str) -> String {
    if let Some(m) = PRICE.find(text) {
        return m.as_str().to_string();
    }
    BARE_NUMBER
        .find(text)
        .map(|m| format!("BDT {}", m.as_str()))
        .unwrap_or_default()
}

fn listing_rating(text: &str) -> Option<String> {
    RATING
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::document::HtmlDocument;

    const BASE: &str = "https://lens.google.com/search?p=abc";

    fn page(body: &str) -> HtmlDocument {
        let filler = format!("<p>{}</p>", "Visual matches and related results. ".repeat(20));
        HtmlDocument::parse(
            &format!("<html><body>{filler}{body}</body></html>"),
            Some(BASE),
        )
    }

    fn product_card(href: &str, title: &str) -> String {
        format!(
            r#"<div class="card">
                 <div><img src="https://encrypted-tbn0.gstatic.com/images?q=tbn:abc"></div>
                 <div><span>Daraz.com.bd</span></div>
                 <div><a href="{href}"><span>{title}</span></a></div>
                 <div><span>৳ 1,250</span><span>4.5 ★</span></div>
               </div>"#
        )
    }

    #[test]
    fn short_page_is_not_ready() {
        let doc = HtmlDocument::parse("<html><body><p>Loading</p></body></html>", Some(BASE));
        let result = extract_matches(&doc);

        assert!(!result.page_ready);
        assert!(result.matches.is_empty());
        assert_eq!(result.debug_trace, vec!["Page not ready yet"]);
    }

    #[test]
    fn anchors_to_marketplace_become_matches() {
        let doc = page(&format!(
            "{}{}<a href=\"https://example.com/x\">Other shop</a>",
            product_card("https://www.daraz.com.bd/products/mug-i1.html", "Stainless Steel Mug 350ml"),
            product_card("https://www.daraz.com.bd/products/cup-i2.html", "Double Wall Coffee Cup"),
        ));
        let result = extract_matches(&doc);

        assert!(result.page_ready);
        assert_eq!(result.link_count, 3);
        assert_eq!(result.matches.len(), 2);

        let first = &result.matches[0];
        assert_eq!(first.url, "https://www.daraz.com.bd/products/mug-i1.html");
        assert_eq!(first.title, "Stainless Steel Mug 350ml");
        assert_eq!(first.image, "https://encrypted-tbn0.gstatic.com/images?q=tbn:abc");
        assert_eq!(first.price, "৳ 1,250");
        assert_eq!(first.rating.as_deref(), Some("4.5"));
        assert_eq!(first.source, MatchSource::Visual);
    }

    #[test]
    fn duplicate_links_are_collected_once() {
        let card = product_card("https://www.daraz.com.bd/products/mug-i1.html", "Steel Mug Large");
        let doc = page(&format!("{card}{card}<div data-hveid=\"1\">{card}</div>"));
        let result = extract_matches(&doc);

        assert_eq!(result.link_count, 3);
        assert_eq!(result.matches.len(), 1);
    }

    #[test]
    fn redirect_links_are_unwrapped() {
        let doc = page(&product_card(
            "/url?q=https://www.daraz.com.bd/products/lamp-i7.html&sa=U",
            "Foldable Desk Lamp",
        ));
        let result = extract_matches(&doc);

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].url, "https://www.daraz.com.bd/products/lamp-i7.html");
    }

    #[test]
    fn falls_back_to_bare_number_price_and_srcset_image() {
        let doc = page(
            r#"<div><img src="data:image/gif;base64,R0lGOD" srcset="https://img.example/a-200.jpg 200w, https://img.example/a-400.jpg 400w">
               <a href="https://www.daraz.com.bd/products/fan-i3.html">Mini Handheld Fan</a><span>Only 799 left</span></div>"#,
        );
        let result = extract_matches(&doc);

        assert_eq!(result.matches[0].image, "https://img.example/a-200.jpg");
        assert_eq!(result.matches[0].price, "BDT 799");
        assert_eq!(result.matches[0].rating, None);
    }

    #[test]
    fn title_skips_brand_and_currency_lines() {
        let text = "Daraz.com.bd\nBDT 500\nshort\nDaraz Mall official\nCotton Bath Towel Set";
        assert_eq!(listing_title(text), "Cotton Bath Towel Set");
        assert_eq!(listing_title("tiny\nBDT 99"), FALLBACK_TITLE);
    }

    #[test]
    fn brand_mentions_used_when_no_direct_links() {
        let doc = page(
            r#"<div data-ved="1"><a href="https://www.daraz.com.bd.example/item/5">
                 <span>Leather Wallet Slim</span><span>Daraz</span></a>
                 <img src="https://img.example/w.jpg"></div>"#,
        );
        let result = extract_matches(&doc);

        assert_eq!(result.matches.len(), 1);
        let m = &result.matches[0];
        assert_eq!(m.url, "https://www.daraz.com.bd.example/item/5");
        assert_eq!(m.title, "Leather Wallet Slim");
        assert_eq!(m.image, "https://img.example/w.jpg");
        assert!(m.price.is_empty());
    }

    #[test]
    fn brand_mentions_ignore_links_back_to_search_surface() {
        let doc = page(r#"<div><a href="/search?q=more"><span>More from Daraz</span></a></div>"#);
        let result = extract_matches(&doc);
        assert!(result.matches.is_empty());
    }

    #[test]
    fn cards_find_tracking_links_the_anchor_scan_misses() {
        let doc = page(
            r#"<a href="https://track.example.net/out?to=www.daraz.com.bd%2Fproducts%2Fbag-i9">
                 <div jsname="r1"><span>Canvas Tote Bag Large</span><span>daraz</span></div></a>"#,
        );
        let result = extract_matches(&doc);

        assert_eq!(result.matches.len(), 1, "{:?}", result.debug_trace);
        assert!(result.matches[0].url.starts_with("https://track.example.net/out"));
        assert_eq!(result.matches[0].title, "Canvas Tote Bag Large");
        assert!(result.debug_trace.iter().any(|l| l == "Found 1 product cards"));
    }

    #[test]
    fn brand_mentions_skipped_once_anchors_match() {
        let doc = page(&format!(
            r#"{}<div><a href="https://shop.example/item/3"><span>Sold on Daraz</span></a></div>"#,
            product_card("https://www.daraz.com.bd/products/mug-i1.html", "Stainless Steel Mug 350ml"),
        ));
        let result = extract_matches(&doc);

        let urls: Vec<_> = result.matches.iter().map(|m| m.url.as_str()).collect();
        assert_eq!(urls, vec!["https://www.daraz.com.bd/products/mug-i1.html"]);
        assert!(!result.debug_trace.iter().any(|l| l.contains("text mentions")));
    }

    #[test]
    fn card_matches_add_to_anchor_matches() {
        let doc = page(&format!(
            r#"{}<a href="https://track.example.net/out?to=www.daraz.com.bd%2Fproducts%2Fbag-i9">
                 <div jsname="r1"><span>Canvas Tote Bag Large</span><span>daraz</span></div></a>"#,
            product_card("https://www.daraz.com.bd/products/mug-i1.html", "Stainless Steel Mug 350ml"),
        ));
        let result = extract_matches(&doc);

        assert_eq!(result.matches.len(), 2, "{:?}", result.debug_trace);
        assert_eq!(result.matches[0].url, "https://www.daraz.com.bd/products/mug-i1.html");
        assert_eq!(result.matches[0].price, "৳ 1,250");
        assert!(result.matches[1].url.starts_with("https://track.example.net/out"));
        assert_eq!(result.matches[1].title, "Canvas Tote Bag Large");
        assert_eq!(result.debug_trace.last().map(String::as_str), Some("Total matches: 2"));
    }

    #[test]
    fn price_and_rating_read_ascii_digits_only() {
        assert_eq!(listing_price("৳ ১,২৫০"), "");
        assert_eq!(listing_price("দাম ১২৫০ টাকা"), "");
        assert_eq!(listing_price("৳ ১২ or BDT 450"), "BDT 450");
        assert_eq!(listing_rating("৪.৫ ★"), None);
        assert_eq!(listing_rating("4.5 ★"), Some("4.5".to_string()));
    }

    #[test]
    fn cards_without_brand_are_ignored() {
        let doc = page(r#"<div data-item-id="9"><a href="https://shop.example/p">Plain Card Item</a></div>"#);
        assert!(extract_matches(&doc).matches.is_empty());
    }

    #[test]
    fn match_set_rejects_duplicates() {
        let mut set = MatchSet::default();
        let item = minimal_match("https://d.com/1".into(), "A".into(), String::new());
        assert!(set.push(item.clone()));
        assert!(!set.push(item));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn extraction_serializes_camel_case() {
        let json = serde_json::to_value(Extraction::default()).unwrap();
        assert!(json.get("pageReady").is_some());
        assert!(json.get("debugTrace").is_some());
    }
}
