//! Fixed knowledge about the retail marketplace: domains, brand name, currency markers.

use url::Url;

pub const BRAND: &str = "Daraz";
pub const DOMAINS: &[&str] = &["daraz.com.bd", "daraz.com"];
pub const CURRENCY_MARKERS: &[&str] = &["BDT", "৳"];
pub const DEFAULT_BASE_URL: &str = "https://www.daraz.com.bd";

/// Returns the marketplace URL an `href` leads to, if any.
///
/// Search-engine redirect links (`/url?q=...`) are unwrapped first.
pub fn marketplace_target(href: &str) -> Option<String> {
    let parsed = Url::parse(href).ok()?;
    if is_marketplace_host(&parsed) {
        return Some(href.to_string());
    }
    parsed
        .query_pairs()
        .find(|(k, _)| k == "q" || k == "url")
        .and_then(|(_, v)| Url::parse(&v).ok())
        .filter(is_marketplace_host)
        .map(String::from)
}

fn is_marketplace_host(url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

/// Promotes protocol-relative URLs (`//host/path`) to `https:`.
pub fn absolutize(url: &str) -> String {
    match url.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

pub fn starts_with_currency(line: &str) -> bool {
    let upper = line.to_uppercase();
    CURRENCY_MARKERS.iter().any(|m| upper.starts_with(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_marketplace_hosts() {
        assert!(marketplace_target("https://www.daraz.com.bd/products/x-i1.html").is_some());
        assert!(marketplace_target("https://daraz.com/p").is_some());
        assert!(marketplace_target("https://example.com/?ref=daraz.com").is_none());
        assert!(marketplace_target("https://notdaraz.com/p").is_none());
    }

    #[test]
    fn unwraps_redirect_links() {
        let href = "https://www.google.com/url?q=https://www.daraz.com.bd/products/mug-i9.html&sa=U";
        assert_eq!(
            marketplace_target(href).as_deref(),
            Some("https://www.daraz.com.bd/products/mug-i9.html")
        );
    }

    #[test]
    fn rejects_relative_and_non_http() {
        assert!(marketplace_target("/products/x").is_none());
        assert!(marketplace_target("javascript:void(0)").is_none());
    }

    #[test]
    fn absolutize_handles_protocol_relative() {
        assert_eq!(absolutize("//d.com/p1"), "https://d.com/p1");
        assert_eq!(absolutize("img1.jpg"), "img1.jpg");
        assert_eq!(absolutize("https://d.com/p"), "https://d.com/p");
    }

    #[test]
    fn currency_prefix_detection() {
        assert!(starts_with_currency("BDT 1,200"));
        assert!(starts_with_currency("bdt 99"));
        assert!(starts_with_currency("৳ 450"));
        assert!(!starts_with_currency("Steel mug 450"));
    }
}
