use crate::product::MatchResult;
use crate::sidebar::{DisplayProduct, Notice};

/// Escape characters that break Markdown link syntax: `[`, `]`, `(`, `)`.
pub(crate) fn escape_md_link(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '[' | ']' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Replaces newlines, which would break heading structure, with spaces.
pub(crate) fn sanitize_heading(s: &str) -> String {
    s.chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

/// Renders matches as a Markdown list under a heading.
pub(crate) fn format_matches(heading: &str, matches: &[MatchResult]) -> String {
    let mut out = format!("## {}\n\n", sanitize_heading(heading));
    if matches.is_empty() {
        out.push_str("(no matches)\n");
        return out;
    }

    for m in matches {
        let title = if m.title.is_empty() { "Daraz product" } else { &m.title };
        out.push_str(&format!(
            "- [{}]({})",
            escape_md_link(title),
            escape_md_link(&m.url)
        ));
        if !m.price.is_empty() {
            out.push_str(&format!(" | {}", m.price));
        }
        if let Some(ref rating) = m.rating {
            out.push_str(&format!(" ★ {rating}"));
        }
        out.push('\n');
    }
    out
}

/// Renders the sidebar's view: the product header, then results or the notice.
pub(crate) fn format_sidebar(
    product: Option<&DisplayProduct>,
    matches: &[MatchResult],
    notice: Option<&Notice>,
    heading: &str,
) -> String {
    let mut out = String::new();
    if let Some(p) = product {
        out.push_str(&format!("# {}\n", sanitize_heading(&p.title)));
        if p.original_title != p.title {
            out.push_str(&format!("> {}\n", sanitize_heading(&p.original_title)));
        }
        out.push('\n');
    }
    match notice {
        Some(n) => out.push_str(&format!("{n}\n")),
        None => out.push_str(&format_matches(heading, matches)),
    }
    out
}
