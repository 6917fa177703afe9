//! Title normalization: wholesale SEO titles into short consumer search queries.

mod vocab;

use tracing::debug;

const MAX_TERMS: usize = 4;
const FALLBACK_TERMS: usize = 3;
const MODIFIER_WINDOW: usize = 3;

/// A normalized query plus the product category it was anchored on, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchQuery {
    pub terms: String,
    pub anchor: Option<String>,
}

impl SearchQuery {
    pub fn from_title(raw_title: &str) -> Self {
        let words = tokenize(raw_title);

        let anchored = words
            .iter()
            .enumerate()
            .find_map(|(i, w)| vocab::match_anchor(w).map(|a| (i, a)));

        let picked: Vec<&str> = match anchored {
            Some((index, anchor)) => {
                let start = index.saturating_sub(MODIFIER_WINDOW);
                words[start..index]
                    .iter()
                    .map(String::as_str)
                    .filter(|w| vocab::is_modifier(w))
                    .chain(std::iter::once(anchor))
                    .collect()
            }
            None => words.iter().take(FALLBACK_TERMS).map(String::as_str).collect(),
        };

        let terms = picked
            .into_iter()
            .take(MAX_TERMS)
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ");

        debug!(raw = raw_title, %terms, "title normalized");
        Self {
            terms,
            anchor: anchored.map(|(_, a)| a.to_string()),
        }
    }
}

/// Reduces a raw wholesale title to at most four capitalized words.
pub fn normalize(raw_title: &str) -> String {
    SearchQuery::from_title(raw_title).terms
}

/// Normalized title, followed by the bare anchor when the title ends on one.
pub fn expand_queries(raw_title: &str) -> Vec<String> {
    let primary = normalize(raw_title);
    let words: Vec<String> = primary.split(' ').map(str::to_lowercase).collect();

    let bare_anchor = match words.as_slice() {
        [_, .., last] if vocab::is_anchor(last) => Some(capitalize(last)),
        _ => None,
    };

    let mut queries = vec![primary];
    queries.extend(bare_anchor);
    queries
}

fn tokenize(raw: &str) -> Vec<String> {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphabetic() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|w| w.len() > 1)
        .filter(|w| !vocab::is_junk(w))
        .map(str::to_string)
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_b2b_noise_down_to_product() {
        let title = "Factory Outlet Hotel Home 100% Biodegradable Nice Packing Bamboo Toothbrush with Custom Logo";
        assert_eq!(normalize(title), "Bamboo Toothbrush");
    }

    #[test]
    fn empty_input_yields_empty_query() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(SearchQuery::from_title(""), SearchQuery::default());
    }

    #[test]
    fn only_junk_yields_empty_query() {
        assert_eq!(normalize("Hot Sale Wholesale OEM 2024 New Arrival"), "");
    }

    #[test]
    fn never_more_than_four_terms_and_no_junk() {
        let titles = [
            "Wireless Bluetooth Mini Portable Stainless Speaker Set",
            "Wholesale Custom Logo Luxury Leather Men Wallet for Travel",
            "alpha beta gamma delta epsilon zeta",
            "2pcs (Kids) Cotton+Wooden \"Comb\" & Brush - Pro Set",
            "Professional Electric Rechargeable Cordless Hair Trimmer",
        ];
        for title in titles {
            let out = normalize(title);
            let words: Vec<&str> = out.split_whitespace().collect();
            assert!(words.len() <= 4, "{title} -> {out}");
            for w in words {
                assert!(!vocab::is_junk(&w.to_lowercase()), "{title} -> {out}");
            }
        }
    }

    #[test]
    fn keeps_modifiers_preceding_anchor_in_order() {
        assert_eq!(
            normalize("Wireless Bluetooth Noise Earbuds"),
            "Wireless Bluetooth Earbuds"
        );
    }

    #[test]
    fn modifiers_outside_window_are_dropped() {
        // "bamboo" sits four tokens before the anchor
        assert_eq!(
            normalize("Bamboo charcoal infused soft toothbrush"),
            "Toothbrush"
        );
    }

    #[test]
    fn falls_back_to_first_three_words_without_anchor() {
        assert_eq!(normalize("Quantum flux capacitor housing"), "Quantum Flux Capacitor");
    }

    #[test]
    fn digits_and_punctuation_are_removed() {
        assert_eq!(normalize("Steel-Mug (500ml) 100%!!"), "Steel Mug");
    }

    #[test]
    fn first_scanned_anchor_wins_even_on_substring() {
        // "cabbage" contains "bag"; title order beats the better later match
        let query = SearchQuery::from_title("Cabbage Shaped Ceramic Bowl");
        assert_eq!(query.anchor.as_deref(), Some("bag"));
        assert_eq!(query.terms, "Bag");
    }

    #[test]
    fn anchor_is_the_vocabulary_entry() {
        let query = SearchQuery::from_title("Portable Toothbrushes");
        assert_eq!(query.anchor.as_deref(), Some("toothbrush"));
        assert_eq!(query.terms, "Portable Toothbrush");
    }

    #[test]
    fn expand_adds_bare_anchor() {
        let queries = expand_queries("Bamboo Hair Brush");
        assert!(!queries.is_empty());
        assert!(queries[0].to_lowercase().contains("brush"));
        assert_eq!(queries.last().map(String::as_str), Some("Toothbrush"));
    }

    #[test]
    fn expand_single_word_stays_single() {
        assert_eq!(expand_queries("Factory Toothbrush"), vec!["Toothbrush"]);
    }

    #[test]
    fn expand_without_anchor_stays_single() {
        assert_eq!(expand_queries("Quantum flux capacitor"), vec!["Quantum Flux Capacitor"]);
    }

    #[test]
    fn expand_empty_title() {
        assert_eq!(expand_queries(""), vec![String::new()]);
    }
}
