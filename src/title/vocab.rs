/// Canonical product categories. Order matters: the first entry that matches a token wins.
pub(crate) const ANCHORS: &[&str] = &[
    // personal care
    "toothbrush", "razor", "shaver", "trimmer", "brush", "comb", "mirror",
    // electronics
    "earbuds", "headphones", "earphones", "speaker", "charger", "cable", "adapter",
    "powerbank", "watch", "smartwatch", "phone", "tablet", "keyboard", "mouse",
    // fashion
    "shirt", "dress", "pants", "jeans", "jacket", "coat", "shoes", "sneakers",
    "boots", "sandals", "bag", "backpack", "wallet", "belt", "sunglasses",
    // home
    "lamp", "light", "fan", "pillow", "blanket", "towel", "mat", "rug",
    "bottle", "mug", "cup", "plate", "bowl", "container", "organizer",
    // beauty
    "lipstick", "mascara", "foundation", "serum", "cream", "lotion", "oil",
    // tools
    "screwdriver", "wrench", "plier", "drill", "saw", "hammer",
    // sports
    "ball", "racket", "bat", "gloves", "helmet", "bike", "scooter",
];

/// Material and style qualifiers kept when they sit just before the anchor.
pub(crate) const MODIFIERS: &[&str] = &[
    "bamboo", "wooden", "wood", "stainless", "steel", "leather", "cotton",
    "wireless", "bluetooth", "electric", "manual", "automatic",
    "mini", "portable", "foldable", "rechargeable",
    "men", "women", "kids", "baby", "adult",
];

/// B2B, marketing, location and filler words that never reach a query.
pub(crate) const JUNK: &[&str] = &[
    // trade
    "factory", "outlet", "wholesale", "oem", "odm", "custom", "customized",
    "customizable", "logo", "branding", "branded", "manufacturer", "supplier",
    "bulk", "moq", "sample", "dropship", "dropshipping",
    // marketing
    "hot", "sale", "selling", "new", "arrival", "latest", "popular", "trending",
    "best", "top", "premium", "luxury", "high", "quality", "super", "ultra",
    "professional", "pro", "advanced", "innovative", "original", "genuine",
    // descriptive
    "nice", "good", "great", "perfect", "amazing", "excellent", "beautiful",
    "stylish", "fashion", "fashionable", "elegant", "modern", "classic",
    // location and usage
    "hotel", "home", "office", "travel", "outdoor", "indoor", "kitchen",
    "bathroom", "bedroom", "living", "room",
    // eco
    "eco", "friendly", "ecofriendly", "biodegradable", "organic", "natural",
    "sustainable", "green", "environmental",
    // units and packaging
    "pcs", "pieces", "pack", "set", "lot", "pairs", "ml", "cm", "mm", "inch",
    // filler
    "with", "for", "and", "the", "a", "an", "in", "on", "of", "to", "by",
];

pub(crate) fn is_junk(word: &str) -> bool {
    JUNK.contains(&word)
}

pub(crate) fn is_modifier(word: &str) -> bool {
    MODIFIERS.contains(&word)
}

pub(crate) fn is_anchor(word: &str) -> bool {
    ANCHORS.contains(&word)
}

/// First anchor entry equal to, contained in, or containing `word`.
pub(crate) fn match_anchor(word: &str) -> Option<&'static str> {
    ANCHORS
        .iter()
        .copied()
        .find(|a| word == *a || word.contains(a) || a.contains(word))
}
