use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::marketplace::absolutize;
use crate::product::{MatchResult, MatchSource};

/// Only the first few catalog hits are worth showing.
pub const MAX_ITEMS: usize = 5;

#[derive(Debug, Default, Deserialize)]
pub struct CatalogResponse {
    #[serde(default, deserialize_with = "lenient_object")]
    pub mods: Option<Mods>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mods {
    #[serde(default, deserialize_with = "lenient_items")]
    pub list_items: Vec<CatalogItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub item_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rating_score: Option<String>,
}

/// `None` unless the value is an object of the expected shape.
fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// Keeps the object entries of an array; anything else reads as no items.
fn lenient_items<'de, D>(deserializer: D) -> Result<Vec<CatalogItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(Value::Array(entries)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

/// Accepts strings, numbers, or null; the catalog is not consistent about which.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Maps a catalog response (possibly `null`) onto keyword matches.
pub fn collect_items(response: Option<CatalogResponse>) -> Vec<MatchResult> {
    let items = response
        .and_then(|r| r.mods)
        .map(|m| m.list_items)
        .unwrap_or_default();

    items
        .into_iter()
        .take(MAX_ITEMS)
        .map(|item| MatchResult {
            url: item.item_url.as_deref().map(absolutize).unwrap_or_default(),
            title: item.name.unwrap_or_default(),
            image: item.image.as_deref().map(absolutize).unwrap_or_default(),
            price: item.price.unwrap_or_default(),
            rating: item.rating_score,
            source: MatchSource::Keyword,
        })
        .collect()
}
