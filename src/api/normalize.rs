//! Items payload normalization.
//!
//! `GET /v1/feeds/{id}/items` does not have a stable shape: depending on the
//! backend version it returns a bare list, an envelope object holding the
//! list under some key, or a single item. Field names vary too (`pub_date`,
//! `pubDate`, `PubDate`, ...). This module is the one place that knows about
//! those variations.

use serde_json::{Map, Value};

use super::article::{parse_timestamp, Article};

const ID_KEYS: &[&str] = &["_id", "id", "ID"];
const FEED_ID_KEYS: &[&str] = &["feed_id", "feedId", "FeedID"];
const TITLE_KEYS: &[&str] = &["title", "Title"];
const LINK_KEYS: &[&str] = &["link", "Link"];
const DESCRIPTION_KEYS: &[&str] = &["description", "Description"];
const PUB_DATE_KEYS: &[&str] = &["pub_date", "pubDate", "PubDate", "publishedDate"];

/// Turn any items payload into canonical articles.
///
/// * list → one article per element
/// * object with a list-valued field → the first such list, in the object's
///   own key order
/// * any other object → a single article
/// * anything else → empty
pub fn normalize(payload: &Value) -> Vec<Article> {
    match payload {
        Value::Array(elements) => elements.iter().map(article_from).collect(),
        Value::Object(fields) => match fields.values().find_map(Value::as_array) {
            Some(elements) => elements.iter().map(article_from).collect(),
            None => vec![article_from(payload)],
        },
        _ => Vec::new(),
    }
}

/// Map one element. Non-object elements produce an all-defaults article.
fn article_from(element: &Value) -> Article {
    let empty = Map::new();
    let fields = element.as_object().unwrap_or(&empty);

    let id = probe(fields, ID_KEYS)
        .unwrap_or_else(|| format!("item-{}", uuid::Uuid::new_v4()));
    let pub_date = probe(fields, PUB_DATE_KEYS).unwrap_or_default();

    Article {
        id,
        feed_id: probe(fields, FEED_ID_KEYS).unwrap_or_default(),
        title: probe(fields, TITLE_KEYS).unwrap_or_else(|| "Untitled".into()),
        link: probe(fields, LINK_KEYS).unwrap_or_else(|| "#".into()),
        description: probe(fields, DESCRIPTION_KEYS).unwrap_or_default(),
        published: parse_timestamp(&pub_date),
        pub_date,
    }
}

/// First key whose value is a non-empty string or a non-zero number.
fn probe(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match fields.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    })
}
