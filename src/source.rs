//! Reading a Ghost JSON export.
//!
//! Ghost has shipped two top-level layouts:
//!
//! ```text
//! { "data": { "posts": [...], "users": [...], ... } }                 # direct
//! { "db": [ { "meta": {...}, "data": { "posts": [...], ... } } ] }    # admin download
//! ```
//!
//! Anything else is rejected outright. Inside `data`, posts are converted
//! one by one: a record that is malformed or lacks a required field is
//! reported in [`GhostExport::rejected`] and the rest of the export still
//! loads.
//!
//! Relations are resolved here, once, so downstream code only ever sees
//! complete [`ContentItem`]s:
//!
//! - **tags**: inline `tags` on the post, else `posts_tags` → `tags`
//!   ordered by `sort_order`
//! - **author**: `published_by`, else `author_id`, else the first
//!   `posts_authors` entry

use crate::types::{AuthorRecord, ContentItem, ItemError, RawId, RawPost, TagRef};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unrecognized export layout: expected `data.posts` or `db[0].data.posts`")]
    UnknownShape,
}

/// A post record that could not be turned into a [`ContentItem`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    /// Index in the export's `posts` array.
    pub position: usize,
    pub error: ItemError,
}

/// Everything the pipeline needs from one export file.
#[derive(Debug, Default)]
pub struct GhostExport {
    /// Valid items, in export order.
    pub items: Vec<ContentItem>,
    pub rejected: Vec<Rejected>,
    authors: HashMap<String, AuthorRecord>,
}

impl GhostExport {
    /// Author record for an item, if its reference resolves.
    pub fn author(&self, item: &ContentItem) -> Option<&AuthorRecord> {
        item.author_ref
            .as_deref()
            .and_then(|id| self.authors.get(id))
    }

    pub fn author_count(&self) -> usize {
        self.authors.len()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExportData {
    posts: Option<Vec<Value>>,
    users: Option<Vec<Value>>,
    tags: Option<Vec<Value>>,
    posts_tags: Option<Vec<Value>>,
    posts_authors: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TagRecord {
    id: Option<RawId>,
    name: Option<String>,
}

/// Row of `posts_tags` or `posts_authors`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Link {
    post_id: Option<RawId>,
    #[serde(alias = "author_id")]
    tag_id: Option<RawId>,
    sort_order: Option<i64>,
}

/// Deserialize each record on its own, dropping the ones that fail.
fn parse_records<T: DeserializeOwned>(records: Option<Vec<Value>>, table: &str) -> Vec<T> {
    records
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(i, value)| match T::deserialize(value) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(table, position = i, error = %err, "skipping malformed record");
                None
            }
        })
        .collect()
}

/// `post_id → [target ids]`, each list ordered by `sort_order`.
fn group_links(links: Vec<Link>) -> HashMap<String, Vec<String>> {
    let mut grouped: HashMap<String, Vec<(i64, String)>> = HashMap::new();
    for link in links {
        if let (Some(post), Some(target)) = (link.post_id, link.tag_id) {
            grouped
                .entry(post.into_string())
                .or_default()
                .push((link.sort_order.unwrap_or(0), target.into_string()));
        }
    }
    grouped
        .into_iter()
        .map(|(post, mut targets)| {
            targets.sort_by_key(|(order, _)| *order);
            (post, targets.into_iter().map(|(_, id)| id).collect())
        })
        .collect()
}

/// Pull the `data` object out of whichever layout the export uses.
fn take_data(mut root: Value) -> Option<Value> {
    let pointer = if root.pointer("/data/posts").is_some() {
        "/data"
    } else if root.pointer("/db/0/data/posts").is_some() {
        "/db/0/data"
    } else {
        return None;
    };
    root.pointer_mut(pointer).map(Value::take)
}

/// Parse export JSON text.
pub fn parse(text: &str) -> Result<GhostExport, SourceError> {
    let root: Value = serde_json::from_str(text)?;
    let data = take_data(root).ok_or(SourceError::UnknownShape)?;
    let data: ExportData = serde_json::from_value(data)?;

    let authors: HashMap<String, AuthorRecord> = parse_records::<AuthorRecord>(data.users, "users")
        .into_iter()
        .filter_map(|author| Some((author.id.clone()?.into_string(), author)))
        .collect();
    let tag_names: HashMap<String, String> = parse_records::<TagRecord>(data.tags, "tags")
        .into_iter()
        .filter_map(|tag| Some((tag.id?.into_string(), tag.name?)))
        .collect();
    let post_tags = group_links(parse_records(data.posts_tags, "posts_tags"));
    let post_authors = group_links(parse_records(data.posts_authors, "posts_authors"));

    let mut export = GhostExport {
        authors,
        ..GhostExport::default()
    };

    for (position, value) in data.posts.unwrap_or_default().into_iter().enumerate() {
        let mut raw = match RawPost::deserialize(value) {
            Ok(raw) => raw,
            Err(err) => {
                export.rejected.push(Rejected {
                    position,
                    error: ItemError::Malformed(err.to_string()),
                });
                continue;
            }
        };

        if let Some(post_id) = raw.id.clone().map(RawId::into_string) {
            if raw.tags.as_ref().is_none_or(Vec::is_empty)
                && let Some(tag_ids) = post_tags.get(&post_id)
            {
                raw.tags = Some(
                    tag_ids
                        .iter()
                        .filter_map(|id| tag_names.get(id))
                        .map(|name| TagRef::Name(name.clone()))
                        .collect(),
                );
            }
            if raw.published_by.is_none()
                && raw.author_id.is_none()
                && let Some(first) = post_authors.get(&post_id).and_then(|ids| ids.first())
            {
                raw.author_id = Some(RawId::Text(first.clone()));
            }
        }

        match ContentItem::try_from(raw) {
            Ok(item) => export.items.push(item),
            Err(error) => export.rejected.push(Rejected { position, error }),
        }
    }

    debug!(
        items = export.items.len(),
        rejected = export.rejected.len(),
        authors = export.authors.len(),
        "export loaded"
    );
    Ok(export)
}

/// Read and parse the export at `path`.
pub fn load(path: &Path) -> Result<GhostExport, SourceError> {
    let text = fs::read_to_string(path)?;
    parse(&text)
}
