//! Records read from a Ghost export.
//!
//! Ghost has changed its export schema several times. The raw records below
//! accept every shape seen in the wild (string or integer ids, `type` or the
//! older `page` flag, ISO strings or epoch milliseconds) and are converted
//! into the strongly-typed [`ContentItem`] once, at ingestion. Everything
//! downstream works with `ContentItem` and never looks at raw JSON again.

use serde::Deserialize;
use thiserror::Error;

/// Why a raw post record could not become a [`ContentItem`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ItemError {
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("record has no id")]
    MissingId,
    #[error("record {0} has no status")]
    MissingStatus(String),
    #[error("record {0} has neither `type` nor `page`")]
    MissingType(String),
}

/// Identifier as found in the export: modern exports use hex strings,
/// Ghost 0.x used integers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    pub fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

/// A timestamp exactly as the export stores it. Parsing happens in
/// [`crate::metadata`], where an unparsable value only costs a field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Text(String),
    Millis(i64),
}

/// Boolean column as exported: `true`/`false`, or `1`/`0` from SQLite-backed
/// Ghost installs.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawFlag {
    Bool(bool),
    Int(i64),
}

impl RawFlag {
    pub fn is_set(self) -> bool {
        match self {
            RawFlag::Bool(b) => b,
            RawFlag::Int(n) => n != 0,
        }
    }
}

/// Tag entry on a post: either a bare name or an object with a `name`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TagRef {
    Name(String),
    Object { name: String },
}

impl TagRef {
    pub fn name(&self) -> &str {
        match self {
            TagRef::Name(name) => name,
            TagRef::Object { name } => name,
        }
    }
}

/// Post record as it appears in `data.posts`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPost {
    pub id: Option<RawId>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Pre-2.0 exports mark pages with a flag instead of `type`.
    pub page: Option<RawFlag>,
    pub html: Option<String>,
    pub custom_excerpt: Option<String>,
    pub feature_image: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub og_image: Option<String>,
    pub created_at: Option<RawTimestamp>,
    pub updated_at: Option<RawTimestamp>,
    pub published_at: Option<RawTimestamp>,
    pub published_by: Option<RawId>,
    pub author_id: Option<RawId>,
    pub reading_time: Option<u32>,
    pub tags: Option<Vec<TagRef>>,
}

/// Publication status of a content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Published,
    Draft,
    /// `scheduled`, `sent`, or anything newer Ghost versions invent.
    Other(String),
}

impl Status {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "published" => Status::Published,
            "draft" => Status::Draft,
            other => Status::Other(other.to_string()),
        }
    }

    /// Only published and draft items are exported.
    pub fn is_exportable(&self) -> bool {
        matches!(self, Status::Published | Status::Draft)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Published => "published",
            Status::Draft => "draft",
            Status::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    Post,
    Page,
    Other(String),
}

impl ContentType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "post" => ContentType::Post,
            "page" => ContentType::Page,
            other => ContentType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ContentType::Post => "post",
            ContentType::Page => "page",
            ContentType::Other(s) => s,
        }
    }
}

/// One post or page, validated and ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub id: String,
    pub title: Option<String>,
    /// The slug Ghost stored. Only a fallback: the title wins.
    pub slug_hint: Option<String>,
    pub status: Status,
    pub kind: ContentType,
    pub created_at: Option<RawTimestamp>,
    pub updated_at: Option<RawTimestamp>,
    pub published_at: Option<RawTimestamp>,
    pub html: Option<String>,
    pub excerpt: Option<String>,
    pub tags: Vec<TagRef>,
    pub feature_image: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_image: Option<String>,
    pub author_ref: Option<String>,
    pub reading_time: Option<u32>,
}

impl TryFrom<RawPost> for ContentItem {
    type Error = ItemError;

    fn try_from(raw: RawPost) -> Result<Self, Self::Error> {
        let id = raw
            .id
            .map(RawId::into_string)
            .filter(|id| !id.trim().is_empty())
            .ok_or(ItemError::MissingId)?;
        let status = raw
            .status
            .as_deref()
            .map(Status::parse)
            .ok_or_else(|| ItemError::MissingStatus(id.clone()))?;
        let kind = match (raw.kind.as_deref(), raw.page.map(RawFlag::is_set)) {
            (Some(kind), _) => ContentType::parse(kind),
            (None, Some(true)) => ContentType::Page,
            (None, Some(false)) => ContentType::Post,
            (None, None) => return Err(ItemError::MissingType(id)),
        };
        let author_ref = raw
            .published_by
            .or(raw.author_id)
            .map(RawId::into_string);

        Ok(ContentItem {
            id,
            title: raw.title,
            slug_hint: raw.slug,
            status,
            kind,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            published_at: raw.published_at,
            html: raw.html,
            excerpt: raw.custom_excerpt,
            tags: raw.tags.unwrap_or_default(),
            feature_image: raw.feature_image,
            seo_title: raw.meta_title,
            seo_description: raw.meta_description,
            seo_image: raw.og_image,
            author_ref,
            reading_time: raw.reading_time,
        })
    }
}

/// Author as found in `data.users`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AuthorRecord {
    pub id: Option<RawId>,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
}
