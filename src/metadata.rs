//! Front matter synthesis.
//!
//! Every exported document starts with a YAML block assembled here from the
//! raw item, its author, and values derived from the converted body. Keys are
//! emitted in a fixed order so diffs between runs stay readable:
//!
//! ```text
//! title, date, lastmod, slug, draft, type, author, author_bio?, author_image?,
//! description, featured_image?, cover?, reading_time, seo?, tags?, categories?
//! ```
//!
//! ## Fallback chains
//!
//! Most fields have more than one possible source. Each is resolved
//! independently and the first non-empty value wins:
//!
//! - **date**: published_at → created_at → omitted
//! - **lastmod**: updated_at → date → omitted
//! - **description**: custom excerpt as written → first body paragraph,
//!   truncated → `""`
//! - **reading_time**: Ghost's own estimate → word count / words-per-minute
//! - **seo.image**: og_image → feature image → first body image that was
//!   copied into the bundle
//! - **author**: author record name → configured placeholder
//!
//! ## Dates
//!
//! Ghost has written timestamps as RFC 3339 strings, as naive
//! `YYYY-MM-DD HH:MM:SS` strings (taken as UTC), and as epoch milliseconds.
//! All are normalized to RFC 3339 with an explicit offset. A timestamp that
//! parses as none of these drops the field with a warning rather than
//! failing the item.

use crate::images::{decoded_basename, image_refs, url_basename};
use crate::types::{AuthorRecord, ContentItem, RawTimestamp, Status};
use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, Utc};
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tracing::warn;

/// Resolve a metadata field from multiple sources.
///
/// Takes a list of optional values in priority order and returns the first
/// non-None, non-empty value, trimmed.
///
/// ```text
/// title:       resolve(&[title])
/// author:      resolve(&[author_name])
/// ```
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}

/// Insertion-ordered front matter mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetadataBlock(Mapping);

impl MetadataBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(Value::from(key), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Top-level keys in emission order.
    pub fn keys(&self) -> Vec<&str> {
        self.0.keys().filter_map(Value::as_str).collect()
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.0)
    }
}

/// Knobs for [`build`] that come from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// Forces `draft` for every item when set.
    pub draft_override: Option<bool>,
    pub default_author: String,
    pub words_per_minute: usize,
    pub description_length: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            draft_override: None,
            default_author: "Unknown".to_string(),
            words_per_minute: 200,
            description_length: 160,
        }
    }
}

/// Parse any of the timestamp shapes Ghost has exported.
pub fn parse_timestamp(raw: &RawTimestamp) -> Option<DateTime<FixedOffset>> {
    match raw {
        RawTimestamp::Millis(ms) => {
            DateTime::<Utc>::from_timestamp_millis(*ms).map(|dt| dt.fixed_offset())
        }
        RawTimestamp::Text(text) => {
            let text = text.trim();
            DateTime::parse_from_rfc3339(text).ok().or_else(|| {
                ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                    .map(|naive| naive.and_utc().fixed_offset())
            })
        }
    }
}

fn format_timestamp(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Parse and format one timestamp field, warning when it is present but
/// unreadable.
fn timestamp_field(item_id: &str, field: &str, raw: Option<&RawTimestamp>) -> Option<String> {
    let raw = raw?;
    match parse_timestamp(raw) {
        Some(dt) => Some(format_timestamp(&dt)),
        None => {
            warn!(item = item_id, field, value = ?raw, "unparsable timestamp");
            None
        }
    }
}

/// Estimated minutes to read `body`, never less than one.
pub fn reading_time(body: &str, words_per_minute: usize) -> u32 {
    let wpm = words_per_minute.max(1);
    let words = body.split_whitespace().count();
    let minutes = (words + wpm / 2) / wpm;
    u32::try_from(minutes.max(1)).unwrap_or(u32::MAX)
}

/// Plain text of the first non-blank paragraph of a Markdown body.
///
/// Image alt text is not part of the paragraph's prose and is skipped.
pub fn first_paragraph(markdown: &str) -> Option<String> {
    let mut in_paragraph = false;
    let mut image_depth = 0usize;
    let mut text = String::new();

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Paragraph) => {
                in_paragraph = true;
                text.clear();
            }
            Event::End(TagEnd::Paragraph) => {
                in_paragraph = false;
                let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if !collapsed.is_empty() {
                    return Some(collapsed);
                }
            }
            Event::Start(Tag::Image { .. }) => image_depth += 1,
            Event::End(TagEnd::Image) => image_depth = image_depth.saturating_sub(1),
            Event::Text(t) | Event::Code(t) if in_paragraph && image_depth == 0 => {
                text.push_str(&t);
            }
            Event::SoftBreak | Event::HardBreak if in_paragraph => text.push(' '),
            _ => {}
        }
    }
    None
}

/// Cut `text` to at most `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

fn local_image(reference: Option<&str>) -> Option<String> {
    reference
        .map(str::trim)
        .and_then(url_basename)
        .map(|name| format!("./{name}"))
}

/// Assemble the front matter for one item.
///
/// `body` is the converted Markdown; it feeds the description, reading time
/// and SEO image fallbacks. `localized` lists the image files copied next to
/// the document; only those qualify as the body's SEO image.
pub fn build(
    item: &ContentItem,
    author: Option<&AuthorRecord>,
    slug: &str,
    body: &str,
    localized: &[String],
    options: &BuildOptions,
) -> MetadataBlock {
    let mut meta = MetadataBlock::new();

    meta.insert("title", resolve(&[item.title.as_deref()]).unwrap_or_default());

    let date = timestamp_field(&item.id, "published_at", item.published_at.as_ref())
        .or_else(|| timestamp_field(&item.id, "created_at", item.created_at.as_ref()));
    if date.is_none() {
        warn!(item = item.id.as_str(), "no usable publication date; `date` omitted");
    }
    let lastmod =
        timestamp_field(&item.id, "updated_at", item.updated_at.as_ref()).or_else(|| date.clone());
    if let Some(date) = date {
        meta.insert("date", date);
    }
    if let Some(lastmod) = lastmod {
        meta.insert("lastmod", lastmod);
    }

    meta.insert("slug", slug);
    meta.insert(
        "draft",
        options
            .draft_override
            .unwrap_or(item.status != Status::Published),
    );
    meta.insert("type", item.kind.as_str());

    let author_name = author.and_then(|a| resolve(&[a.name.as_deref()]));
    meta.insert(
        "author",
        author_name.unwrap_or_else(|| options.default_author.clone()),
    );
    if let Some(bio) = author.and_then(|a| resolve(&[a.bio.as_deref()])) {
        meta.insert("author_bio", bio);
    }
    if let Some(image) = author.and_then(|a| resolve(&[a.profile_image.as_deref()])) {
        meta.insert("author_image", image);
    }

    let description = resolve(&[item.excerpt.as_deref()])
        .or_else(|| {
            first_paragraph(body).map(|p| truncate(&p, options.description_length))
        })
        .unwrap_or_default();
    meta.insert("description", description);

    let feature = local_image(item.feature_image.as_deref());
    if let Some(feature) = &feature {
        meta.insert("featured_image", feature.as_str());
        meta.insert("cover", feature.as_str());
    }

    let minutes = item
        .reading_time
        .filter(|&m| m > 0)
        .unwrap_or_else(|| reading_time(body, options.words_per_minute));
    meta.insert("reading_time", minutes);

    let first_bundled_image = image_refs(body).into_iter().find(|img| {
        img.url.starts_with("./")
            && decoded_basename(&img.url).is_some_and(|name| localized.contains(&name))
    });
    let seo_image = local_image(item.seo_image.as_deref())
        .or(feature)
        .or_else(|| first_bundled_image.map(|img| img.url));
    let mut seo = Mapping::new();
    if let Some(title) = resolve(&[item.seo_title.as_deref()]) {
        seo.insert("title".into(), title.into());
    }
    if let Some(description) = resolve(&[item.seo_description.as_deref()]) {
        seo.insert("description".into(), description.into());
    }
    if let Some(image) = seo_image {
        seo.insert("image".into(), image.into());
    }
    if !seo.is_empty() {
        meta.insert("seo", seo);
    }

    let tags: Vec<String> = item
        .tags
        .iter()
        .filter_map(|tag| resolve(&[Some(tag.name())]))
        .collect();
    if let Some(first) = tags.first().cloned() {
        meta.insert("tags", tags);
        meta.insert("categories", vec![first]);
    }

    meta
}
