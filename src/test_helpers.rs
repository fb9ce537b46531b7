//! Shared test utilities for the ghost2hugo test suite.
//!
//! Provides content-item builders, on-disk fixtures (image trees, export
//! files) and front-matter readers for asserting on written documents.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let images = image_tree(&["2020/01/pic.jpg"]);
//! let mut it = item("1", "Hello");
//! it.html = Some("<img src=\"/content/images/2020/01/pic.jpg\">".into());
//!
//! let fm = front_matter(&out.path().join("hello/index.md"));
//! assert_eq!(fm_str(&fm, "slug"), "hello");
//! ```

use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::types::{ContentItem, ContentType, Status};

// =========================================================================
// Content items
// =========================================================================

/// A published post with the given id and title and nothing else set.
///
/// An empty `title` is stored as `Some("")`, matching what Ghost exports
/// for untitled drafts.
pub fn item(id: &str, title: &str) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        title: Some(title.to_string()),
        slug_hint: None,
        status: Status::Published,
        kind: ContentType::Post,
        created_at: None,
        updated_at: None,
        published_at: None,
        html: None,
        excerpt: None,
        tags: Vec::new(),
        feature_image: None,
        seo_title: None,
        seo_description: None,
        seo_image: None,
        author_ref: None,
        reading_time: None,
    }
}

/// `count` space-separated words.
pub fn words(count: usize) -> String {
    vec!["word"; count].join(" ")
}

// =========================================================================
// Filesystem fixtures
// =========================================================================

/// Temp directory populated with placeholder image files.
///
/// Each file's content is `image:<basename>` so tests can tell copies of
/// different sources apart.
pub fn image_tree(paths: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for rel in paths {
        let path = tmp.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        fs::write(&path, format!("image:{name}")).unwrap();
    }
    tmp
}

/// Write `json` as `export.json` inside `dir` and return its path.
pub fn write_export(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("export.json");
    fs::write(&path, json).unwrap();
    path
}

// =========================================================================
// Front matter readers, panic with a clear message on failure
// =========================================================================

/// Parse the YAML front matter of a written document.
pub fn front_matter(path: &Path) -> Mapping {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    let rest = text
        .strip_prefix("---\n")
        .unwrap_or_else(|| panic!("{} does not start with ---", path.display()));
    let end = rest
        .find("\n---\n")
        .unwrap_or_else(|| panic!("{} has no closing ---", path.display()));
    serde_yaml::from_str(&rest[..end]).unwrap()
}

/// String value of a front matter key. Panics if absent or not a string.
pub fn fm_str<'a>(fm: &'a Mapping, key: &str) -> &'a str {
    fm.get(key).and_then(Value::as_str).unwrap_or_else(|| {
        let keys: Vec<&str> = fm.keys().filter_map(Value::as_str).collect();
        panic!("front matter key '{key}' missing or not a string. Keys: {keys:?}")
    })
}

/// Top-level keys in document order.
pub fn fm_keys(fm: &Mapping) -> Vec<&str> {
    fm.keys().filter_map(Value::as_str).collect()
}
