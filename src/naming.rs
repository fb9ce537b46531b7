//! Slug derivation for exported content items.
//!
//! Every item becomes a file or directory named after its slug, so the slug
//! must always exist and always be URL- and filesystem-safe. Candidates are
//! tried in order and the first one that survives [`slugify`] wins:
//!
//! | Source | Pre-processing | Example |
//! |--------|----------------|---------|
//! | Title | pictographs removed, dashes normalized | `"Café ☕ Notes"` → `cafe-notes` |
//! | Ghost slug | hex chains stripped, pictographs removed | `f0-9f-93-9a-my-post` → `my-post` |
//! | Item id | none | `untitled-5e1a2b` |
//!
//! Titles go first because they are human-authored; Ghost's stored slugs are
//! frequently machine-mangled by older versions.

use crate::normalize::{
    normalize_dashes, normalize_diacritics, remove_pictographs, strip_leading_hex_chains,
};
use crate::types::ContentItem;

/// Generic slugifier: fold diacritics, lowercase, collapse every run of
/// non-`[a-z0-9]` characters into one dash, trim edge dashes.
///
/// The result is either empty or matches `[a-z0-9]+(-[a-z0-9]+)*`.
pub fn slugify(text: &str) -> String {
    let folded = normalize_diacritics(text).to_lowercase();
    let mut slug = String::with_capacity(folded.len());
    let mut pending_dash = false;
    for c in folded.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c);
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn slug_from_title(title: &str) -> String {
    slugify(&normalize_dashes(&remove_pictographs(title)))
}

fn slug_from_hint(hint: &str) -> String {
    slugify(&remove_pictographs(&strip_leading_hex_chains(hint)))
}

/// Derive the output slug for an item. Never empty.
pub fn derive_slug(item: &ContentItem) -> String {
    let from_title = item.title.as_deref().map(slug_from_title);
    let from_hint = item.slug_hint.as_deref().map(slug_from_hint);

    from_title
        .into_iter()
        .chain(from_hint)
        .find(|slug| !slug.is_empty())
        .unwrap_or_else(|| match slugify(&item.id) {
            id if id.is_empty() => "untitled-noid".to_string(),
            id => format!("untitled-{id}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::item;
    use regex::Regex;

    fn assert_slug_shape(slug: &str) {
        let shape = Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap();
        assert!(shape.is_match(slug), "bad slug shape: {slug:?}");
    }

    // =========================================================================
    // slugify() tests
    // =========================================================================

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Hello,   World!  "), "hello-world");
    }

    #[test]
    fn slugify_folds_diacritics() {
        assert_eq!(slugify("Café Notes"), "cafe-notes");
        assert_eq!(slugify("Über München"), "ueber-muenchen");
        assert_eq!(slugify("Straße"), "strasse");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("a---b__c  d"), "a-b-c-d");
        assert_eq!(slugify("--edge--"), "edge");
    }

    #[test]
    fn slugify_empty_for_symbols_only() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("日本語"), "");
    }

    // =========================================================================
    // derive_slug() tests
    // =========================================================================

    #[test]
    fn title_wins_over_stored_slug() {
        let mut it = item("1", "Café ☕ Notes");
        it.slug_hint = Some("something-else".into());
        assert_eq!(derive_slug(&it), "cafe-notes");
    }

    #[test]
    fn title_dash_variants_normalized() {
        let it = item("1", "2019–2020 — A Review");
        assert_eq!(derive_slug(&it), "2019-2020-a-review");
    }

    #[test]
    fn hint_used_when_title_empty() {
        let mut it = item("1", "");
        it.slug_hint = Some("f0-9f-93-9a-my-post".into());
        assert_eq!(derive_slug(&it), "my-post");
    }

    #[test]
    fn hint_used_when_title_is_only_emoji() {
        let mut it = item("1", "🚀🎉");
        it.slug_hint = Some("launch-party".into());
        assert_eq!(derive_slug(&it), "launch-party");
    }

    #[test]
    fn id_fallback_when_title_and_hint_empty() {
        let mut it = item("5e1a2b", "");
        it.slug_hint = Some("".into());
        assert_eq!(derive_slug(&it), "untitled-5e1a2b");
    }

    #[test]
    fn id_fallback_when_fields_absent() {
        let mut it = item("5e1a2b", "");
        it.title = None;
        it.slug_hint = None;
        assert_eq!(derive_slug(&it), "untitled-5e1a2b");
    }

    #[test]
    fn noid_fallback_when_id_unusable() {
        let mut it = item("???", "");
        it.slug_hint = None;
        assert_eq!(derive_slug(&it), "untitled-noid");
    }

    #[test]
    fn derived_slugs_always_well_formed() {
        let titles = [
            "Café ☕ Notes",
            "  --Leading and trailing--  ",
            "Ünïcödé Ærø",
            "🚀",
            "",
            "C++ & Rust: 10 tips!",
            "f0-9f-93-9a",
        ];
        for title in titles {
            let mut it = item("ABC_123", title);
            it.slug_hint = Some(title.to_string());
            let slug = derive_slug(&it);
            assert!(!slug.is_empty());
            assert_slug_shape(&slug);
        }
    }
}
