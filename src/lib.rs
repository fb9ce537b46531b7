//! # ghost2hugo
//!
//! Migrates a Ghost CMS JSON export into a Hugo content tree: one Markdown
//! document per post or page, YAML front matter on top, and every image the
//! item references copied next to it as a page bundle.
//!
//! # Architecture: One Pass Per Item
//!
//! The export is read and validated once. After that each item flows through
//! the same fixed sequence, independently of every other item:
//!
//! ```text
//! export.json ─▶ source ─▶ ContentItem
//!                             │
//!         naming ◀────────────┤  slug
//!         markup ◀────────────┤  HTML → Markdown
//!         images ◀────────────┤  alt text, ./<file> paths
//!         assets ◀────────────┤  copy images into <slug>/
//!       metadata ◀────────────┤  front matter
//!         bundle ◀────────────┤  <slug>.md or <slug>/index.md
//!       validate ◀────────────┘  read back, quarantine on failure
//! ```
//!
//! A failure inside one item costs that item only. The run aborts only when
//! the export cannot be read or has an unknown layout.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`source`] | Reads the export, detects its layout, resolves tag and author relations |
//! | [`types`] | Raw export records and the validated `ContentItem` |
//! | [`normalize`] | Pure string transforms: diacritics, pictographs, dashes, hex artifacts |
//! | [`naming`] | Slug derivation: title, then stored slug, then id |
//! | [`markup`] | HTML to Markdown without line wrapping |
//! | [`images`] | Finding and rewriting Markdown image references |
//! | [`assets`] | Image tree index and per-item image copying |
//! | [`metadata`] | Front matter assembly and its fallback chains |
//! | [`bundle`] | Document rendering and single-file vs bundle layout |
//! | [`validate`] | Front matter validation and quarantine |
//! | [`pipeline`] | Per-item export and the whole-run driver |
//! | [`config`] | `ghost2hugo.toml` loading, merging, and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Title-First Slugs
//!
//! Ghost's stored slugs are unreliable in old exports: some carry the UTF-8
//! bytes of a stripped emoji as a hex prefix (`f0-9f-93-9a-my-post`). Titles
//! are what the author actually typed, so the slug is derived from the title
//! and the stored slug is only a fallback, cleaned of those hex chains.
//!
//! ## Parsed HTML, Escaped Markdown
//!
//! Post bodies are parsed with html5ever, so markup from old editors with
//! unclosed or misnested tags comes out as a browser would show it. The
//! Markdown renderer never wraps lines, which keeps image and link
//! constructs on one line where the image rewriter can find them, and it
//! escapes text that Hugo would otherwise read as Markdown syntax.
//!
//! ## Validate After Writing
//!
//! Documents are checked by reading the file back, not by inspecting the
//! in-memory front matter. What is validated is exactly what Hugo will read.
//! Documents that fail are moved to a separate directory rather than
//! deleted, so nothing from the export is silently lost.
//!
//! ## Full Rebuilds
//!
//! Every run overwrites. Writing a single file removes a bundle left by a
//! previous run for the same slug, and vice versa. Two items that derive the
//! same slug in one run are logged; the later one wins.

pub mod assets;
pub mod bundle;
pub mod config;
pub mod images;
pub mod markup;
pub mod metadata;
pub mod naming;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod source;
pub mod types;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;
