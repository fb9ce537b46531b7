//! Export orchestration.
//!
//! [`export_item`] takes one item all the way from HTML to a validated
//! document on disk:
//!
//! ```text
//! derive slug
//!   → HTML to Markdown (site URL substituted)
//!   → fill empty alt text with the slug, point content images at ./<file>
//!   → copy body images into <out>/<slug>/
//!   → copy feature and social images
//!   → build front matter
//!   → write <slug>.md or <slug>/index.md
//!   → validate, quarantine on failure
//! ```
//!
//! [`run`] does that for every item in an export, routing posts and pages to
//! their own directories and tallying the outcome. Items are processed one
//! at a time in export order; the run stops early only when the export
//! itself cannot be read or the output directories cannot be created.

use crate::assets::{AssetError, AssetLocalizer, ImageIndex};
use crate::bundle::{self, OutputArtifact, WriteError};
use crate::config::MigrateConfig;
use crate::images::{ensure_alts, rewrite_paths};
use crate::markup::to_markdown;
use crate::metadata::{self, BuildOptions};
use crate::naming::derive_slug;
use crate::source::{self, SourceError};
use crate::types::{AuthorRecord, ContentItem, ContentType, ItemError};
use crate::validate::{quarantine, validate};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Write error: {0}")]
    Write(#[from] WriteError),
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
}

/// Final tally of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub valid: usize,
    pub invalid: usize,
    pub skipped: usize,
}

impl ExportSummary {
    pub fn total(&self) -> usize {
        self.valid + self.invalid + self.skipped
    }
}

/// What happened to one exported item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Exported(OutputArtifact),
    /// Failed validation and was moved to this path.
    Quarantined(PathBuf),
}

/// Why an item was not exported at all.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Status(String),
    UnknownType(String),
    Rejected(ItemError),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Status(status) => write!(f, "status `{status}` is not exported"),
            SkipReason::UnknownType(kind) => write!(f, "unknown type `{kind}`"),
            SkipReason::Rejected(err) => write!(f, "{err}"),
        }
    }
}

/// Progress notifications emitted by [`run`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExportEvent {
    Loaded {
        items: usize,
        rejected: usize,
        images: usize,
    },
    Exported {
        slug: String,
        artifact: OutputArtifact,
    },
    Quarantined {
        slug: String,
        target: PathBuf,
    },
    Skipped {
        item: String,
        reason: SkipReason,
    },
    Failed {
        slug: String,
        error: String,
    },
}

/// Inputs shared by every item of a run.
pub struct ExportContext<'a> {
    pub index: &'a ImageIndex,
    pub invalid_dir: &'a Path,
    pub site_url: &'a str,
    pub placeholder: &'a str,
    pub options: &'a BuildOptions,
}

/// Export one item into `out_dir`.
///
/// When the item fails part way, whatever was already placed in its bundle
/// directory is moved to the invalid directory so the output tree only holds
/// complete documents.
pub fn export_item(
    ctx: &ExportContext<'_>,
    out_dir: &Path,
    item: &ContentItem,
    author: Option<&AuthorRecord>,
) -> Result<ItemOutcome, ExportError> {
    let slug = derive_slug(item);
    match write_item(ctx, out_dir, item, author, &slug) {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            set_aside_partial_bundle(&out_dir.join(&slug), ctx.invalid_dir, &slug);
            Err(err)
        }
    }
}

fn write_item(
    ctx: &ExportContext<'_>,
    out_dir: &Path,
    item: &ContentItem,
    author: Option<&AuthorRecord>,
    slug: &str,
) -> Result<ItemOutcome, ExportError> {
    let html = item.html.as_deref().unwrap_or_default();
    let body = to_markdown(html, ctx.site_url, ctx.placeholder);
    let body = rewrite_paths(&ensure_alts(&body, slug));

    let mut localizer = AssetLocalizer::new(ctx.index, out_dir.join(slug));
    let body = rewrite_paths(&localizer.localize(&body)?);
    for reference in [item.feature_image.as_deref(), item.seo_image.as_deref()]
        .into_iter()
        .flatten()
    {
        localizer.localize_file(reference)?;
    }
    if localizer.any_found() {
        debug!(slug, images = ?localizer.copied(), "localized images");
    }

    let meta = metadata::build(item, author, slug, &body, localizer.copied(), ctx.options);
    let artifact = bundle::write(out_dir, slug, &meta, &body, localizer.any_found())?;

    if validate(artifact.document()) {
        Ok(ItemOutcome::Exported(artifact))
    } else {
        let target = quarantine(&artifact, ctx.invalid_dir, slug)?;
        Ok(ItemOutcome::Quarantined(target))
    }
}

fn set_aside_partial_bundle(dir: &Path, invalid_dir: &Path, slug: &str) {
    if !dir.is_dir() {
        return;
    }
    let empty = fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_none());
    if empty {
        if let Err(err) = fs::remove_dir(dir) {
            warn!(slug, error = %err, "could not remove empty bundle directory");
        }
        return;
    }
    let partial = OutputArtifact::Bundle {
        index: dir.join("index.md"),
        dir: dir.to_path_buf(),
    };
    match quarantine(&partial, invalid_dir, slug) {
        Ok(target) => warn!(slug, target = %target.display(), "moved partial bundle aside"),
        Err(err) => {
            warn!(slug, error = %err, "could not quarantine partial bundle; removing it");
            if let Err(err) = fs::remove_dir_all(dir) {
                error!(slug, error = %err, "could not remove partial bundle");
            }
        }
    }
}

/// Convert a whole export.
///
/// `on_event` receives one event per item plus a [`ExportEvent::Loaded`]
/// event up front.
pub fn run(
    input: &Path,
    images: &Path,
    config: &MigrateConfig,
    mut on_event: impl FnMut(ExportEvent),
) -> Result<ExportSummary, ExportError> {
    let export = source::load(input)?;

    let posts_dir = Path::new(&config.output.posts);
    let pages_dir = Path::new(&config.output.pages);
    let invalid_dir = Path::new(&config.output.invalid);
    for dir in [posts_dir, pages_dir, invalid_dir] {
        fs::create_dir_all(dir)?;
    }

    let index = ImageIndex::build(images);
    let options = config.build_options();
    let ctx = ExportContext {
        index: &index,
        invalid_dir,
        site_url: &config.site_url,
        placeholder: &config.content.url_placeholder,
        options: &options,
    };

    on_event(ExportEvent::Loaded {
        items: export.items.len(),
        rejected: export.rejected.len(),
        images: index.len(),
    });

    let mut summary = ExportSummary::default();

    for rejected in &export.rejected {
        warn!(position = rejected.position, error = %rejected.error, "skipping record");
        summary.skipped += 1;
        on_event(ExportEvent::Skipped {
            item: format!("posts[{}]", rejected.position),
            reason: SkipReason::Rejected(rejected.error.clone()),
        });
    }

    let mut seen: HashMap<PathBuf, String> = HashMap::new();

    for item in &export.items {
        if !item.status.is_exportable() {
            debug!(item = item.id.as_str(), status = item.status.as_str(), "skipping item");
            summary.skipped += 1;
            on_event(ExportEvent::Skipped {
                item: item.id.clone(),
                reason: SkipReason::Status(item.status.as_str().to_string()),
            });
            continue;
        }
        let out_dir = match &item.kind {
            ContentType::Post => posts_dir,
            ContentType::Page => pages_dir,
            ContentType::Other(kind) => {
                warn!(
                    item = item.id.as_str(),
                    kind = kind.as_str(),
                    "skipping item of unknown type"
                );
                summary.skipped += 1;
                on_event(ExportEvent::Skipped {
                    item: item.id.clone(),
                    reason: SkipReason::UnknownType(kind.clone()),
                });
                continue;
            }
        };

        let slug = derive_slug(item);
        if let Some(previous) = seen.insert(out_dir.join(&slug), item.id.clone()) {
            warn!(
                slug = slug.as_str(),
                previous = previous.as_str(),
                item = item.id.as_str(),
                "slug collision; the later item overwrites the earlier one"
            );
        }

        match export_item(&ctx, out_dir, item, export.author(item)) {
            Ok(ItemOutcome::Exported(artifact)) => {
                summary.valid += 1;
                on_event(ExportEvent::Exported { slug, artifact });
            }
            Ok(ItemOutcome::Quarantined(target)) => {
                summary.invalid += 1;
                on_event(ExportEvent::Quarantined { slug, target });
            }
            Err(err) => {
                error!(slug = slug.as_str(), error = %err, "export failed");
                summary.invalid += 1;
                on_event(ExportEvent::Failed {
                    slug,
                    error: err.to_string(),
                });
            }
        }
    }

    Ok(summary)
}
