//! Writing documents to disk.
//!
//! An item becomes one of two layouts, decided only by whether any image was
//! localized for it:
//!
//! ```text
//! content/posts/
//! ├── plain-post.md            # SingleFile: no images
//! └── cafe-notes/              # Bundle: Hugo leaf page bundle
//!     ├── index.md
//!     └── pic.jpg
//! ```
//!
//! Runs are full rebuilds. Writing one layout removes a stale copy of the
//! other layout for the same slug, so a post that lost its images between two
//! exports does not leave an old bundle behind.

use crate::metadata::MetadataBlock;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Where an item's document ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputArtifact {
    /// `<out>/<slug>.md`
    SingleFile(PathBuf),
    /// `<out>/<slug>/index.md` plus copied images.
    Bundle { dir: PathBuf, index: PathBuf },
}

impl OutputArtifact {
    /// Path of the Markdown document itself.
    pub fn document(&self) -> &Path {
        match self {
            OutputArtifact::SingleFile(path) => path,
            OutputArtifact::Bundle { index, .. } => index,
        }
    }

    /// The file or directory that represents this artifact as a whole.
    pub fn root(&self) -> &Path {
        match self {
            OutputArtifact::SingleFile(path) => path,
            OutputArtifact::Bundle { dir, .. } => dir,
        }
    }

    pub fn is_bundle(&self) -> bool {
        matches!(self, OutputArtifact::Bundle { .. })
    }
}

/// Serialize front matter and body into a complete document.
///
/// The result always ends in exactly one newline.
pub fn render_document(metadata: &MetadataBlock, body: &str) -> Result<String, WriteError> {
    let yaml = metadata.to_yaml()?;
    let document = format!("---\n{}\n---\n\n{}", yaml.trim_end(), body.trim());
    Ok(format!("{}\n", document.trim_end()))
}

/// Write one item under `out_dir`.
pub fn write(
    out_dir: &Path,
    slug: &str,
    metadata: &MetadataBlock,
    body: &str,
    has_images: bool,
) -> Result<OutputArtifact, WriteError> {
    let document = render_document(metadata, body)?;
    let bundle_dir = out_dir.join(slug);
    let single_file = out_dir.join(format!("{slug}.md"));

    let artifact = if has_images {
        if single_file.is_file() {
            fs::remove_file(&single_file)?;
        }
        fs::create_dir_all(&bundle_dir)?;
        OutputArtifact::Bundle {
            index: bundle_dir.join("index.md"),
            dir: bundle_dir,
        }
    } else {
        if bundle_dir.is_dir() {
            fs::remove_dir_all(&bundle_dir)?;
        }
        fs::create_dir_all(out_dir)?;
        OutputArtifact::SingleFile(single_file)
    };

    fs::write(artifact.document(), document)?;
    Ok(artifact)
}
