//! Post-write validation and quarantine.
//!
//! Every written document is read back and checked before it counts as
//! exported. A document is valid when:
//!
//! 1. its first line is `---`,
//! 2. a later line closes the front matter with `---`,
//! 3. the block between them parses as a YAML mapping,
//! 4. `title` and `slug` are present and non-empty.
//!
//! Anything else is moved out of the content tree into the invalid directory
//! so Hugo never sees it.

use crate::bundle::OutputArtifact;
use serde_yaml::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

const REQUIRED_FIELDS: [&str; 2] = ["title", "slug"];

/// Why a document failed validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("cannot read document: {0}")]
    Io(#[from] io::Error),
    #[error("document does not start with ---")]
    MissingOpening,
    #[error("front matter is not closed by ---")]
    Unclosed,
    #[error("front matter is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("front matter is not a mapping")]
    NotMapping,
    #[error("front matter field `{0}` is missing or empty")]
    MissingField(&'static str),
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == "---"
}

fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.trim().is_empty(),
        Value::Sequence(seq) => !seq.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        _ => true,
    }
}

/// Check document text.
pub fn check_document(text: &str) -> Result<(), ValidationError> {
    let mut lines = text.trim_start().lines();
    if !lines.next().is_some_and(is_delimiter) {
        return Err(ValidationError::MissingOpening);
    }

    let mut front = Vec::new();
    let mut closed = false;
    for line in lines {
        if is_delimiter(line) {
            closed = true;
            break;
        }
        front.push(line);
    }
    if !closed {
        return Err(ValidationError::Unclosed);
    }

    let front = front.join("\n");
    if front.trim().is_empty() {
        return Err(ValidationError::NotMapping);
    }
    let value: Value = serde_yaml::from_str(&front)?;
    let Value::Mapping(map) = value else {
        return Err(ValidationError::NotMapping);
    };
    for field in REQUIRED_FIELDS {
        if !map.get(field).is_some_and(is_filled) {
            return Err(ValidationError::MissingField(field));
        }
    }
    Ok(())
}

/// Check the document at `path`.
pub fn check(path: &Path) -> Result<(), ValidationError> {
    let text = fs::read_to_string(path)?;
    check_document(&text)
}

/// True when the document at `path` is valid. Failures are logged, never
/// propagated.
pub fn validate(path: &Path) -> bool {
    match check(path) {
        Ok(()) => true,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "validation failed");
            false
        }
    }
}

/// Markdown documents under `root` (or `root` itself if it is a file),
/// sorted by path.
pub fn find_documents(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "md"))
        .map(|e| e.into_path())
        .collect()
}

fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src).map_err(io::Error::other)?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn remove_any(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else if path.exists() {
        fs::remove_file(path)
    } else {
        Ok(())
    }
}

/// Move an artifact into `invalid_dir` as `<slug>.md` or `<slug>/`.
///
/// A previous quarantine entry with the same name is replaced. Falls back
/// to copy-then-delete when a rename is not possible, e.g. across
/// filesystems.
pub fn quarantine(
    artifact: &OutputArtifact,
    invalid_dir: &Path,
    slug: &str,
) -> io::Result<PathBuf> {
    fs::create_dir_all(invalid_dir)?;
    let target = if artifact.is_bundle() {
        invalid_dir.join(slug)
    } else {
        invalid_dir.join(format!("{slug}.md"))
    };
    remove_any(&target)?;

    let source = artifact.root();
    if fs::rename(source, &target).is_err() {
        if artifact.is_bundle() {
            copy_tree(source, &target)?;
            fs::remove_dir_all(source)?;
        } else {
            fs::copy(source, &target)?;
            fs::remove_file(source)?;
        }
    }
    Ok(target)
}
