//! Copying referenced images into page bundles.
//!
//! Ghost keeps every upload under `content/images/YYYY/MM/`, plus resized
//! copies under `content/images/size/wNNN/…`. A post's HTML only tells us a
//! URL, so images are matched back to files **by basename**: the image tree
//! is walked once per run into an [`ImageIndex`], and each post's
//! [`AssetLocalizer`] copies what it references into the post's bundle
//! directory.
//!
//! ## Lookup order
//!
//! The walk is sorted by file name and depth-first, and the first path seen
//! for a basename wins. Dated upload folders (`2020/…`) sort before
//! `size/…`, so the full-resolution original is preferred over a resized
//! variant with the same name.
//!
//! ## Misses
//!
//! A reference whose basename is not in the tree is left untouched in the
//! Markdown. That is a broken image in the output, not an error.

use crate::images::{content_image_basename, decoded_basename, map_image_urls, url_basename};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Basename → first matching file under the image source directory.
#[derive(Debug, Default)]
pub struct ImageIndex {
    files: HashMap<String, PathBuf>,
}

impl ImageIndex {
    /// Walk `root` recursively. A missing root yields an empty index.
    pub fn build(root: &Path) -> Self {
        let mut files = HashMap::new();
        if !root.is_dir() {
            warn!(path = %root.display(), "image directory not found; no images will be copied");
            return Self { files };
        }

        let walker = WalkDir::new(root).sort_by_file_name().into_iter();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(error = %err, "skipping unreadable entry in image directory");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            files.entry(name).or_insert_with(|| entry.into_path());
        }
        Self { files }
    }

    pub fn find(&self, basename: &str) -> Option<&Path> {
        self.files.get(basename).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Whether a URL can refer to a file in the local image tree.
///
/// Ghost content image URLs always qualify, whatever their host. Other
/// absolute URLs point at third-party hosts and `data:` URIs are inline.
fn is_local_reference(url: &str) -> bool {
    let url = url.trim();
    if url.starts_with("data:") {
        return false;
    }
    if content_image_basename(url).is_some() || url.contains("__GHOST_URL__") {
        return true;
    }
    !(url.contains("://") || url.starts_with("//") || url.starts_with("mailto:"))
}

/// Copies one item's images into its bundle directory.
///
/// Each distinct basename is copied at most once, whether it was referenced
/// from the body or from a metadata field.
pub struct AssetLocalizer<'a> {
    index: &'a ImageIndex,
    dest_dir: PathBuf,
    copied: Vec<String>,
}

impl<'a> AssetLocalizer<'a> {
    pub fn new(index: &'a ImageIndex, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            index,
            dest_dir: dest_dir.into(),
            copied: Vec::new(),
        }
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Basenames copied so far, in copy order.
    pub fn copied(&self) -> &[String] {
        &self.copied
    }

    /// True once at least one image has been copied.
    pub fn any_found(&self) -> bool {
        !self.copied.is_empty()
    }

    /// Copy `basename` into the bundle if the index knows it.
    fn copy(&mut self, basename: &str) -> Result<bool, AssetError> {
        if self.copied.iter().any(|name| name == basename) {
            return Ok(true);
        }
        let Some(source) = self.index.find(basename) else {
            debug!(file = basename, "image not found in source directory");
            return Ok(false);
        };
        fs::create_dir_all(&self.dest_dir)?;
        fs::copy(source, self.dest_dir.join(basename))?;
        debug!(file = basename, from = %source.display(), "copied image");
        self.copied.push(basename.to_string());
        Ok(true)
    }

    /// Copy every locally resolvable image referenced in `markdown` and
    /// point its URL at `./<basename>`.
    ///
    /// Files are looked up by the percent-decoded basename, while the
    /// rewritten URL keeps the encoded form so it stays a valid destination.
    pub fn localize(&mut self, markdown: &str) -> Result<String, AssetError> {
        fs::create_dir_all(&self.dest_dir)?;

        let mut found: HashMap<String, String> = HashMap::new();
        for image in crate::images::image_refs(markdown) {
            if found.contains_key(&image.url) || !is_local_reference(&image.url) {
                continue;
            }
            let Some(file) = decoded_basename(&image.url) else {
                continue;
            };
            if self.copy(&file)?
                && let Some(linked) = url_basename(&image.url)
            {
                let target = format!("./{linked}");
                found.insert(image.url, target);
            }
        }

        Ok(map_image_urls(markdown, |url| found.get(url).cloned()))
    }

    /// Copy an image referenced outside the body (feature or social image).
    ///
    /// Returns the copied file name, or `None` if it could not be resolved.
    pub fn localize_file(&mut self, reference: &str) -> Result<Option<String>, AssetError> {
        let reference = reference.trim();
        if !is_local_reference(reference) {
            return Ok(None);
        }
        let Some(basename) = decoded_basename(reference) else {
            return Ok(None);
        };
        Ok(self.copy(&basename)?.then_some(basename))
    }
}

/// One-shot form: localize `markdown` into `dest_dir`, reporting whether
/// anything was copied.
pub fn localize(
    markdown: &str,
    index: &ImageIndex,
    dest_dir: &Path,
) -> Result<(String, bool), AssetError> {
    let mut localizer = AssetLocalizer::new(index, dest_dir);
    let markdown = localizer.localize(markdown)?;
    Ok((markdown, localizer.any_found()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::image_tree;
    use tempfile::TempDir;

    #[test]
    fn index_finds_nested_files() {
        let images = image_tree(&["2020/01/pic.jpg", "2021/05/other.png"]);
        let index = ImageIndex::build(images.path());
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.find("pic.jpg"),
            Some(images.path().join("2020/01/pic.jpg").as_path())
        );
        assert_eq!(index.find("missing.jpg"), None);
    }

    #[test]
    fn index_prefers_originals_over_size_variants() {
        let images = image_tree(&["size/w600/2020/01/pic.jpg", "2020/01/pic.jpg"]);
        let index = ImageIndex::build(images.path());
        assert_eq!(
            index.find("pic.jpg"),
            Some(images.path().join("2020/01/pic.jpg").as_path())
        );
    }

    #[test]
    fn index_of_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let index = ImageIndex::build(&tmp.path().join("nope"));
        assert!(index.is_empty());
    }

    #[test]
    fn localize_copies_and_rewrites() {
        let images = image_tree(&["2020/01/pic.jpg"]);
        let out = TempDir::new().unwrap();
        let dest = out.path().join("my-post");
        let index = ImageIndex::build(images.path());

        let md = "Hello ![a](https://blog.example.com/content/images/2020/01/pic.jpg)";
        let (result, found) = localize(md, &index, &dest).unwrap();

        assert!(found);
        assert_eq!(result, "Hello ![a](./pic.jpg)");
        assert!(dest.join("pic.jpg").is_file());
    }

    #[test]
    fn localize_handles_already_relative_refs() {
        let images = image_tree(&["2020/01/pic.jpg"]);
        let out = TempDir::new().unwrap();
        let index = ImageIndex::build(images.path());

        let (result, found) = localize("![a](./pic.jpg)", &index, out.path()).unwrap();
        assert!(found);
        assert_eq!(result, "![a](./pic.jpg)");
        assert!(out.path().join("pic.jpg").is_file());
    }

    #[test]
    fn localize_leaves_misses_and_external_images() {
        let images = image_tree(&["2020/01/pic.jpg"]);
        let out = TempDir::new().unwrap();
        let dest = out.path().join("bundle");
        let index = ImageIndex::build(images.path());

        let md = "![a](/content/images/gone.jpg) ![b](https://cdn.org/pic.jpg)";
        let (result, found) = localize(md, &index, &dest).unwrap();

        assert!(!found);
        assert_eq!(result, md);
        assert!(dest.is_dir(), "bundle directory is created up front");
        assert!(!dest.join("pic.jpg").exists());
    }

    #[test]
    fn localize_overwrites_existing_copy() {
        let images = image_tree(&["pic.jpg"]);
        let out = TempDir::new().unwrap();
        fs::write(out.path().join("pic.jpg"), b"stale").unwrap();
        let index = ImageIndex::build(images.path());

        localize("![a](/content/images/pic.jpg)", &index, out.path()).unwrap();
        assert_eq!(fs::read(out.path().join("pic.jpg")).unwrap(), b"image:pic.jpg");
    }

    #[test]
    fn each_basename_copied_once() {
        let images = image_tree(&["2020/01/pic.jpg"]);
        let out = TempDir::new().unwrap();
        let index = ImageIndex::build(images.path());
        let mut localizer = AssetLocalizer::new(&index, out.path());

        let md = concat!(
            "![a](/content/images/2020/01/pic.jpg) ",
            "![b](/content/images/size/w600/2020/01/pic.jpg)"
        );
        let result = localizer.localize(md).unwrap();
        let feature = localizer
            .localize_file("__GHOST_URL__/content/images/2020/01/pic.jpg")
            .unwrap();

        assert_eq!(result, "![a](./pic.jpg) ![b](./pic.jpg)");
        assert_eq!(feature.as_deref(), Some("pic.jpg"));
        assert_eq!(localizer.copied(), ["pic.jpg".to_string()]);
    }

    #[test]
    fn localize_file_counts_toward_found() {
        let images = image_tree(&["cover.png"]);
        let out = TempDir::new().unwrap();
        let index = ImageIndex::build(images.path());
        let mut localizer = AssetLocalizer::new(&index, out.path().join("post"));

        localizer.localize("No images here.").unwrap();
        assert!(!localizer.any_found());

        let copied = localizer
            .localize_file("https://blog.example.com/content/images/cover.png")
            .unwrap();
        assert_eq!(copied.as_deref(), Some("cover.png"));
        assert!(localizer.any_found());
        assert!(out.path().join("post/cover.png").is_file());
    }

    #[test]
    fn percent_encoded_names_resolve_to_files_on_disk() {
        let images = image_tree(&["2020/01/my pic.jpg"]);
        let out = TempDir::new().unwrap();
        let index = ImageIndex::build(images.path());
        let mut localizer = AssetLocalizer::new(&index, out.path());

        let result = localizer
            .localize("![a](https://blog.example.com/content/images/2020/01/my%20pic.jpg)")
            .unwrap();
        assert_eq!(result, "![a](./my%20pic.jpg)");
        assert_eq!(localizer.copied(), ["my pic.jpg".to_string()]);
        assert_eq!(
            fs::read(out.path().join("my pic.jpg")).unwrap(),
            b"image:my pic.jpg"
        );

        let feature = localizer
            .localize_file("/content/images/2020/01/my%20pic.jpg")
            .unwrap();
        assert_eq!(feature.as_deref(), Some("my pic.jpg"));
    }

    #[test]
    fn localize_file_ignores_external_hosts() {
        let images = image_tree(&["cover.png"]);
        let out = TempDir::new().unwrap();
        let index = ImageIndex::build(images.path());
        let mut localizer = AssetLocalizer::new(&index, out.path());

        let copied = localizer
            .localize_file("https://images.unsplash.com/cover.png")
            .unwrap();
        assert_eq!(copied, None);
        assert!(!localizer.any_found());
    }
}
