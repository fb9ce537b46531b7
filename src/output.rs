//! CLI output formatting.
//!
//! Output is **information-centric, not file-centric**: each line leads with
//! the item's identity (its slug, or its Ghost id when it never got one) and
//! shows filesystem paths as secondary context after an arrow.
//!
//! # Output Format
//!
//! ## Convert
//!
//! ```text
//! Loaded 5 items (1 rejected), 48 images indexed
//! cafe-notes → content/posts/cafe-notes/index.md (bundle)
//! about → content/pages/about.md
//! untitled-5 → content/invalid/untitled-5.md (invalid)
//! skipped 5e1a2b: status `scheduled` is not exported
//! skipped posts[6]: record has no id
//!
//! Done: 2 valid, 1 invalid, 2 skipped
//! ```
//!
//! ## Check
//!
//! ```text
//! ok      content/posts/cafe-notes/index.md
//! invalid content/posts/broken.md
//!     front matter field `title` is missing or empty
//!
//! 1 of 2 documents valid
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure, no I/O and no side effects.

use crate::pipeline::{ExportEvent, ExportSummary};
use crate::validate::ValidationError;
use std::path::PathBuf;

// ============================================================================
// Convert output
// ============================================================================

/// Format a single export progress event as display lines.
pub fn format_export_event(event: &ExportEvent) -> Vec<String> {
    match event {
        ExportEvent::Loaded {
            items,
            rejected,
            images,
        } => {
            let rejected = if *rejected > 0 {
                format!(" ({rejected} rejected)")
            } else {
                String::new()
            };
            vec![format!(
                "Loaded {items} items{rejected}, {images} images indexed"
            )]
        }
        ExportEvent::Exported { slug, artifact } => {
            let layout = if artifact.is_bundle() { " (bundle)" } else { "" };
            vec![format!(
                "{slug} → {}{layout}",
                artifact.document().display()
            )]
        }
        ExportEvent::Quarantined { slug, target } => {
            vec![format!("{slug} → {} (invalid)", target.display())]
        }
        ExportEvent::Skipped { item, reason } => vec![format!("skipped {item}: {reason}")],
        ExportEvent::Failed { slug, error } => vec![format!("failed {slug}: {error}")],
    }
}

pub fn print_export_event(event: &ExportEvent) {
    for line in format_export_event(event) {
        println!("{line}");
    }
}

/// Format the end-of-run tally.
pub fn format_summary(summary: &ExportSummary) -> Vec<String> {
    vec![
        String::new(),
        format!(
            "Done: {} valid, {} invalid, {} skipped",
            summary.valid, summary.invalid, summary.skipped
        ),
    ]
}

pub fn print_summary(summary: &ExportSummary) {
    for line in format_summary(summary) {
        println!("{line}");
    }
}

// ============================================================================
// Check output
// ============================================================================

/// Format validation results for existing documents.
pub fn format_check_output(results: &[(PathBuf, Result<(), ValidationError>)]) -> Vec<String> {
    let mut lines = Vec::new();
    for (path, result) in results {
        match result {
            Ok(()) => lines.push(format!("ok      {}", path.display())),
            Err(err) => {
                lines.push(format!("invalid {}", path.display()));
                lines.push(format!("    {err}"));
            }
        }
    }
    let valid = results.iter().filter(|(_, r)| r.is_ok()).count();
    lines.push(String::new());
    lines.push(format!("{valid} of {} documents valid", results.len()));
    lines
}

pub fn print_check_output(results: &[(PathBuf, Result<(), ValidationError>)]) {
    for line in format_check_output(results) {
        println!("{line}");
    }
}
