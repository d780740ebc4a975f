//! Re-cleans documents that earlier runs wrote with stray fences or blank-line runs.

use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::pipeline::files::FileSet;
use crate::pipeline::writer::DocWriter;
use crate::progress::ConsoleProgress;
use crate::sanitize::sanitize_document;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FixSummary {
    pub fixed: usize,
    pub unchanged: usize,
    pub errored: usize,
    pub fixed_paths: Vec<PathBuf>,
}

/// Rewrites every document under `root` whose cleaned form differs from what is on disk.
pub fn fix_tree(
    root: &Path,
    files: &FileSet,
    writer: &dyn DocWriter,
    progress: &ConsoleProgress,
) -> anyhow::Result<FixSummary> {
    let candidates = files.list_candidates(root, root)?;
    let total = candidates.len();
    let mut summary = FixSummary::default();
    progress.info(format!("Fixing format: {} document(s) under {}", total, root.display()));

    for (i, c) in candidates.iter().enumerate() {
        let rel = c.source.strip_prefix(root).unwrap_or(&c.source).display().to_string();
        let status = match std::fs::read_to_string(&c.source) {
            Err(e) => {
                error!(path = %c.source.display(), error = %e, "read failed");
                summary.errored += 1;
                "error"
            }
            Ok(text) => {
                let cleaned = sanitize_document(&text);
                if cleaned == text {
                    summary.unchanged += 1;
                    "unchanged"
                } else {
                    match writer.write(&c.source, &cleaned) {
                        Ok(()) => {
                            debug!(path = %c.source.display(), "fixed");
                            summary.fixed += 1;
                            summary.fixed_paths.push(c.source.clone());
                            "fixed"
                        }
                        Err(e) => {
                            error!(path = %c.source.display(), error = %e, "write failed");
                            summary.errored += 1;
                            "error"
                        }
                    }
                }
            }
        };
        progress.progress("fix", i + 1, total, format!("{rel}: {status}"));
    }

    progress.summary(
        "Format fix finished",
        &[
            ("fixed", summary.fixed.to_string()),
            ("unchanged", summary.unchanged.to_string()),
            ("errors", summary.errored.to_string()),
        ],
    );
    Ok(summary)
}
