use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context};
use walkdir::WalkDir;

pub const DEFAULT_EXTENSION: &str = "mdx";

/// High-traffic topics translated first when priority ordering is on.
pub const DEFAULT_PRIORITY_KEYWORDS: &[&str] = &[
    "index.mdx",
    "getting-started",
    "what-is-buffer",
    "publishing",
    "analytics",
    "social-platforms",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub source: PathBuf,
    pub dest: PathBuf,
}

#[derive(Clone, Debug)]
pub struct FileSet {
    pub extension: String,
    pub priority_keywords: Option<Vec<String>>,
}

impl Default for FileSet {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            priority_keywords: None,
        }
    }
}

impl FileSet {
    #[must_use]
    pub fn with_priority(mut self, keywords: Vec<String>) -> Self {
        self.priority_keywords = Some(keywords);
        self
    }

    /// Every document under `source_root`, paired with its mirror under `dest_root`.
    pub fn list_candidates(&self, source_root: &Path, dest_root: &Path) -> anyhow::Result<Vec<Candidate>> {
        let mut files = self.collect(source_root)?;
        files = match self.priority_keywords.as_deref() {
            Some(keys) => order_by_priority(files, keys),
            None => files,
        };
        files
            .into_iter()
            .map(|source| {
                let dest = map_destination(source_root, dest_root, &source)?;
                Ok(Candidate { source, dest })
            })
            .collect()
    }

    fn collect(&self, root: &Path) -> anyhow::Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(anyhow!(
                "source directory not found: {}",
                root.display()
            ));
        }
        let ext = self.extension.trim_start_matches('.');
        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.with_context(|| format!("walk {}", root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let matches = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case(ext))
                .unwrap_or(false);
            if matches {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Priority paths first, then the rest; each part keeps lexicographic order.
pub fn order_by_priority(files: Vec<PathBuf>, keywords: &[String]) -> Vec<PathBuf> {
    let (mut priority, mut normal): (Vec<PathBuf>, Vec<PathBuf>) = files.into_iter().partition(|p| {
        let s = p.to_string_lossy();
        keywords.iter().any(|k| !k.is_empty() && s.contains(k.as_str()))
    });
    priority.sort();
    normal.sort();
    priority.extend(normal);
    priority
}

/// Replaces the `source_root` prefix of `path` with `dest_root`.
pub fn map_destination(source_root: &Path, dest_root: &Path, path: &Path) -> anyhow::Result<PathBuf> {
    let rel = path.strip_prefix(source_root).with_context(|| {
        format!(
            "{} is not under {}",
            path.display(),
            source_root.display()
        )
    })?;
    if rel.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(anyhow!("path escapes source root: {}", path.display()));
    }
    Ok(dest_root.join(rel))
}

/// Sibling path with `suffix` appended to the full file name (`a.mdx` → `a.mdx.backup`).
pub fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}
