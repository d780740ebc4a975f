//! Copies one language's navigation groups into another inside a docs manifest.
//!
//! The manifest is a JSON object with `navigation.languages`, a list of
//! `{ "language": code, "groups": [{ "group": name, "pages": [...] }] }` entries. A page is
//! either a path string without extension (`en/guide/start`) or a nested group. Everything
//! else in the manifest is carried through untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde_json::Value;
use tracing::warn;

use crate::pipeline::files::backup_path;
use crate::pipeline::writer::write_atomic;

pub const MANIFEST_BACKUP_SUFFIX: &str = ".backup";

#[derive(Clone, Debug, Default)]
pub struct NavMirror {
    pub from: String,
    pub to: String,
    /// Group display names for the target language; unmatched names are kept.
    pub group_names: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavReport {
    pub groups: usize,
    pub pages: usize,
    /// `<page>.mdx` paths, relative to the manifest, that do not exist.
    pub missing: Vec<String>,
    pub backup: Option<PathBuf>,
}

impl NavMirror {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            group_names: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_group_names(mut self, names: BTreeMap<String, String>) -> Self {
        self.group_names = names;
        self
    }

    /// Rewrites the `to` language entry of `manifest` from the `from` entry. Adds the entry
    /// when it is absent. Returns the rewritten groups.
    pub fn apply(&self, manifest: &mut Value) -> anyhow::Result<Vec<Value>> {
        let languages = manifest
            .pointer_mut("/navigation/languages")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| anyhow!("manifest has no navigation.languages array"))?;

        let source_groups = languages
            .iter()
            .find(|l| lang_code(l) == Some(self.from.as_str()))
            .and_then(|l| l.get("groups"))
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("no navigation groups for language {:?}", self.from))?;
        let groups: Vec<Value> = source_groups.iter().map(|g| self.rewrite(g)).collect();

        match languages
            .iter_mut()
            .find(|l| lang_code(l) == Some(self.to.as_str()))
        {
            Some(entry) => {
                let obj = entry
                    .as_object_mut()
                    .ok_or_else(|| anyhow!("language entry {:?} is not an object", self.to))?;
                obj.insert("groups".to_string(), Value::Array(groups.clone()));
            }
            None => {
                let mut obj = serde_json::Map::new();
                obj.insert("language".to_string(), Value::String(self.to.clone()));
                obj.insert("groups".to_string(), Value::Array(groups.clone()));
                languages.push(Value::Object(obj));
            }
        }
        Ok(groups)
    }

    fn rewrite(&self, v: &Value) -> Value {
        match v {
            Value::String(page) => Value::String(self.rewrite_page(page)),
            Value::Object(map) => {
                let mut out = map.clone();
                if let Some(Value::String(name)) = map.get("group") {
                    if let Some(t) = self.group_names.get(name) {
                        out.insert("group".to_string(), Value::String(t.clone()));
                    }
                }
                if let Some(Value::Array(pages)) = map.get("pages") {
                    out.insert(
                        "pages".to_string(),
                        Value::Array(pages.iter().map(|p| self.rewrite(p)).collect()),
                    );
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.iter().map(|p| self.rewrite(p)).collect()),
            other => other.clone(),
        }
    }

    fn rewrite_page(&self, page: &str) -> String {
        let prefix = format!("{}/", self.from);
        match page.strip_prefix(&prefix) {
            Some(rest) => format!("{}/{}", self.to, rest),
            None if page == self.from => self.to.clone(),
            None => page.to_string(),
        }
    }

    /// Loads `manifest_path`, mirrors the groups, backs up the old file and writes the new one.
    pub fn mirror_file(&self, manifest_path: &Path) -> anyhow::Result<NavReport> {
        let text = std::fs::read_to_string(manifest_path)
            .with_context(|| format!("read manifest: {}", manifest_path.display()))?;
        let mut manifest: Value = serde_json::from_str(&text)
            .with_context(|| format!("parse manifest: {}", manifest_path.display()))?;
        let groups = self.apply(&mut manifest)?;

        let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));
        let mut pages = Vec::new();
        collect_pages(&groups, &mut pages);
        let missing: Vec<String> = pages
            .iter()
            .map(|p| format!("{p}.mdx"))
            .filter(|f| !base.join(f).is_file())
            .collect();
        for m in &missing {
            warn!(page = %m, "navigation page has no document");
        }

        let backup = backup_path(manifest_path, MANIFEST_BACKUP_SUFFIX);
        write_atomic(&backup, &text).with_context(|| format!("write backup: {}", backup.display()))?;
        let mut out = serde_json::to_string_pretty(&manifest).context("serialize manifest")?;
        out.push('\n');
        write_atomic(manifest_path, &out)
            .with_context(|| format!("write manifest: {}", manifest_path.display()))?;

        Ok(NavReport {
            groups: groups.len(),
            pages: pages.len(),
            missing,
            backup: Some(backup),
        })
    }
}

/// Reads a `name = "translated"` TOML table of group names.
pub fn load_group_names(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read group names: {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parse group names: {}", path.display()))
}

fn lang_code(v: &Value) -> Option<&str> {
    v.get("language").and_then(Value::as_str)
}

fn collect_pages(items: &[Value], out: &mut Vec<String>) {
    for v in items {
        match v {
            Value::String(p) => out.push(p.clone()),
            Value::Object(map) => {
                if let Some(Value::Array(pages)) = map.get("pages") {
                    collect_pages(pages, out);
                }
            }
            Value::Array(nested) => collect_pages(nested, out),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::NavMirror;

    fn manifest() -> serde_json::Value {
        json!({
            "name": "Docs",
            "navigation": {
                "languages": [
                    {
                        "language": "en",
                        "groups": [
                            { "group": "Getting started", "pages": ["en/index", "en/guide/start"] },
                            { "group": "Publishing", "pages": [
                                "en/publishing",
                                { "group": "Scheduling", "pages": ["en/publishing/queue"] }
                            ] }
                        ]
                    },
                    { "language": "zh", "groups": [], "banner": "keep" }
                ]
            }
        })
    }

    #[test]
    fn mirrors_groups_with_prefix_rewrite() {
        let mut m = manifest();
        let names = BTreeMap::from([("Publishing".to_string(), "发布功能".to_string())]);
        let groups = NavMirror::new("en", "zh").with_group_names(names).apply(&mut m).unwrap();
        assert_eq!(groups.len(), 2);
        let zh = &m["navigation"]["languages"][1];
        assert_eq!(zh["banner"], "keep");
        assert_eq!(zh["groups"][0]["group"], "Getting started");
        assert_eq!(zh["groups"][0]["pages"][1], "zh/guide/start");
        assert_eq!(zh["groups"][1]["group"], "发布功能");
        assert_eq!(zh["groups"][1]["pages"][1]["pages"][0], "zh/publishing/queue");
        assert_eq!(m["navigation"]["languages"][0]["groups"][0]["pages"][0], "en/index");
        assert_eq!(m["name"], "Docs");
    }

    #[test]
    fn adds_missing_language_and_rejects_unknown_source() {
        let mut m = manifest();
        NavMirror::new("en", "fr").apply(&mut m).unwrap();
        assert_eq!(m["navigation"]["languages"][2]["language"], "fr");
        assert!(NavMirror::new("de", "zh").apply(&mut m).is_err());
        assert!(NavMirror::new("en", "zh").apply(&mut json!({"x": 1})).is_err());
    }

    #[test]
    fn file_round_trip_reports_missing_and_backs_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.json");
        let original = serde_json::to_string_pretty(&manifest()).unwrap();
        std::fs::write(&path, &original).unwrap();
        std::fs::create_dir_all(dir.path().join("zh/guide")).unwrap();
        std::fs::write(dir.path().join("zh/index.mdx"), "x").unwrap();
        std::fs::write(dir.path().join("zh/guide/start.mdx"), "x").unwrap();

        let report = NavMirror::new("en", "zh").mirror_file(&path).unwrap();
        assert_eq!(report.pages, 4);
        assert_eq!(report.missing, vec!["zh/publishing.mdx".to_string(), "zh/publishing/queue.mdx".to_string()]);
        assert_eq!(std::fs::read_to_string(dir.path().join("docs.json.backup")).unwrap(), original);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.find("\"name\"").unwrap() < text.find("\"navigation\"").unwrap());
        assert!(text.contains("zh/publishing/queue"));
    }
}
