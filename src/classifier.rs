//! Heuristic check for documents that still carry source-language text.
//!
//! Two marker families are scanned, frontmatter excluded: plain source-language phrases,
//! and mixed-language bigrams (a target-language pronoun glued to a source-language word)
//! left behind by earlier partial translations. Any hit means the document needs work.

use std::borrow::Cow;

use anyhow::Context;
use regex::Regex;

use crate::frontmatter;
use crate::lang::{Direction, Language};

/// Documents above this byte length are left for manual handling.
pub const DEFAULT_MAX_BYTES: usize = 20_000;

const EN_SOURCE_MARKERS: &[&str] = &[
    r"(?i)\b(Using|with|How to|What is|Creating|Getting started)\b",
    r"(?i)\b(you can|we can|this is|that is|will be|can be)\b",
    r"(?i)\b(are available|is available|the following|in this article)\b",
    r"(?i)\b(Note:|Tips:|Warning:|Important:)",
    r"(?i)\bto (create|add|edit|delete|save|view|use|manage)\b",
];

const EN_MIXED_MARKERS: &[&str] = &[
    r"您\s+(can|will|are|is)\b",
    r"我们\s+(can|will|are|is)\b",
    r"这个\s+(is|will|can)\b",
    r"到\s+(create|add|edit)\b",
    r"在\s+(this|the|your)\b",
    r"\b(with|and|for|of)\s+您的",
];

const ZH_SOURCE_MARKERS: &[&str] = &[r"[一-鿿]{2,}"];

const ZH_MIXED_MARKERS: &[&str] = &[
    r"(?i)\b(the|your|our|this|a)\s*[一-鿿]",
    r"[一-鿿]\s*(?i:is|are|can|will)\b",
];

/// Named marker lists for one language pair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkerTable {
    pub source: Vec<String>,
    pub mixed: Vec<String>,
}

impl MarkerTable {
    /// Built-in table keyed by the language the document must no longer contain.
    pub fn builtin(direction: Direction) -> Self {
        let (source, mixed) = match direction.source {
            Language::En => (EN_SOURCE_MARKERS, EN_MIXED_MARKERS),
            Language::Zh => (ZH_SOURCE_MARKERS, ZH_MIXED_MARKERS),
        };
        Self {
            source: source.iter().map(|s| s.to_string()).collect(),
            mixed: mixed.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replaces either list when an override is given (empty overrides are ignored).
    pub fn with_overrides(mut self, source: Option<Vec<String>>, mixed: Option<Vec<String>>) -> Self {
        if let Some(s) = source.filter(|v| !v.is_empty()) {
            self.source = s;
        }
        if let Some(m) = mixed.filter(|v| !v.is_empty()) {
            self.mixed = m;
        }
        self
    }
}

/// Why a document does or does not need translation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Assessment {
    SourceMarker(String),
    MixedMarker(String),
    Clean,
    Oversized { bytes: usize, limit: usize },
}

impl Assessment {
    pub fn needs_translation(&self) -> bool {
        matches!(self, Self::SourceMarker(_) | Self::MixedMarker(_))
    }
}

#[derive(Clone, Debug)]
pub struct NeedClassifier {
    source: Vec<Regex>,
    mixed: Vec<Regex>,
    max_bytes: usize,
    skip_frontmatter: bool,
}

impl NeedClassifier {
    pub fn new(table: &MarkerTable, max_bytes: usize) -> anyhow::Result<Self> {
        Ok(Self {
            source: compile_all(&table.source).context("compile source markers")?,
            mixed: compile_all(&table.mixed).context("compile mixed markers")?,
            max_bytes,
            skip_frontmatter: true,
        })
    }

    pub fn for_direction(direction: Direction) -> anyhow::Result<Self> {
        Self::new(&MarkerTable::builtin(direction), DEFAULT_MAX_BYTES)
    }

    /// Scan frontmatter too (off by default: metadata often holds untranslated ids).
    #[must_use]
    pub fn scan_frontmatter(mut self, yes: bool) -> Self {
        self.skip_frontmatter = !yes;
        self
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn is_oversized(&self, body: &str) -> bool {
        body.len() > self.max_bytes
    }

    pub fn assess(&self, body: &str) -> Assessment {
        if self.is_oversized(body) {
            return Assessment::Oversized {
                bytes: body.len(),
                limit: self.max_bytes,
            };
        }
        let text = if self.skip_frontmatter {
            frontmatter::split(body).without_frontmatter()
        } else {
            Cow::Borrowed(body)
        };
        if let Some(m) = first_match(&self.source, &text) {
            return Assessment::SourceMarker(m);
        }
        if let Some(m) = first_match(&self.mixed, &text) {
            return Assessment::MixedMarker(m);
        }
        Assessment::Clean
    }

    pub fn needs_translation(&self, body: &str) -> bool {
        self.assess(body).needs_translation()
    }
}

fn compile_all(patterns: &[String]) -> anyhow::Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("bad marker pattern: {p}")))
        .collect()
}

fn first_match(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.find(text).map(|m| m.as_str().to_string()))
}

#[cfg(test)]
mod tests {
    use super::{Assessment, MarkerTable, NeedClassifier};
    use crate::lang::Direction;

    fn en_zh() -> NeedClassifier {
        NeedClassifier::for_direction(Direction::EN_ZH).expect("builtin markers")
    }

    #[test]
    fn english_phrase_in_body_needs_translation() {
        let c = en_zh();
        let doc = "---\ntitle: 标题\n---\n\n在这篇文章中，you can schedule posts.\n";
        assert!(c.needs_translation(doc));
        assert!(matches!(c.assess(doc), Assessment::SourceMarker(_)));
    }

    #[test]
    fn markers_in_frontmatter_are_ignored() {
        let c = en_zh();
        let doc = "---\ntitle: \"Getting started with tags\"\n---\n\n这是一篇完整的中文文章。\n";
        assert_eq!(c.assess(doc), Assessment::Clean);
        assert!(c.scan_frontmatter(true).needs_translation(doc));
    }

    #[test]
    fn frontmatter_after_leading_blank_line_is_ignored() {
        let c = en_zh();
        let doc = "\n---\ntitle: \"Getting started with tags\"\n---\n\n这是一篇完整的中文文章。\n";
        assert!(!c.needs_translation(doc));
    }

    #[test]
    fn pure_chinese_is_clean() {
        let c = en_zh();
        let doc = "# 安排帖子\n\n您可以在日历中查看所有已安排的帖子。\n\n<Card href=\"/zh/x\">卡片</Card>\n";
        assert!(!c.needs_translation(doc));
    }

    #[test]
    fn mixed_bigram_is_detected() {
        let table = MarkerTable::builtin(Direction::EN_ZH).with_overrides(Some(vec![r"\bzzzz\b".into()]), None);
        let c = NeedClassifier::new(&table, 20_000).unwrap();
        let a = c.assess("现在您 can 发布帖子。");
        assert_eq!(a, Assessment::MixedMarker("您 can".to_string()));
    }

    #[test]
    fn oversized_short_circuits() {
        let c = NeedClassifier::new(&MarkerTable::builtin(Direction::EN_ZH), 32).unwrap();
        let doc = "How to use this feature, you can read the following guide.";
        assert!(matches!(c.assess(doc), Assessment::Oversized { limit: 32, .. }));
        assert!(!c.needs_translation(doc));
    }

    #[test]
    fn chinese_source_markers_for_zh_en() {
        let c = NeedClassifier::for_direction(Direction::ZH_EN).unwrap();
        assert!(c.needs_translation("# Scheduling\n\n发布帖子\n"));
        assert!(!c.needs_translation("# Scheduling\n\nYou can schedule posts.\n"));
    }

    #[test]
    fn bad_override_pattern_is_an_error() {
        let table = MarkerTable::builtin(Direction::EN_ZH).with_overrides(Some(vec!["(".into()]), None);
        assert!(NeedClassifier::new(&table, 10).is_err());
    }
}
