use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const CONFIG_FILENAME: &str = "mdx-translator.toml";
pub const CONFIG_ENV: &str = "MDX_TRANSLATOR_CONFIG";

/// On-disk configuration. Every field is optional; CLI flags win over the file and the file
/// wins over built-in defaults.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub endpoint: EndpointSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub prompts: PromptsSection,
    #[serde(default)]
    pub markers: MarkersSection,
    #[serde(default)]
    pub glossary: GlossarySection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct EndpointSection {
    /// Chat-completions URL (OpenAI-compatible).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Name of the environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Skip TLS certificate verification.
    #[serde(default)]
    pub insecure: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct RetrySection {
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub base_delay_secs: Option<f64>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PipelineSection {
    /// Language pair, e.g. "en-zh".
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub source_dir: Option<PathBuf>,
    /// When set, translations go to this parallel tree instead of overwriting the source.
    #[serde(default)]
    pub dest_dir: Option<PathBuf>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub only_missing: Option<bool>,
    #[serde(default)]
    pub overwrite_source_language: Option<bool>,
    #[serde(default)]
    pub source_script_threshold: Option<f32>,
    #[serde(default)]
    pub max_files: Option<usize>,
    #[serde(default)]
    pub max_bytes: Option<usize>,
    #[serde(default)]
    pub request_delay_secs: Option<f64>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub batch_pause_secs: Option<f64>,
    #[serde(default)]
    pub backup_suffix: Option<String>,
    #[serde(default)]
    pub priority: Option<bool>,
    #[serde(default)]
    pub priority_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub short_output_ratio: Option<f32>,
    #[serde(default)]
    pub trace_dir: Option<PathBuf>,
    #[serde(default)]
    pub trace_prompts: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PromptsSection {
    /// Replaces the built-in system persona.
    #[serde(default)]
    pub system: Option<String>,
    /// Names that must appear verbatim in the output.
    #[serde(default)]
    pub preserved_names: Option<Vec<String>>,
    /// Appended to the numbered rule list.
    #[serde(default)]
    pub extra_rules: Option<Vec<String>>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct MarkersSection {
    #[serde(default)]
    pub source: Option<Vec<String>>,
    #[serde(default)]
    pub mixed: Option<Vec<String>>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct GlossarySection {
    #[serde(default)]
    pub replace_builtin: Option<bool>,
    #[serde(default)]
    pub terms: BTreeMap<String, String>,
}

pub fn find_file_upwards(start: &Path, filename: &str, max_depth: usize) -> Option<PathBuf> {
    let mut dir = Some(start);
    for _ in 0..=max_depth {
        let d = dir?;
        let cand = d.join(filename);
        if cand.is_file() {
            return Some(cand);
        }
        dir = d.parent();
    }
    None
}

pub fn find_default_config(workdir: &Path, filename: &str) -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, filename, 8) {
            return Some(p);
        }
    }
    find_file_upwards(workdir, filename, 8)
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    parse_config(&text).with_context(|| format!("parse config: {}", path.display()))
}

pub fn parse_config(text: &str) -> anyhow::Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(text).context("parse config toml")?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::{find_file_upwards, parse_config};

    #[test]
    fn parses_partial_config() {
        let cfg = parse_config(
            r#"
[endpoint]
url = "https://llm.example.com/v1/chat/completions"
model = "gpt-4o"

[pipeline]
direction = "zh-en"
priority_keywords = ["index.mdx", "publishing"]

[glossary.terms]
posts = "帖子"
"#,
        )
        .expect("parse");
        assert_eq!(cfg.endpoint.model.as_deref(), Some("gpt-4o"));
        assert_eq!(cfg.pipeline.direction.as_deref(), Some("zh-en"));
        assert_eq!(cfg.pipeline.priority_keywords.as_ref().map(Vec::len), Some(2));
        assert_eq!(cfg.glossary.terms.get("posts").map(String::as_str), Some("帖子"));
        assert!(cfg.retry.max_attempts.is_none());
    }

    #[test]
    fn empty_config_is_default() {
        let cfg = parse_config("").expect("parse");
        assert!(cfg.endpoint.url.is_none());
        assert!(cfg.markers.source.is_none());
    }

    #[test]
    fn rejects_bad_types() {
        assert!(parse_config("[retry]\nmax_attempts = \"three\"\n").is_err());
    }

    #[test]
    fn finds_file_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("x.toml"), "").unwrap();
        let found = find_file_upwards(&nested, "x.toml", 4).unwrap();
        assert_eq!(found, dir.path().join("x.toml"));
        assert!(find_file_upwards(&nested, "missing.toml", 4).is_none());
    }
}
