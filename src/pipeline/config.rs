use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};

use crate::classifier::{MarkerTable, DEFAULT_MAX_BYTES};
use crate::config::{find_default_config, load_config, AppConfig, CONFIG_ENV, CONFIG_FILENAME};
use crate::lang::Direction;
use crate::models::remote::{
    DEFAULT_ENDPOINT, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS,
};
use crate::models::RemoteModelConfig;
use crate::pipeline::files::{FileSet, DEFAULT_EXTENSION, DEFAULT_PRIORITY_KEYWORDS};
use crate::pipeline::prompts::PromptBuilder;
use crate::pipeline::retry::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
use crate::quality::DEFAULT_SHORT_OUTPUT_RATIO;
use crate::terminology::Glossary;

pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_BATCH_SIZE: usize = 3;
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_secs(5);
pub const DEFAULT_BACKUP_SUFFIX: &str = ".backup";
pub const DEFAULT_SOURCE_SCRIPT_THRESHOLD: f32 = 0.3;

/// Where translated text goes.
#[derive(Clone, Debug, PartialEq)]
pub enum OutputMode {
    /// Overwrite each document, keeping a backup of the previous bytes.
    InPlace,
    /// Write into a parallel tree with the same relative layout.
    Mirror {
        dest_root: PathBuf,
        only_missing: bool,
        overwrite_source_language: bool,
        source_script_threshold: f32,
    },
}

#[derive(Clone, Debug)]
pub struct EndpointSettings {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    pub insecure: bool,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            insecure: false,
        }
    }
}

impl EndpointSettings {
    /// Client settings; fails when no API key was found.
    pub fn model_config(&self) -> anyhow::Result<RemoteModelConfig> {
        let key = self.api_key.clone().filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            anyhow!(
                "no API key: pass --api-key or set {}",
                self.api_key_env
            )
        })?;
        let mut cfg = RemoteModelConfig::new(&self.url, key, &self.model);
        cfg.timeout = self.timeout;
        cfg.max_tokens = self.max_tokens;
        cfg.temperature = self.temperature;
        cfg.insecure = self.insecure;
        Ok(cfg)
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub direction: Option<Direction>,
    pub source_dir: Option<PathBuf>,
    pub dest_dir: Option<PathBuf>,
    pub only_missing: bool,
    pub overwrite_source_language: bool,
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub insecure: bool,
    pub max_files: Option<usize>,
    pub request_delay_secs: Option<f64>,
    pub max_retries: Option<u32>,
    pub retry_delay_secs: Option<f64>,
    pub priority: bool,
    pub dry_run: bool,
}

/// Everything one batch needs, resolved once and handed to the orchestrator.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub config_path: Option<PathBuf>,
    pub direction: Direction,
    pub source_root: PathBuf,
    pub mode: OutputMode,
    pub files: FileSet,
    pub max_files: Option<usize>,
    pub max_bytes: usize,
    pub request_delay: Duration,
    pub batch_size: usize,
    pub batch_pause: Duration,
    pub backup_suffix: String,
    pub short_output_ratio: f32,
    pub trace_dir: PathBuf,
    pub trace_prompts: bool,
    pub dry_run: bool,
    pub retry: RetryPolicy,
    pub endpoint: EndpointSettings,
    pub markers: MarkerTable,
    pub prompts: PromptBuilder,
}

impl PipelineConfig {
    /// Built-in defaults for an in-place run over `source_root`.
    pub fn new(source_root: impl Into<PathBuf>, direction: Direction) -> Self {
        let source_root = source_root.into();
        Self {
            config_path: None,
            direction,
            trace_dir: source_root.join("_trace"),
            source_root,
            mode: OutputMode::InPlace,
            files: FileSet::default(),
            max_files: None,
            max_bytes: DEFAULT_MAX_BYTES,
            request_delay: DEFAULT_REQUEST_DELAY,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pause: DEFAULT_BATCH_PAUSE,
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            short_output_ratio: DEFAULT_SHORT_OUTPUT_RATIO,
            trace_prompts: false,
            dry_run: false,
            retry: RetryPolicy::default(),
            endpoint: EndpointSettings::default(),
            markers: MarkerTable::builtin(direction),
            prompts: PromptBuilder::new(direction),
        }
    }

    /// No waits between documents or retries.
    #[must_use]
    pub fn without_delays(mut self) -> Self {
        self.request_delay = Duration::ZERO;
        self.batch_pause = Duration::ZERO;
        self.retry = RetryPolicy::immediate(self.retry.max_attempts);
        self
    }

    #[must_use]
    pub fn mirror_into(mut self, dest_root: impl Into<PathBuf>, only_missing: bool) -> Self {
        self.mode = OutputMode::Mirror {
            dest_root: dest_root.into(),
            only_missing,
            overwrite_source_language: false,
            source_script_threshold: DEFAULT_SOURCE_SCRIPT_THRESHOLD,
        };
        self
    }

    /// Root of the tree that receives translations.
    pub fn dest_root(&self) -> &Path {
        match &self.mode {
            OutputMode::InPlace => &self.source_root,
            OutputMode::Mirror { dest_root, .. } => dest_root,
        }
    }

    /// Layers CLI overrides over the config file over built-in defaults.
    pub fn resolve(o: Overrides) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let cfg_file = o
            .config_path
            .clone()
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .or_else(|| {
                let hint = o.source_dir.as_deref().unwrap_or(&cwd);
                find_default_config(hint, CONFIG_FILENAME)
            });
        let file_cfg = match cfg_file.as_ref() {
            Some(p) if p.exists() => load_config(p)?,
            Some(p) if o.config_path.is_some() => {
                return Err(anyhow!("config file not found: {}", p.display()));
            }
            _ => AppConfig::default(),
        };
        let cfg_dir = cfg_file
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.clone());
        Self::from_parts(o, file_cfg, cfg_file.filter(|p| p.exists()), &cfg_dir)
    }

    /// Merge step of [`PipelineConfig::resolve`], without touching the environment's config search.
    pub fn from_parts(
        o: Overrides,
        file_cfg: AppConfig,
        config_path: Option<PathBuf>,
        cfg_dir: &Path,
    ) -> anyhow::Result<Self> {
        let p = &file_cfg.pipeline;
        let direction = match (o.direction, p.direction.as_deref()) {
            (Some(d), _) => d,
            (None, Some(s)) => s
                .parse()
                .with_context(|| format!("[pipeline].direction = {s:?}"))?,
            (None, None) => Direction::default(),
        };

        let relative_to_cfg = |path: PathBuf| {
            if path.is_relative() {
                cfg_dir.join(path)
            } else {
                path
            }
        };
        let source_root = o
            .source_dir
            .clone()
            .or_else(|| p.source_dir.clone().map(relative_to_cfg))
            .ok_or_else(|| anyhow!("no source directory: pass --source or set [pipeline].source_dir"))?;

        let mut cfg = Self::new(source_root, direction);
        cfg.config_path = config_path;

        let dest = o
            .dest_dir
            .clone()
            .or_else(|| p.dest_dir.clone().map(relative_to_cfg));
        if let Some(dest_root) = dest {
            cfg.mode = OutputMode::Mirror {
                dest_root,
                only_missing: o.only_missing || p.only_missing.unwrap_or(false),
                overwrite_source_language: o.overwrite_source_language
                    || p.overwrite_source_language.unwrap_or(false),
                source_script_threshold: p
                    .source_script_threshold
                    .unwrap_or(DEFAULT_SOURCE_SCRIPT_THRESHOLD)
                    .clamp(0.0, 1.0),
            };
        }

        cfg.files.extension = p
            .extension
            .clone()
            .map(|e| e.trim().trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
        if o.priority || p.priority.unwrap_or(false) {
            let keys = p.priority_keywords.clone().unwrap_or_else(|| {
                DEFAULT_PRIORITY_KEYWORDS.iter().map(|s| s.to_string()).collect()
            });
            cfg.files = cfg.files.with_priority(keys);
        }
        cfg.max_files = o.max_files.or(p.max_files).filter(|n| *n > 0);
        cfg.max_bytes = p.max_bytes.filter(|n| *n > 0).unwrap_or(DEFAULT_MAX_BYTES);
        cfg.request_delay = secs(
            "request_delay_secs",
            o.request_delay_secs.or(p.request_delay_secs),
            DEFAULT_REQUEST_DELAY,
        )?;
        cfg.batch_size = p.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1);
        cfg.batch_pause = secs("batch_pause_secs", p.batch_pause_secs, DEFAULT_BATCH_PAUSE)?;
        cfg.backup_suffix = p
            .backup_suffix
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BACKUP_SUFFIX.to_string());
        cfg.short_output_ratio = p.short_output_ratio.unwrap_or(DEFAULT_SHORT_OUTPUT_RATIO);
        cfg.trace_prompts = p.trace_prompts.unwrap_or(false);
        cfg.trace_dir = match p.trace_dir.clone() {
            Some(d) => relative_to_cfg(d),
            None => cfg.dest_root().join("_trace"),
        };
        cfg.dry_run = o.dry_run;

        let r = &file_cfg.retry;
        cfg.retry = RetryPolicy::new(
            o.max_retries.or(r.max_attempts).unwrap_or(DEFAULT_MAX_ATTEMPTS),
            secs("base_delay_secs", o.retry_delay_secs.or(r.base_delay_secs), DEFAULT_BASE_DELAY)?,
        );

        let e = &file_cfg.endpoint;
        let api_key_env = e
            .api_key_env
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());
        cfg.endpoint = EndpointSettings {
            url: o.url.clone().or_else(|| e.url.clone()).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: o.model.clone().or_else(|| e.model.clone()).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: o.api_key.clone().or_else(|| std::env::var(&api_key_env).ok()),
            api_key_env,
            timeout: Duration::from_secs(e.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1)),
            max_tokens: e.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS).max(1),
            temperature: e.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            insecure: o.insecure || e.insecure.unwrap_or(false),
        };

        cfg.markers = MarkerTable::builtin(direction)
            .with_overrides(file_cfg.markers.source.clone(), file_cfg.markers.mixed.clone());

        let mut glossary = if file_cfg.glossary.replace_builtin.unwrap_or(false) {
            Glossary::new()
        } else {
            Glossary::builtin(direction)
        };
        glossary.extend(file_cfg.glossary.terms.clone());
        let mut prompts = PromptBuilder::new(direction).with_glossary(glossary);
        let ps = &file_cfg.prompts;
        if let Some(system) = ps.system.clone().filter(|s| !s.trim().is_empty()) {
            prompts = prompts.with_system(system);
        }
        if let Some(names) = ps.preserved_names.clone() {
            prompts = prompts.with_preserved_names(names);
        }
        if let Some(rules) = ps.extra_rules.clone() {
            prompts = prompts.with_extra_rules(rules);
        }
        cfg.prompts = prompts;

        Ok(cfg)
    }
}

/// Seconds as a `Duration`. Negative, non-finite and out-of-range values are setup errors.
fn secs(name: &str, v: Option<f64>, default: Duration) -> anyhow::Result<Duration> {
    match v {
        Some(s) => Duration::try_from_secs_f64(s).with_context(|| format!("invalid {name}: {s}")),
        None => Ok(default),
    }
}

/// Writes a commented default config into `dir`. An existing file is kept unless `force`.
pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(CONFIG_FILENAME);
    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

pub const DEFAULT_CONFIG_TOML: &str = r#"[endpoint]
url = "https://api.openai.com/v1/chat/completions"
model = "gpt-4o"
# The key itself never lives in this file.
api_key_env = "OPENAI_API_KEY"
timeout_secs = 120
max_tokens = 4000
temperature = 0.1
insecure = false

[retry]
max_attempts = 3
# Wait after attempt n is base_delay_secs * n.
base_delay_secs = 2.0

[pipeline]
# "en-zh" translates leftover English inside a Chinese tree; "zh-en" goes the other way.
direction = "en-zh"
source_dir = "zh"
# With dest_dir set, translations are written to a parallel tree instead of in place.
# dest_dir = "en"
# only_missing = true
# overwrite_source_language = true
# source_script_threshold = 0.3
extension = "mdx"
max_bytes = 20000
request_delay_secs = 2.0
batch_size = 3
batch_pause_secs = 5.0
backup_suffix = ".backup"
priority = false
priority_keywords = ["index.mdx", "getting-started", "what-is-buffer", "publishing", "analytics", "social-platforms"]
short_output_ratio = 0.3
trace_dir = "_trace"
trace_prompts = false

[prompts]
# system = "You are a professional technical documentation translator."
preserved_names = ["Aitoearn", "Instagram", "Facebook", "LinkedIn", "X/Twitter", "Twitter", "TikTok", "Pinterest", "YouTube", "Mastodon", "Threads", "Bluesky"]
extra_rules = []

# Regex lists; either one replaces the built-in list for the language pair.
[markers]
# source = ['(?i)\byou can\b']
# mixed = ['您\s+(can|will)\b']

[glossary]
replace_builtin = false

[glossary.terms]
# "content calendar" = "内容日历"
"#;

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use super::{init_default_config, OutputMode, Overrides, PipelineConfig, DEFAULT_CONFIG_TOML};
    use crate::config::parse_config;
    use crate::lang::Direction;

    #[test]
    fn default_file_parses() {
        let cfg = parse_config(DEFAULT_CONFIG_TOML).expect("parse");
        assert_eq!(cfg.pipeline.direction.as_deref(), Some("en-zh"));
        assert_eq!(cfg.retry.max_attempts, Some(3));
    }

    #[test]
    fn cli_beats_file_beats_defaults() {
        let file = parse_config(
            r#"
[pipeline]
direction = "zh-en"
source_dir = "docs/zh"
dest_dir = "docs/en"
only_missing = true
request_delay_secs = 7.5

[retry]
max_attempts = 5

[endpoint]
model = "file-model"
"#,
        )
        .unwrap();
        let o = Overrides {
            model: Some("cli-model".into()),
            max_retries: Some(2),
            ..Default::default()
        };
        let cfg = PipelineConfig::from_parts(o, file, None, Path::new("/proj")).unwrap();
        assert_eq!(cfg.direction, Direction::ZH_EN);
        assert_eq!(cfg.source_root, PathBuf::from("/proj/docs/zh"));
        assert_eq!(cfg.endpoint.model, "cli-model");
        assert_eq!(cfg.retry.max_attempts, 2);
        assert_eq!(cfg.request_delay, Duration::from_millis(7500));
        assert_eq!(cfg.batch_size, 3);
        match &cfg.mode {
            OutputMode::Mirror {
                dest_root,
                only_missing,
                overwrite_source_language,
                ..
            } => {
                assert_eq!(dest_root, &PathBuf::from("/proj/docs/en"));
                assert!(*only_missing);
                assert!(!*overwrite_source_language);
            }
            OutputMode::InPlace => panic!("expected mirror mode"),
        }
    }

    #[test]
    fn source_dir_is_required() {
        let err = PipelineConfig::from_parts(Overrides::default(), Default::default(), None, Path::new("."))
            .unwrap_err();
        assert!(err.to_string().contains("no source directory"));
    }

    #[test]
    fn bad_direction_in_file_is_an_error() {
        let file = parse_config("[pipeline]\ndirection = \"en-en\"\nsource_dir = \"zh\"\n").unwrap();
        assert!(PipelineConfig::from_parts(Overrides::default(), file, None, Path::new(".")).is_err());
    }

    #[test]
    fn missing_key_is_reported_with_env_name() {
        let mut cfg = PipelineConfig::new("zh", Direction::EN_ZH);
        cfg.endpoint.api_key_env = "SOME_UNSET_KEY_VAR".into();
        let err = cfg.endpoint.model_config().unwrap_err();
        assert!(err.to_string().contains("SOME_UNSET_KEY_VAR"));
        cfg.endpoint.api_key = Some("sk-test".into());
        assert_eq!(cfg.endpoint.model_config().unwrap().api_key, "sk-test");
    }

    #[test]
    fn unrepresentable_delay_is_a_setup_error() {
        let file = parse_config("[pipeline]\nsource_dir = \"zh\"\nbatch_pause_secs = -1.0\n").unwrap();
        let err = PipelineConfig::from_parts(Overrides::default(), file, None, Path::new(".")).unwrap_err();
        assert!(format!("{err:#}").contains("batch_pause_secs"));

        for bad in [1e20, f64::NAN, f64::INFINITY] {
            let o = Overrides {
                source_dir: Some("zh".into()),
                request_delay_secs: Some(bad),
                ..Default::default()
            };
            let err = PipelineConfig::from_parts(o, Default::default(), None, Path::new(".")).unwrap_err();
            assert!(format!("{err:#}").contains("request_delay_secs"));
        }

        let o = Overrides {
            source_dir: Some("zh".into()),
            retry_delay_secs: Some(0.0),
            ..Default::default()
        };
        let cfg = PipelineConfig::from_parts(o, Default::default(), None, Path::new(".")).unwrap();
        assert_eq!(cfg.retry.base_delay, Duration::ZERO);
    }

    #[test]
    fn init_keeps_existing_unless_forced() {
        let dir = tempfile::tempdir().unwrap();
        let p = init_default_config(dir.path(), false).unwrap();
        std::fs::write(&p, "# mine\n").unwrap();
        init_default_config(dir.path(), false).unwrap();
        assert_eq!(std::fs::read_to_string(&p).unwrap(), "# mine\n");
        init_default_config(dir.path(), true).unwrap();
        assert_eq!(std::fs::read_to_string(&p).unwrap(), DEFAULT_CONFIG_TOML);
    }
}
