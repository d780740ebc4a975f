use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Parser;

use mdx_translator::fixup::fix_tree;
use mdx_translator::lang::Direction;
use mdx_translator::models::RemoteChatModel;
use mdx_translator::navigation::{load_group_names, NavMirror};
use mdx_translator::pipeline::retry::ThreadSleeper;
use mdx_translator::pipeline::writer::FsWriter;
use mdx_translator::pipeline::{
    init_default_config, Overrides, PipelineConfig, RemoteTranslator, TranslatorPipeline,
};
use mdx_translator::progress::ConsoleProgress;

#[derive(Parser, Debug)]
#[command(name = "mdx-translator")]
#[command(about = "Translate MDX documentation trees through a chat-completions endpoint", long_about = None)]
struct Args {
    /// Write a default mdx-translator.toml, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory for --init-config (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite an existing config when used with --init-config
    #[arg(long)]
    force: bool,

    /// Config file path (default: search for mdx-translator.toml upwards)
    #[arg(long, value_name = "TOML")]
    config: Option<PathBuf>,

    /// Language pair, e.g. en-zh or zh-en
    #[arg(long, value_name = "PAIR")]
    direction: Option<Direction>,

    /// Source document tree
    #[arg(long, value_name = "DIR")]
    source: Option<PathBuf>,

    /// Write translations into this parallel tree instead of in place
    #[arg(long, value_name = "DIR")]
    dest: Option<PathBuf>,

    /// With --dest: leave existing non-empty destination files alone
    #[arg(long)]
    only_missing: bool,

    /// With --only-missing: still replace destinations that are mostly source language
    #[arg(long)]
    overwrite_source_language: bool,

    /// Chat-completions URL
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// API key (default: the variable named by [endpoint].api_key_env)
    #[arg(long, env = "MDX_TRANSLATOR_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Process at most N documents
    #[arg(long, value_name = "N")]
    max_files: Option<usize>,

    /// Seconds to wait after each translated document
    #[arg(long, value_name = "SECS")]
    request_delay: Option<f64>,

    /// Attempts per document
    #[arg(long, value_name = "N")]
    max_retries: Option<u32>,

    /// Base backoff in seconds; the wait after attempt n is base * n
    #[arg(long, value_name = "SECS")]
    retry_delay: Option<f64>,

    /// Translate high-traffic pages first
    #[arg(long)]
    priority: bool,

    /// List what would be translated without calling the endpoint or writing files
    #[arg(long)]
    dry_run: bool,

    /// Check the endpoint with a tiny request before the batch
    #[arg(long)]
    preflight: bool,

    /// Re-clean fences and blank lines in already translated documents, then exit
    #[arg(long)]
    fix_format: bool,

    /// Copy navigation groups between languages in this docs manifest, then exit
    #[arg(long, value_name = "JSON")]
    mirror_nav: Option<PathBuf>,

    /// Language code whose groups are copied
    #[arg(long, default_value = "en")]
    nav_from: String,

    /// Language code that receives the groups
    #[arg(long, default_value = "zh")]
    nav_to: String,

    /// TOML table of group-name translations for --mirror-nav
    #[arg(long, value_name = "TOML")]
    nav_group_names: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let progress = ConsoleProgress::new(true);

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    if let Some(manifest) = args.mirror_nav.as_ref() {
        let mut nav = NavMirror::new(&args.nav_from, &args.nav_to);
        if let Some(p) = args.nav_group_names.as_ref() {
            nav = nav.with_group_names(load_group_names(p)?);
        }
        let report = nav.mirror_file(manifest)?;
        progress.summary(
            &format!("Navigation {} -> {} updated: {}", args.nav_from, args.nav_to, manifest.display()),
            &[
                ("groups", report.groups.to_string()),
                ("pages", report.pages.to_string()),
                ("missing", report.missing.len().to_string()),
                (
                    "backup",
                    report
                        .backup
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                ),
            ],
        );
        return Ok(());
    }

    let overrides = Overrides {
        config_path: args.config.clone(),
        direction: args.direction,
        source_dir: args.source.clone(),
        dest_dir: args.dest.clone(),
        only_missing: args.only_missing,
        overwrite_source_language: args.overwrite_source_language,
        url: args.endpoint.clone(),
        api_key: args.api_key.clone(),
        model: args.model.clone(),
        insecure: args.insecure,
        max_files: args.max_files,
        request_delay_secs: args.request_delay,
        max_retries: args.max_retries,
        retry_delay_secs: args.retry_delay,
        priority: args.priority,
        dry_run: args.dry_run,
    };
    let cfg = PipelineConfig::resolve(overrides).context("build config")?;
    if !cfg.source_root.is_dir() {
        return Err(anyhow!("source directory not found: {}", cfg.source_root.display()));
    }
    if let Some(p) = cfg.config_path.as_ref() {
        progress.info(format!("Config: {}", p.display()));
    }

    if args.fix_format {
        fix_tree(&cfg.source_root, &cfg.files, &FsWriter, &progress)?;
        return Ok(());
    }

    let endpoint = cfg.endpoint.clone();
    let prompts = cfg.prompts.clone();
    let retry = cfg.retry;
    let pipeline = TranslatorPipeline::new(cfg, progress).context("build pipeline")?;
    if args.dry_run {
        pipeline.plan()?;
        return Ok(());
    }

    let model = RemoteChatModel::new(endpoint.model_config()?)?;
    let max_tokens = model.max_tokens();
    let sleeper = ThreadSleeper;
    let translator = RemoteTranslator::new(model, prompts, retry, max_tokens, &sleeper);

    if args.preflight {
        let reply = translator
            .ping()
            .with_context(|| format!("endpoint check failed: {}", endpoint.url))?;
        eprintln!("Endpoint OK ({}): {}", endpoint.model, reply.trim());
    }

    pipeline.run(&translator, &FsWriter, &sleeper)?;
    Ok(())
}
