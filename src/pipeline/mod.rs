pub mod client;
pub mod config;
pub mod files;
pub mod prompts;
pub mod retry;
pub mod trace;
pub mod translator;
pub mod writer;

pub use client::{DocumentTranslator, RemoteTranslator, TranslateError, Translation};
pub use config::{init_default_config, OutputMode, Overrides, PipelineConfig};
pub use files::{map_destination, Candidate, FileSet};
pub use translator::{DocumentError, Outcome, RunSummary, SkipReason, TranslatorPipeline};
