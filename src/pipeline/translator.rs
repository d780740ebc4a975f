use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::classifier::{Assessment, NeedClassifier};
use crate::progress::ConsoleProgress;
use crate::quality::quality_report;
use crate::textutil::is_mostly_language;

use super::client::{DocumentTranslator, TranslateError};
use super::config::{OutputMode, PipelineConfig};
use super::files::Candidate;
use super::retry::Sleeper;
use super::trace::TraceWriter;
use super::writer::{write_with_backup, DocWriter, ReplaceError};

/// Per-document failure. Each variant ends the document in the errored state.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("backup {}: {source}", path.display())]
    Backup { path: PathBuf, source: io::Error },
    #[error("write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Translate(#[from] TranslateError),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SkipReason {
    /// Classifier found no source-language text.
    AlreadyTranslated,
    Oversized { bytes: usize, limit: usize },
    /// Mirror target already holds content and may not be replaced.
    DestinationExists,
}

impl SkipReason {
    pub fn describe(&self) -> String {
        match self {
            Self::AlreadyTranslated => "already translated".to_string(),
            Self::Oversized { bytes, limit } => format!("too large ({bytes} > {limit} bytes), handle manually"),
            Self::DestinationExists => "destination exists".to_string(),
        }
    }
}

/// Terminal state of one document in one run.
#[derive(Debug)]
pub enum Outcome {
    Written { dest: PathBuf, attempts: u32, warnings: Vec<String> },
    Skipped(SkipReason),
    Errored(DocumentError),
    /// Dry run: would have been translated.
    Planned { dest: PathBuf },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub translated: usize,
    pub skipped: usize,
    pub errored: usize,
    pub warnings: usize,
    pub planned: usize,
    pub failures: Vec<(PathBuf, String)>,
}

impl RunSummary {
    fn record(&mut self, source: &Path, outcome: &Outcome) {
        match outcome {
            Outcome::Written { warnings, .. } => {
                self.translated += 1;
                self.warnings += warnings.len();
            }
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::Errored(e) => {
                self.errored += 1;
                self.failures.push((source.to_path_buf(), e.to_string()));
            }
            Outcome::Planned { .. } => self.planned += 1,
        }
    }
}

/// Work decided for one candidate before any network call.
#[derive(Debug)]
enum Plan {
    Skip(SkipReason),
    Translate(Job),
}

#[derive(Debug)]
struct Job {
    text: String,
    dest: PathBuf,
    /// Bytes at `dest` to back up before they are replaced.
    previous: Option<String>,
}

/// Runs one batch over a source tree.
pub struct TranslatorPipeline {
    cfg: PipelineConfig,
    classifier: NeedClassifier,
    progress: ConsoleProgress,
    trace: TraceWriter,
}

impl TranslatorPipeline {
    pub fn new(cfg: PipelineConfig, progress: ConsoleProgress) -> anyhow::Result<Self> {
        let classifier = NeedClassifier::new(&cfg.markers, cfg.max_bytes)?;
        let trace = if cfg.trace_prompts && !cfg.dry_run {
            TraceWriter::new(cfg.trace_dir.clone(), true)?
        } else {
            TraceWriter::disabled()
        };
        Ok(Self {
            cfg,
            classifier,
            progress,
            trace,
        })
    }

    /// Candidate pairs in processing order, truncated to `max_files`.
    pub fn candidates(&self) -> anyhow::Result<Vec<Candidate>> {
        let mut list = self
            .cfg
            .files
            .list_candidates(&self.cfg.source_root, self.cfg.dest_root())?;
        if let Some(n) = self.cfg.max_files {
            list.truncate(n);
        }
        Ok(list)
    }

    /// Decides every candidate without calling the endpoint or writing anything.
    pub fn plan(&self) -> anyhow::Result<RunSummary> {
        let candidates = self.candidates()?;
        let total = candidates.len();
        let mut summary = RunSummary {
            total,
            ..Default::default()
        };
        self.progress
            .info(format!("Dry run: {} document(s) under {}", total, self.cfg.source_root.display()));
        for (i, c) in candidates.iter().enumerate() {
            let outcome = match self.decide(c) {
                Ok(Plan::Skip(r)) => Outcome::Skipped(r),
                Ok(Plan::Translate(job)) => Outcome::Planned { dest: job.dest },
                Err(e) => Outcome::Errored(e),
            };
            self.report(i, total, c, &outcome);
            summary.record(&c.source, &outcome);
        }
        self.progress.summary(
            "Dry run finished",
            &[
                ("would translate", summary.planned.to_string()),
                ("skipped", summary.skipped.to_string()),
                ("errors", summary.errored.to_string()),
            ],
        );
        Ok(summary)
    }

    /// Translates the batch. Only setup failures return `Err`; per-document failures are
    /// counted in the summary.
    pub fn run(
        &self,
        translator: &dyn DocumentTranslator,
        writer: &dyn DocWriter,
        sleeper: &dyn Sleeper,
    ) -> anyhow::Result<RunSummary> {
        if self.cfg.dry_run {
            return self.plan();
        }
        let candidates = self.candidates()?;
        let total = candidates.len();
        let mut summary = RunSummary {
            total,
            ..Default::default()
        };
        self.progress.info(format!(
            "Translating {} -> {}: {} document(s) under {}",
            self.cfg.direction.source.display_name(),
            self.cfg.direction.target.display_name(),
            total,
            self.cfg.source_root.display()
        ));

        let mut attempted = 0usize;
        for (i, c) in candidates.iter().enumerate() {
            let outcome = match self.decide(c) {
                Ok(Plan::Skip(r)) => Outcome::Skipped(r),
                Err(e) => Outcome::Errored(e),
                Ok(Plan::Translate(job)) => {
                    // The wait owed by the previous call is paid only when another call follows.
                    if attempted > 0 {
                        self.throttle(attempted, sleeper);
                    }
                    attempted += 1;
                    self.execute(i, c, job, translator, writer)
                }
            };
            self.report(i, total, c, &outcome);
            summary.record(&c.source, &outcome);
        }

        self.progress.summary(
            "Batch finished",
            &[
                ("translated", summary.translated.to_string()),
                ("skipped", summary.skipped.to_string()),
                ("errors", summary.errored.to_string()),
                ("warnings", summary.warnings.to_string()),
            ],
        );
        for (path, err) in &summary.failures {
            self.progress.info(format!("  failed: {} ({err})", path.display()));
        }
        Ok(summary)
    }

    fn decide(&self, c: &Candidate) -> Result<Plan, DocumentError> {
        let text = std::fs::read_to_string(&c.source).map_err(|source| DocumentError::Read {
            path: c.source.clone(),
            source,
        })?;

        match &self.cfg.mode {
            OutputMode::InPlace => match self.classifier.assess(&text) {
                Assessment::Oversized { bytes, limit } => Ok(Plan::Skip(SkipReason::Oversized { bytes, limit })),
                Assessment::Clean => Ok(Plan::Skip(SkipReason::AlreadyTranslated)),
                hit => {
                    debug!(path = %c.source.display(), marker = ?hit, "needs translation");
                    Ok(Plan::Translate(Job {
                        previous: Some(text.clone()),
                        text,
                        dest: c.source.clone(),
                    }))
                }
            },
            OutputMode::Mirror {
                only_missing,
                overwrite_source_language,
                source_script_threshold,
                ..
            } => {
                if self.classifier.is_oversized(&text) {
                    return Ok(Plan::Skip(SkipReason::Oversized {
                        bytes: text.len(),
                        limit: self.classifier.max_bytes(),
                    }));
                }
                // Unreadable destinations are treated as missing.
                let existing = std::fs::read_to_string(&c.dest)
                    .ok()
                    .filter(|s| !s.trim().is_empty());
                if let Some(current) = existing.as_deref() {
                    if *only_missing {
                        let replace = *overwrite_source_language
                            && is_mostly_language(current, self.cfg.direction.source, *source_script_threshold);
                        if !replace {
                            return Ok(Plan::Skip(SkipReason::DestinationExists));
                        }
                        debug!(dest = %c.dest.display(), "destination still in source language, replacing");
                    }
                }
                Ok(Plan::Translate(Job {
                    text,
                    dest: c.dest.clone(),
                    previous: existing,
                }))
            }
        }
    }

    fn execute(
        &self,
        index: usize,
        c: &Candidate,
        job: Job,
        translator: &dyn DocumentTranslator,
        writer: &dyn DocWriter,
    ) -> Outcome {
        let translation = match translator.translate(&job.text, self.cfg.direction) {
            Ok(t) => t,
            Err(e) => return Outcome::Errored(e.into()),
        };

        if let Err(e) = self
            .trace
            .write_doc_text(index + 1, &c.source, "prompt", &translation.prompt)
            .and_then(|_| self.trace.write_doc_text(index + 1, &c.source, "response", &translation.raw))
        {
            warn!(path = %c.source.display(), error = %e, "trace write failed");
        }

        let report = quality_report(
            &job.text,
            &translation.text,
            self.cfg.direction.target,
            self.cfg.short_output_ratio,
        );
        if !report.is_clean() {
            warn!(path = %c.source.display(), "{}", report.render_line());
        }

        let written = match job.previous.as_deref() {
            Some(previous) => write_with_backup(
                writer,
                &job.dest,
                previous,
                &translation.text,
                &self.cfg.backup_suffix,
            )
            .map_err(|e| match e {
                ReplaceError::Backup(source) => DocumentError::Backup {
                    path: job.dest.clone(),
                    source,
                },
                ReplaceError::Write(source) => DocumentError::Write {
                    path: job.dest.clone(),
                    source,
                },
            }),
            None => writer
                .write(&job.dest, &translation.text)
                .map_err(|source| DocumentError::Write {
                    path: job.dest.clone(),
                    source,
                }),
        };

        match written {
            Ok(()) => Outcome::Written {
                dest: job.dest,
                attempts: translation.attempts,
                warnings: report.flags,
            },
            Err(e) => Outcome::Errored(e),
        }
    }

    /// Wait after the `attempted`-th call: the request delay, plus the batch pause after every
    /// `batch_size` calls.
    fn throttle(&self, attempted: usize, sleeper: &dyn Sleeper) {
        pause(sleeper, self.cfg.request_delay);
        if attempted % self.cfg.batch_size.max(1) == 0 && !self.cfg.batch_pause.is_zero() {
            info!(pause_secs = self.cfg.batch_pause.as_secs_f64(), "batch pause");
            pause(sleeper, self.cfg.batch_pause);
        }
    }

    fn report(&self, index: usize, total: usize, c: &Candidate, outcome: &Outcome) {
        let rel = c
            .source
            .strip_prefix(&self.cfg.source_root)
            .unwrap_or(&c.source)
            .display()
            .to_string();
        let line = match outcome {
            Outcome::Written { dest, attempts, .. } => {
                info!(source = %c.source.display(), dest = %dest.display(), attempts, "translated");
                format!("{rel}: translated")
            }
            Outcome::Skipped(r) => {
                debug!(source = %c.source.display(), reason = %r.describe(), "skipped");
                format!("{rel}: skipped, {}", r.describe())
            }
            Outcome::Errored(e) => {
                let attempts = match e {
                    DocumentError::Translate(t) => t.attempts(),
                    _ => 0,
                };
                error!(source = %c.source.display(), attempts, error = %e, "document failed");
                format!("{rel}: error, {e}")
            }
            Outcome::Planned { dest } => format!("{rel}: would translate -> {}", dest.display()),
        };
        self.progress.progress("doc", index + 1, total, line);
    }
}

fn pause(sleeper: &dyn Sleeper, d: Duration) {
    if !d.is_zero() {
        sleeper.sleep(d);
    }
}
