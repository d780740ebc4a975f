use thiserror::Error;
use tracing::{debug, warn};

use crate::lang::Direction;
use crate::models::{ChatError, ChatModel};
use crate::sanitize::sanitize;

use super::prompts::PromptBuilder;
use super::retry::{RetryPolicy, Sleeper};

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: ChatError },
}

impl TranslateError {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// A finished translation: sanitized text plus what produced it.
#[derive(Clone, Debug)]
pub struct Translation {
    pub text: String,
    pub raw: String,
    pub prompt: String,
    pub attempts: u32,
}

/// Turns a document body into its translation.
pub trait DocumentTranslator {
    fn translate(&self, body: &str, direction: Direction) -> Result<Translation, TranslateError>;
}

/// Prompt, chat call with retries, then sanitize.
pub struct RemoteTranslator<'a, M: ChatModel> {
    model: M,
    prompts: PromptBuilder,
    retry: RetryPolicy,
    max_tokens: u32,
    sleeper: &'a dyn Sleeper,
}

impl<'a, M: ChatModel> RemoteTranslator<'a, M> {
    pub fn new(
        model: M,
        prompts: PromptBuilder,
        retry: RetryPolicy,
        max_tokens: u32,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            model,
            prompts,
            retry,
            max_tokens,
            sleeper,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Tiny round trip used to check the endpoint before a batch.
    pub fn ping(&self) -> Result<String, TranslateError> {
        self.retry
            .run(
                self.sleeper,
                |_| self.model.chat(None, "Reply with: OK", 10),
                |attempt, e| warn!(attempt, error = %e, "connection check failed"),
            )
            .map_err(|ex| TranslateError::Exhausted {
                attempts: ex.attempts,
                last: ex.last_error,
            })
    }
}

impl<M: ChatModel> DocumentTranslator for RemoteTranslator<'_, M> {
    fn translate(&self, body: &str, direction: Direction) -> Result<Translation, TranslateError> {
        let switched;
        let prompts = if self.prompts.direction() == direction {
            &self.prompts
        } else {
            debug!(configured = %self.prompts.direction(), requested = %direction, "using built-in system prompt and glossary for requested direction");
            switched = self.prompts.for_direction(direction);
            &switched
        };
        let prompt = prompts.build(body);
        let system = prompts.system_prompt();
        let max_attempts = self.retry.max_attempts;

        let mut attempts_used = 0u32;
        let raw = self
            .retry
            .run(
                self.sleeper,
                |attempt| {
                    attempts_used = attempt;
                    self.model.chat(Some(system), &prompt, self.max_tokens)
                },
                |attempt, e| {
                    warn!(attempt, max_attempts, model = self.model.name(), error = %e, "translation attempt failed")
                },
            )
            .map_err(|ex| TranslateError::Exhausted {
                attempts: ex.attempts,
                last: ex.last_error,
            })?;

        Ok(Translation {
            text: sanitize(&raw),
            raw,
            prompt,
            attempts: attempts_used,
        })
    }
}
