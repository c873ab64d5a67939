// Concurrent batch translation with per-batch failure isolation
//
// Cues are split into fixed-size batches that are all dispatched at once
// and gated by a semaphore. A batch that fails or comes back short keeps
// source text where translations are missing. Results are reassembled by
// batch index, so output order matches input order however calls complete.

use futures::FutureExt;
use futures::future::join_all;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{BatchTranslator, ORIGINAL_LANGUAGE};
use crate::config::TranslateConfig;
use crate::error::{Result, SubfuseError};
use crate::progress::StageReporter;
use crate::subtitle::Cue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub batch_size: usize,
    pub concurrency_limit: usize,
    /// Extra attempts for a failed or short batch
    pub retries: u32,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from(&TranslateConfig::default())
    }
}

impl From<&TranslateConfig> for BatchOptions {
    fn from(config: &TranslateConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            concurrency_limit: config.concurrency_limit,
            retries: config.batch_retries,
        }
    }
}

impl BatchOptions {
    /// Cap concurrency at what the provider accepts
    pub fn with_provider_limit(mut self, provider_limit: usize) -> Self {
        self.concurrency_limit = self.concurrency_limit.min(provider_limit);
        self
    }
}

/// Translated cues plus how the batches went
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOutcome {
    pub cues: Vec<Cue>,
    pub batches: usize,
    pub failed_batches: usize,
    pub short_batches: usize,
}

impl TranslationOutcome {
    fn unchanged(cues: Vec<Cue>) -> Self {
        Self {
            cues,
            batches: 0,
            failed_batches: 0,
            short_batches: 0,
        }
    }

    /// Whether any batch fell back to source text
    pub fn is_degraded(&self) -> bool {
        self.failed_batches > 0 || self.short_batches > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchStatus {
    Complete,
    Short,
    Failed,
}

pub struct BatchOrchestrator {
    options: BatchOptions,
}

impl BatchOrchestrator {
    pub fn new(options: BatchOptions) -> Self {
        Self { options }
    }

    /// Translate `cues` into `target_language`.
    ///
    /// Never fails on batch errors. `progress` receives one update per
    /// finished batch and a final 100% once everything is reassembled.
    pub async fn translate(
        &self,
        cues: Vec<Cue>,
        target_language: &str,
        translator: &dyn BatchTranslator,
        progress: Option<&StageReporter>,
    ) -> TranslationOutcome {
        if target_language == ORIGINAL_LANGUAGE || cues.is_empty() {
            debug!("Skipping translation for target '{}' ({} cues)", target_language, cues.len());
            return TranslationOutcome::unchanged(cues);
        }

        let batch_size = self.options.batch_size.max(1);
        let concurrency = self.options.concurrency_limit.max(1);
        let batches: Vec<&[Cue]> = cues.chunks(batch_size).collect();
        let total_batches = batches.len();

        info!(
            "Translating {} cues to {} in {} batches (concurrency {})",
            cues.len(),
            target_language,
            total_batches,
            concurrency
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let completed = AtomicUsize::new(0);

        let tasks = batches.iter().enumerate().map(|(index, batch)| {
            let semaphore = semaphore.clone();
            let completed = &completed;
            async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) => self.run_batch(index, batch, target_language, translator).await,
                    Err(e) => Err(SubfuseError::PartialBatchFailure {
                        batch: index + 1,
                        reason: e.to_string(),
                    }),
                };
                let merged = merge_batch(index, batch, result);

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(reporter) = progress {
                    reporter.report(
                        done as f32 * 100.0 / total_batches as f32,
                        format!("Translated batch {}/{}", done, total_batches),
                    );
                }
                merged
            }
        });

        // join_all yields in input order, which is batch order
        let results = join_all(tasks).await;

        let mut outcome = TranslationOutcome {
            cues: Vec::with_capacity(cues.len()),
            batches: total_batches,
            failed_batches: 0,
            short_batches: 0,
        };
        for (batch_cues, status) in results {
            match status {
                BatchStatus::Complete => {}
                BatchStatus::Short => outcome.short_batches += 1,
                BatchStatus::Failed => outcome.failed_batches += 1,
            }
            outcome.cues.extend(batch_cues);
        }

        if let Some(reporter) = progress {
            reporter.report(
                100.0,
                format!("Translated {}/{} segments", outcome.cues.len(), cues.len()),
            );
        }
        if outcome.is_degraded() {
            warn!(
                "Translation degraded: {} failed and {} short of {} batches",
                outcome.failed_batches, outcome.short_batches, total_batches
            );
        }

        outcome
    }

    /// Call the translator for one batch, retrying failed or short answers
    async fn run_batch(
        &self,
        index: usize,
        batch: &[Cue],
        target_language: &str,
        translator: &dyn BatchTranslator,
    ) -> Result<Vec<String>> {
        let texts: Vec<String> = batch.iter().map(|cue| cue.text.clone()).collect();
        let attempts = self.options.retries + 1;
        let mut last = None;

        for attempt in 1..=attempts {
            debug!("Batch {} attempt {}/{} ({} texts)", index + 1, attempt, attempts, texts.len());

            // A panicking translator counts as a failed batch
            let result = AssertUnwindSafe(translator.translate_batch(&texts, target_language))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(SubfuseError::PartialBatchFailure {
                        batch: index + 1,
                        reason: "translator panicked".to_string(),
                    })
                });

            match &result {
                Ok(translations) if translations.len() >= texts.len() => return result,
                Ok(translations) => debug!(
                    "Batch {} returned {} of {} translations",
                    index + 1,
                    translations.len(),
                    texts.len()
                ),
                Err(e) => debug!("Batch {} attempt {} failed: {}", index + 1, attempt, e),
            }
            last = Some(result);
        }

        last.unwrap_or_else(|| {
            Err(SubfuseError::PartialBatchFailure {
                batch: index + 1,
                reason: "no attempts made".to_string(),
            })
        })
    }
}

/// Pair translated texts with the batch's cues positionally
fn merge_batch(index: usize, batch: &[Cue], result: Result<Vec<String>>) -> (Vec<Cue>, BatchStatus) {
    match result {
        Ok(translations) => {
            let status = if translations.len() < batch.len() {
                warn!(
                    "Batch {} returned {} translations for {} texts, keeping source for the rest",
                    index + 1,
                    translations.len(),
                    batch.len()
                );
                BatchStatus::Short
            } else {
                if translations.len() > batch.len() {
                    debug!(
                        "Batch {} returned {} extra translations, discarding",
                        index + 1,
                        translations.len() - batch.len()
                    );
                }
                BatchStatus::Complete
            };

            let mut translations = translations.into_iter();
            let cues = batch
                .iter()
                .map(|cue| match translations.next() {
                    Some(text) => Cue::new(cue.start, cue.end, text),
                    None => cue.clone(),
                })
                .collect();
            (cues, status)
        }
        Err(e) => {
            let failure = match e {
                failure @ SubfuseError::PartialBatchFailure { .. } => failure,
                other => SubfuseError::PartialBatchFailure {
                    batch: index + 1,
                    reason: other.to_string(),
                },
            };
            warn!("{}, keeping source text", failure);
            (batch.to_vec(), BatchStatus::Failed)
        }
    }
}

/// Translate cues with explicit batching parameters and no progress reporting
pub async fn translate_cues(
    cues: Vec<Cue>,
    target_language: &str,
    batch_size: usize,
    concurrency_limit: usize,
    translator: &dyn BatchTranslator,
) -> Vec<Cue> {
    let orchestrator = BatchOrchestrator::new(BatchOptions {
        batch_size,
        concurrency_limit,
        retries: 0,
    });
    orchestrator
        .translate(cues, target_language, translator, None)
        .await
        .cues
}
