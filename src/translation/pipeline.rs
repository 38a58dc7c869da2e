/*!
 * Translation job pipeline.
 *
 * Runs one job end to end: batch the segments, reconcile each batch in
 * order, merge the translations back into timed cues and run the quality
 * gate over the result. Batches are processed sequentially; cancellation is
 * checked before every batch and between retry rounds.
 */

use std::collections::HashSet;
use std::time::{Duration, Instant};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::errors::TranslationError;
use crate::providers::Translator;
use crate::subtitle_processor::{Cue, Segment};
use crate::validation::quality_gate::{GateResult, GateThresholds, QualityGate};

use super::batch::{BatchLimits, CharTokenEstimator, SizeEstimator, batch_with_limits};
use super::cancel::CancellationFlag;
use super::rate_limit::RateLimiter;
use super::reconcile::{Provenance, ReconcileConfig, Reconciler, TranslationResult};

/// Settings for one translation job
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    pub batching: BatchLimits,
    pub reconcile: ReconcileConfig,
    pub quality_gate: GateThresholds,
}

/// Counters collected over a job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStats {
    /// Batches processed
    pub batches: usize,
    /// Translator requests issued, retries included
    pub requests: usize,
    /// Segments resolved on the first request
    pub direct: usize,
    /// Segments resolved by a retry round
    pub retried: usize,
    /// Segments that kept their source text
    pub fallback: usize,
    /// Ids returned by the translator that were never requested
    pub discarded: usize,
    /// Wall-clock duration of the job
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Everything a finished job produces
#[derive(Debug, Clone)]
pub struct JobOutput {
    /// One cue per input segment, in input order
    pub cues: Vec<Cue>,
    /// Per-batch reconciliation results, in batch order
    pub results: Vec<TranslationResult>,
    /// Quality gate verdict over `cues`
    pub gate: GateResult,
    pub stats: JobStats,
}

impl JobOutput {
    /// Ids of all segments that fell back to their source text
    pub fn fallback_ids(&self) -> Vec<usize> {
        self.results.iter().flat_map(|r| r.fallback_ids()).collect()
    }
}

/// Translation pipeline bound to one translator
pub struct TranslationPipeline<'t> {
    translator: &'t dyn Translator,
    config: PipelineConfig,
    size_estimator: Box<dyn SizeEstimator + Send + Sync + 't>,
    rate_limiter: RateLimiter,
    cancellation: CancellationFlag,
}

impl<'t> TranslationPipeline<'t> {
    pub fn new(translator: &'t dyn Translator, config: PipelineConfig) -> Self {
        Self {
            translator,
            config,
            size_estimator: Box::new(CharTokenEstimator::default()),
            rate_limiter: RateLimiter::unlimited(),
            cancellation: CancellationFlag::new(),
        }
    }

    /// Use a custom size estimator for batching
    pub fn with_size_estimator<E>(mut self, size_estimator: E) -> Self
    where
        E: SizeEstimator + Send + Sync + 't,
    {
        self.size_estimator = Box::new(size_estimator);
        self
    }

    /// Share a rate limiter with other jobs using the same provider
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Stop the job once this flag is set
    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Flag that cancels this pipeline's jobs
    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }

    /// Run a job without progress reporting
    pub async fn run(&self, segments: &[Segment], target_language: &str) -> Result<JobOutput, TranslationError> {
        self.run_with_progress(segments, target_language, |_, _| {}).await
    }

    /// Run a job, calling `progress_callback(completed_batches, total_batches)`
    /// after each batch.
    pub async fn run_with_progress<F>(
        &self,
        segments: &[Segment],
        target_language: &str,
        progress_callback: F,
    ) -> Result<JobOutput, TranslationError>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let started = Instant::now();
        check_unique_ids(segments)?;

        let batches = batch_with_limits(segments, &self.config.batching, self.size_estimator.as_ref());
        let total = batches.len();

        let reconciler = Reconciler::new(self.translator, self.config.reconcile.clone())
            .with_rate_limiter(self.rate_limiter.clone())
            .with_cancellation(self.cancellation.clone());

        let mut results = Vec::with_capacity(total);
        let mut cues = Vec::with_capacity(segments.len());
        let mut stats = JobStats::default();

        for batch in &batches {
            if self.cancellation.is_cancelled() {
                info!("Job cancelled after {} of {} batches", batch.index, total);
                return Err(TranslationError::Cancelled {
                    completed_batches: batch.index,
                });
            }

            let result = reconciler.reconcile(batch, target_language).await?;

            for (segment, entry) in batch.segments.iter().zip(&result.entries) {
                cues.push(Cue::from_segment(segment, entry.text.clone()));
            }

            stats.batches += 1;
            stats.requests += result.requests;
            stats.direct += result.count(Provenance::Direct);
            stats.retried += result.count(Provenance::Retried);
            stats.fallback += result.count(Provenance::Fallback);
            stats.discarded += result.discarded_ids.len();
            results.push(result);

            progress_callback(batch.index + 1, total);
        }

        let gate = QualityGate::new(self.config.quality_gate).check(&cues);
        stats.elapsed = started.elapsed();

        debug!(
            "Job finished: {} cues, {} requests, {} retried, {} fallback in {:?}",
            cues.len(),
            stats.requests,
            stats.retried,
            stats.fallback,
            stats.elapsed
        );

        Ok(JobOutput {
            cues,
            results,
            gate,
            stats,
        })
    }
}

/// Reject segment lists whose ids are not unique
fn check_unique_ids(segments: &[Segment]) -> Result<(), TranslationError> {
    let mut seen = HashSet::with_capacity(segments.len());
    for segment in segments {
        if !seen.insert(segment.id) {
            return Err(TranslationError::InvalidInput(format!(
                "duplicate segment id {}",
                segment.id
            )));
        }
    }
    Ok(())
}
