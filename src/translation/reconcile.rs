/*!
 * Translation reconciliation.
 *
 * Drives the translator for one batch and aligns its replies back to the
 * requested segment ids. Replies are matched by id, never by position, so
 * reordered, partial or over-complete replies cannot shift translations onto
 * the wrong segment. Missing ids are re-requested on their own (with their
 * original ids) for a bounded number of rounds; whatever is still missing
 * falls back to the source text.
 */

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::TranslationError;
use crate::providers::{TranslationItem, Translator};
use crate::subtitle_processor::Segment;

use super::batch::Batch;
use super::cancel::CancellationFlag;
use super::rate_limit::RateLimiter;

/// Where a resolved translation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Returned by the first request for the batch
    Direct,
    /// Returned by a retry round
    Retried,
    /// Never returned; the source text is used instead
    Fallback,
}

/// Whether an empty (or whitespace-only) translation resolves its id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyTranslationPolicy {
    /// Accept the empty text as the translation
    #[default]
    Present,
    /// Treat the id as missing so it is retried
    Missing,
}

/// Delay growth between retry rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// Same delay before every retry
    #[default]
    Fixed,
    /// Delay doubles with every retry
    Exponential,
}

/// Retry and acceptance settings for reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Retry rounds allowed per batch for missing ids
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Base delay before a retry round, in milliseconds (0 = none)
    #[serde(default)]
    pub retry_delay_ms: u64,

    /// How the delay grows between retry rounds
    #[serde(default)]
    pub retry_backoff: BackoffStrategy,

    /// How empty translations are treated
    #[serde(default)]
    pub empty_translation: EmptyTranslationPolicy,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: 0,
            retry_backoff: BackoffStrategy::default(),
            empty_translation: EmptyTranslationPolicy::default(),
        }
    }
}

fn default_max_retries() -> usize {
    3
}

impl ReconcileConfig {
    /// Delay before the given retry (1-based)
    pub fn delay_before_retry(&self, retry: usize) -> Duration {
        let base = self.retry_delay_ms;
        let ms = match self.retry_backoff {
            BackoffStrategy::Fixed => base,
            BackoffStrategy::Exponential => {
                let shift = retry.saturating_sub(1).min(16) as u32;
                base.saturating_mul(1u64 << shift)
            }
        };
        Duration::from_millis(ms)
    }
}

/// One segment's final text within a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntry {
    pub id: usize,
    pub text: String,
    pub provenance: Provenance,
}

/// Reconciled translations for one batch, in original segment order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    /// Position of the batch in the job
    pub batch_index: usize,

    /// One entry per requested segment, in original order
    pub entries: Vec<ResolvedEntry>,

    /// Translator requests issued for this batch
    pub requests: usize,

    /// Ids returned by the translator that were never requested
    pub discarded_ids: Vec<usize>,
}

impl TranslationResult {
    /// Text for a segment id
    pub fn get(&self, id: usize) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.text.as_str())
    }

    /// Provenance for a segment id
    pub fn provenance(&self, id: usize) -> Option<Provenance> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.provenance)
    }

    /// Texts in original segment order
    pub fn texts(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.text.as_str()).collect()
    }

    /// Number of entries with the given provenance
    pub fn count(&self, provenance: Provenance) -> usize {
        self.entries.iter().filter(|e| e.provenance == provenance).count()
    }

    /// Ids that fell back to their source text
    pub fn fallback_ids(&self) -> Vec<usize> {
        self.entries
            .iter()
            .filter(|e| e.provenance == Provenance::Fallback)
            .map(|e| e.id)
            .collect()
    }

    /// Whether every id was translated by the provider
    pub fn is_complete(&self) -> bool {
        self.count(Provenance::Fallback) == 0
    }
}

/// Drives the translator for one batch at a time
#[derive(Debug)]
pub struct Reconciler<'t> {
    translator: &'t dyn Translator,
    config: ReconcileConfig,
    rate_limiter: RateLimiter,
    cancellation: Option<CancellationFlag>,
}

impl<'t> Reconciler<'t> {
    pub fn new(translator: &'t dyn Translator, config: ReconcileConfig) -> Self {
        Self {
            translator,
            config,
            rate_limiter: RateLimiter::unlimited(),
            cancellation: None,
        }
    }

    /// Pace every translator request through this limiter
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Stop between retry rounds once this flag is set
    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(|c| c.is_cancelled())
    }

    /// Reconcile one batch.
    ///
    /// Only a provider failure or cancellation is an error. Missing, extra,
    /// duplicated or reordered ids are always resolved, so the result has
    /// exactly one entry per segment of the batch.
    pub async fn reconcile(
        &self,
        batch: &Batch<'_>,
        target_language: &str,
    ) -> Result<TranslationResult, TranslationError> {
        let requested: HashSet<usize> = batch.segments.iter().map(|s| s.id).collect();
        let mut resolved: HashMap<usize, (String, Provenance)> = HashMap::with_capacity(batch.len());
        let mut discarded_ids = Vec::new();

        let mut pending: Vec<&Segment> = batch.segments.iter().collect();
        let mut previous_missing: Option<Vec<usize>> = None;
        let mut retries_left = self.config.max_retries;
        let mut requests = 0;

        while !pending.is_empty() {
            if self.is_cancelled() {
                return Err(TranslationError::Cancelled {
                    completed_batches: batch.index,
                });
            }

            let is_retry = requests > 0;
            if is_retry {
                let delay = self.config.delay_before_retry(requests);
                debug!(
                    "Batch {}: retry {} for {} missing id(s) {:?}",
                    batch.index + 1,
                    requests,
                    pending.len(),
                    pending.iter().map(|s| s.id).collect::<Vec<_>>()
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }

            let items: Vec<TranslationItem> = pending
                .iter()
                .map(|s| TranslationItem::new(s.id, s.text.clone()))
                .collect();
            let pending_ids: HashSet<usize> = items.iter().map(|i| i.id).collect();

            self.rate_limiter.acquire().await;
            let response = self.translator.translate_batch(&items, target_language).await?;
            requests += 1;

            let provenance = if is_retry { Provenance::Retried } else { Provenance::Direct };

            for item in response {
                if !requested.contains(&item.id) {
                    warn!(
                        "Batch {}: discarding id {} returned by {} but never requested",
                        batch.index + 1,
                        item.id,
                        self.translator.name()
                    );
                    discarded_ids.push(item.id);
                    continue;
                }
                if !pending_ids.contains(&item.id) || resolved.contains_key(&item.id) {
                    debug!("Batch {}: ignoring repeated translation for id {}", batch.index + 1, item.id);
                    continue;
                }
                if self.config.empty_translation == EmptyTranslationPolicy::Missing
                    && item.translation.trim().is_empty()
                {
                    debug!("Batch {}: empty translation for id {} counts as missing", batch.index + 1, item.id);
                    continue;
                }
                resolved.insert(item.id, (item.translation, provenance));
            }

            let missing: Vec<usize> = batch
                .segments
                .iter()
                .map(|s| s.id)
                .filter(|id| !resolved.contains_key(id))
                .collect();

            if missing.is_empty() {
                break;
            }
            if retries_left == 0 {
                debug!("Batch {}: retry budget exhausted", batch.index + 1);
                break;
            }
            if previous_missing.as_ref() == Some(&missing) {
                warn!(
                    "Batch {}: provider keeps omitting {:?}, giving up",
                    batch.index + 1,
                    missing
                );
                break;
            }

            retries_left -= 1;
            pending = batch
                .segments
                .iter()
                .filter(|s| missing.contains(&s.id))
                .collect();
            previous_missing = Some(missing);
        }

        let entries: Vec<ResolvedEntry> = batch
            .segments
            .iter()
            .map(|segment| match resolved.remove(&segment.id) {
                Some((text, provenance)) => ResolvedEntry {
                    id: segment.id,
                    text,
                    provenance,
                },
                None => ResolvedEntry {
                    id: segment.id,
                    text: segment.text.clone(),
                    provenance: Provenance::Fallback,
                },
            })
            .collect();

        let result = TranslationResult {
            batch_index: batch.index,
            entries,
            requests,
            discarded_ids,
        };

        let fallback_ids = result.fallback_ids();
        if !fallback_ids.is_empty() {
            warn!(
                "Batch {}: {} segment(s) kept their source text after {} request(s): {:?}",
                batch.index + 1,
                fallback_ids.len(),
                requests,
                fallback_ids
            );
        }

        Ok(result)
    }
}

/// Reconcile one batch with default settings and the given retry budget
pub async fn reconcile(
    batch: &Batch<'_>,
    target_language: &str,
    translator: &dyn Translator,
    max_retries: usize,
) -> Result<TranslationResult, TranslationError> {
    let config = ReconcileConfig {
        max_retries,
        ..ReconcileConfig::default()
    };
    Reconciler::new(translator, config)
        .reconcile(batch, target_language)
        .await
}
