/*!
 * Segment batching.
 *
 * Splits an ordered segment list into contiguous batches bounded by a
 * segment count and an estimated size budget. Batching never fails: a
 * segment that alone exceeds the size budget is sent as its own batch.
 */

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::subtitle_processor::Segment;

/// Approximate cost metric used for batch sizing decisions.
///
/// Units are opaque; they are only compared against the configured budget.
pub trait SizeEstimator {
    /// Estimate the cost of sending these texts together in one request
    fn estimate(&self, texts: &[&str]) -> usize;
}

impl<F> SizeEstimator for F
where
    F: Fn(&[&str]) -> usize,
{
    fn estimate(&self, texts: &[&str]) -> usize {
        self(texts)
    }
}

/// Token estimator based on character counts.
///
/// Roughly one token per `chars_per_token` characters, plus a fixed overhead
/// per item for the id-tagged JSON wrapping around each text.
#[derive(Debug, Clone, Copy)]
pub struct CharTokenEstimator {
    /// Characters counted as one token
    pub chars_per_token: usize,
    /// Tokens added per item for the request envelope
    pub per_item_overhead: usize,
}

impl Default for CharTokenEstimator {
    fn default() -> Self {
        Self {
            chars_per_token: 4,
            per_item_overhead: 6,
        }
    }
}

impl SizeEstimator for CharTokenEstimator {
    fn estimate(&self, texts: &[&str]) -> usize {
        let divisor = self.chars_per_token.max(1);
        texts
            .iter()
            .map(|t| t.chars().count().div_ceil(divisor) + self.per_item_overhead)
            .sum()
    }
}

/// Batch size limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchLimits {
    /// Upper bound on segments per batch
    #[serde(default = "default_max_segments_per_batch")]
    pub max_segments_per_batch: usize,

    /// Upper bound on the estimated size of one batch
    #[serde(default = "default_max_tokens_per_batch")]
    pub max_tokens_per_batch: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_segments_per_batch: default_max_segments_per_batch(),
            max_tokens_per_batch: default_max_tokens_per_batch(),
        }
    }
}

fn default_max_segments_per_batch() -> usize {
    25
}

fn default_max_tokens_per_batch() -> usize {
    4500
}

/// A contiguous, ordered run of segments sent together to the translator
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<'a> {
    /// Position of this batch in the job (0-based)
    pub index: usize,

    /// Segments in original order
    pub segments: &'a [Segment],

    /// Size estimate at the time the batch was closed
    pub estimated_size: usize,

    /// True when a single segment exceeds the size budget on its own
    pub oversized: bool,
}

impl<'a> Batch<'a> {
    /// Segment ids in original order
    pub fn ids(&self) -> Vec<usize> {
        self.segments.iter().map(|s| s.id).collect()
    }

    /// Number of segments in the batch
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the batch holds no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

fn texts_of(segments: &[Segment]) -> Vec<&str> {
    segments.iter().map(|s| s.text.as_str()).collect()
}

/// Partition `segments` into batches.
///
/// Each candidate batch takes up to `max_count` segments and is shrunk from
/// the back until the estimate fits `max_tokens` or a single segment remains.
/// Removed segments start the next batch. The concatenation of all batches is
/// exactly the input sequence.
pub fn batch_segments<'a, E>(
    segments: &'a [Segment],
    max_count: usize,
    max_tokens: usize,
    size_estimator: &E,
) -> Vec<Batch<'a>>
where
    E: SizeEstimator + ?Sized,
{
    let max_count = max_count.max(1);
    let mut batches = Vec::new();
    let mut start = 0;

    while start < segments.len() {
        let mut end = (start + max_count).min(segments.len());

        let estimated_size = loop {
            let estimate = size_estimator.estimate(&texts_of(&segments[start..end]));
            if estimate <= max_tokens || end - start == 1 {
                break estimate;
            }
            end -= 1;
        };

        let oversized = estimated_size > max_tokens;
        if oversized {
            warn!(
                "Segment {} alone exceeds the batch budget ({} > {}), sending it on its own",
                segments[start].id, estimated_size, max_tokens
            );
        }

        debug!(
            "Batch {}: segments {}..={} ({} items, size {})",
            batches.len() + 1,
            segments[start].id,
            segments[end - 1].id,
            end - start,
            estimated_size
        );

        batches.push(Batch {
            index: batches.len(),
            segments: &segments[start..end],
            estimated_size,
            oversized,
        });
        start = end;
    }

    info!(
        "Split {} segments into {} batches (max {} per batch, budget {})",
        segments.len(),
        batches.len(),
        max_count,
        max_tokens
    );

    batches
}

/// Partition `segments` using configured limits
pub fn batch_with_limits<'a, E>(
    segments: &'a [Segment],
    limits: &BatchLimits,
    size_estimator: &E,
) -> Vec<Batch<'a>>
where
    E: SizeEstimator + ?Sized,
{
    batch_segments(
        segments,
        limits.max_segments_per_batch,
        limits.max_tokens_per_batch,
        size_estimator,
    )
}
