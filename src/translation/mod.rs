/*!
 * Subtitle translation core.
 *
 * - `batch`: Splits segments into size-bounded batches
 * - `prompts`: Id-tagged request rendering and tolerant reply parsing
 * - `rate_limit`: Request pacing handle shared between jobs
 * - `cancel`: Cooperative job cancellation
 * - `reconcile`: Aligns translator replies to requested ids with bounded retry
 * - `pipeline`: Runs a whole job from segments to gated cues
 */

pub mod batch;
pub mod cancel;
pub mod pipeline;
pub mod prompts;
pub mod rate_limit;
pub mod reconcile;

// Re-export main types for easier usage
pub use self::batch::{Batch, BatchLimits, CharTokenEstimator, SizeEstimator, batch_segments};
pub use self::cancel::CancellationFlag;
pub use self::pipeline::{JobOutput, JobStats, PipelineConfig, TranslationPipeline};
pub use self::prompts::PromptTemplate;
pub use self::rate_limit::RateLimiter;
pub use self::reconcile::{
    BackoffStrategy, EmptyTranslationPolicy, Provenance, ReconcileConfig, Reconciler, ResolvedEntry,
    TranslationResult, reconcile,
};
