/*!
 * # cuegate - subtitle translation with reconciliation and a quality gate
 *
 * A Rust library for translating timed subtitle segments through unreliable
 * AI providers and validating the result before it is accepted.
 *
 * ## Features
 *
 * - Batching under a segment count and an estimated token budget
 * - Id-tagged requests: replies are matched by id, never by position
 * - Bounded retry of missing ids with identity fallback to the source text
 * - Translation through various AI providers:
 *   - Ollama (local LLM)
 *   - OpenAI API and OpenAI-compatible servers (LM Studio)
 *   - Anthropic API
 * - Quality gate for overlaps, reading speed and on-screen duration
 * - SRT and JSON segment input, SRT output
 *
 * ## Architecture
 *
 * - `app_config`: Configuration management
 * - `subtitle_processor`: Segments, cues and subtitle file handling
 * - `translation`: The translation core:
 *   - `translation::batch`: Segment batching
 *   - `translation::reconcile`: Reply reconciliation with bounded retry
 *   - `translation::pipeline`: Whole-job orchestration
 * - `validation`: Quality gate over the translated cues
 * - `providers`: Translation backends behind the `Translator` trait
 * - `app_controller`: File-level driver used by the CLI
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]
// Test names follow test_subject_condition_shouldOutcome
#![cfg_attr(test, allow(non_snake_case))]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod language_utils;
pub mod providers;
pub mod subtitle_processor;
pub mod translation;
pub mod validation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, ProviderError, SubtitleError, TranslationError};
pub use language_utils::{get_language_name, normalize_to_part2t};
pub use providers::{TranslatedItem, TranslationItem, Translator};
pub use subtitle_processor::{Cue, Segment, SubtitleCollection};
pub use translation::{JobOutput, TranslationPipeline, TranslationResult, batch_segments, reconcile};
pub use validation::{GateResult, GateThresholds, validate};
