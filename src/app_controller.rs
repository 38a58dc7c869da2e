use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use serde::Serialize;

use crate::app_config::Config;
use crate::language_utils;
use crate::providers::{self, Translator};
use crate::subtitle_processor::{Cue, Segment, SubtitleCollection};
use crate::translation::{CancellationFlag, JobOutput, JobStats, RateLimiter, TranslationPipeline};
use crate::validation::quality_gate::{self, GateResult, GateThresholds};

// @module: Application controller for subtitle processing

/// Summary of one translated file, suitable for a JSON report
#[derive(Debug, Clone, Serialize)]
pub struct TranslationReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub target_language: String,
    pub provider: String,
    pub stats: JobStats,
    pub fallback_ids: Vec<usize>,
    pub gate: GateResult,
}

/// Main application controller for subtitle translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Translation backend
    translator: Box<dyn Translator>,
    // @field: Request pacing for the configured provider
    rate_limiter: RateLimiter,
    // @field: Cancels the running job
    cancellation: CancellationFlag,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let translator = providers::from_config(&config.translation)?;
        Ok(Self::with_translator(config, translator))
    }

    /// Create a controller around an existing translator
    pub fn with_translator(config: Config, translator: Box<dyn Translator>) -> Self {
        let rate_limiter = RateLimiter::from_rate_limit(config.translation.get_rate_limit());
        Self {
            config,
            translator,
            rate_limiter,
            cancellation: CancellationFlag::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Flag that cancels the running job between batches
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    /// Output path for a translated file: `<stem>.<lang>.srt` next to the input
    pub fn default_output_path(input_file: &Path, target_language: &str) -> PathBuf {
        let stem = input_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "subtitles".to_string());
        let file_name = format!("{}.{}.srt", stem, target_language.to_lowercase());
        match input_file.parent() {
            Some(parent) => parent.join(file_name),
            None => PathBuf::from(file_name),
        }
    }

    /// Translate one subtitle file.
    ///
    /// Returns `None` when the output already exists and `force_overwrite` is
    /// not set. A failed quality gate is part of the report, not an error.
    pub async fn run(
        &self,
        input_file: &Path,
        output_file: Option<PathBuf>,
        force_overwrite: bool,
    ) -> Result<Option<TranslationReport>> {
        if !input_file.is_file() {
            return Err(anyhow!("Input file does not exist: {}", input_file.display()));
        }

        let target_language = &self.config.target_language;
        let output_file = output_file.unwrap_or_else(|| Self::default_output_path(input_file, target_language));

        if output_file.exists() && !force_overwrite {
            warn!(
                "Output file already exists: {}. Use -f to force overwrite.",
                output_file.display()
            );
            return Ok(None);
        }

        let subtitles = SubtitleCollection::load(input_file)?;
        let language_name =
            language_utils::get_language_name(target_language).unwrap_or_else(|_| target_language.clone());
        info!(
            "{}: {} - {} → {} ({} segments)",
            input_file.display(),
            self.config.translation.provider.display_name(),
            self.config.translation.get_model(),
            language_name,
            subtitles.segments.len()
        );

        let output = self.translate_segments(&subtitles.segments).await?;

        SubtitleCollection::write_cues_to_srt(&output.cues, &output_file)?;
        info!("Success: {}", output_file.display());

        Ok(Some(TranslationReport {
            input: input_file.to_path_buf(),
            output: output_file,
            target_language: target_language.clone(),
            provider: self.translator.name().to_string(),
            fallback_ids: output.fallback_ids(),
            stats: output.stats,
            gate: output.gate,
        }))
    }

    /// Run the translation pipeline over segments with a progress bar
    pub async fn translate_segments(&self, segments: &[Segment]) -> Result<JobOutput> {
        let pipeline = TranslationPipeline::new(self.translator.as_ref(), self.config.pipeline_config())
            .with_rate_limiter(self.rate_limiter.clone())
            .with_cancellation(self.cancellation.clone());

        let progress_bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message("Translating");

        let pb = progress_bar.clone();
        let result = pipeline
            .run_with_progress(segments, &self.config.target_language, move |completed, total| {
                pb.set_length(total as u64);
                pb.set_position(completed as u64);
            })
            .await;

        progress_bar.finish_and_clear();

        let output = result.context("Translation failed")?;
        let stats = &output.stats;
        info!(
            "Translated {} segments in {} batches ({} requests, {} retried, {} kept source text) in {:.1}s",
            output.cues.len(),
            stats.batches,
            stats.requests,
            stats.retried,
            stats.fallback,
            stats.elapsed.as_secs_f64()
        );

        Ok(output)
    }

    /// Run only the quality gate over an existing subtitle file
    pub fn check_file(path: &Path, thresholds: &GateThresholds) -> Result<GateResult> {
        let subtitles = SubtitleCollection::load(path)?;
        let cues: Vec<Cue> = subtitles
            .segments
            .iter()
            .map(|segment| Cue::from_segment(segment, segment.text.clone()))
            .collect();
        Ok(quality_gate::validate(&cues, thresholds))
    }
}
