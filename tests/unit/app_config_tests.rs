/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use cuegate::app_config::{self, Config, LogLevel, TranslationProvider};
use cuegate::translation::{BackoffStrategy, EmptyTranslationPolicy};
use cuegate::validation::GateThresholds;

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.target_language, "he");
    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    assert_eq!(config.log_level, LogLevel::Info);

    let ollama = config
        .translation
        .get_provider_config(&TranslationProvider::Ollama)
        .expect("Ollama provider config should exist");
    assert_eq!(ollama.endpoint, "http://localhost:11434");
    assert_eq!(ollama.timeout_secs, 30);
    assert_eq!(ollama.rate_limit, None);

    let reconcile = &config.translation.reconcile;
    assert_eq!(reconcile.retry_delay_ms, 0);
    assert_eq!(reconcile.retry_backoff, BackoffStrategy::Fixed);
    assert_eq!(reconcile.empty_translation, EmptyTranslationPolicy::Present);
}

/// Saved configuration loads back unchanged
#[test]
fn test_saveAndLoad_shouldPreserveSettings() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let mut config = Config::default();
    config.target_language = "fr".to_string();
    config.translation.provider = TranslationProvider::OpenAI;
    config.translation.provider_config_mut(TranslationProvider::OpenAI).api_key = "sk-test".to_string();
    config.translation.batching.max_segments_per_batch = 10;
    config.quality_gate.max_cps = 17.0;
    config.save(&path)?;

    let loaded = Config::load(&path)?;
    assert_eq!(loaded, config);
    assert_eq!(loaded.translation.get_api_key(), "sk-test");
    Ok(())
}

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let config = Config::load_or_create(&path)?;

    assert!(path.exists());
    assert_eq!(config, Config::default());
    assert_eq!(Config::load(&path)?, config);
    Ok(())
}

#[test]
fn test_load_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;

    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
    Ok(())
}

#[test]
fn test_load_withGateSection_shouldOverrideOnlyGivenThresholds() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{"quality_gate": {"max_cps": 15}, "log_level": "debug"}"#,
    )?;

    let config = Config::load(&path)?;

    assert_eq!(config.quality_gate.max_cps, 15.0);
    assert_eq!(config.quality_gate.min_gap_ms, 50.0);
    assert_eq!(config.log_level, LogLevel::Debug);
    Ok(())
}

#[test]
fn test_pipelineConfig_shouldCarryBatchingRetriesAndGate() {
    let mut config = Config::default();
    config.translation.reconcile.max_retries = 0;
    config.quality_gate.max_cue_duration = 7.0;

    let pipeline = config.pipeline_config();

    assert_eq!(pipeline.batching, config.translation.batching);
    assert_eq!(pipeline.reconcile.max_retries, 0);
    assert_eq!(pipeline.quality_gate.max_cue_duration, 7.0);
}

#[test]
fn test_provider_display_shouldBeLowercase() {
    assert_eq!(TranslationProvider::LMStudio.to_string(), "lmstudio");
    assert_eq!(TranslationProvider::LMStudio.display_name(), "LM Studio");
    assert!(!TranslationProvider::Mock.requires_api_key());
}

/// Command line thresholds go through the same check as the config file
#[test]
fn test_validateThresholds_withZeroNegativeOrNan_shouldFail() {
    assert!(app_config::validate_thresholds(&GateThresholds::default()).is_ok());

    let zero_cps = GateThresholds {
        max_cps: 0.0,
        ..GateThresholds::default()
    };
    let err = app_config::validate_thresholds(&zero_cps).unwrap_err();
    assert!(err.to_string().contains("max_cps"));

    let negative_duration = GateThresholds {
        max_cue_duration: -1.0,
        ..GateThresholds::default()
    };
    assert!(app_config::validate_thresholds(&negative_duration).is_err());

    let nan_gap = GateThresholds {
        min_gap_ms: f64::NAN,
        ..GateThresholds::default()
    };
    let err = app_config::validate_thresholds(&nan_gap).unwrap_err();
    assert!(err.to_string().contains("min_gap_ms"));
}

#[test]
fn test_load_withSystemPrompt_shouldKeepCustomTemplate() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{"translation": {"system_prompt": "Translate into {target_language}"}}"#,
    )?;

    let config = Config::load(&path)?;

    assert_eq!(
        config.translation.system_prompt.as_deref(),
        Some("Translate into {target_language}")
    );
    assert!(Config::default().translation.system_prompt.is_none());
    Ok(())
}
