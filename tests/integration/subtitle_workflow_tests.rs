/*!
 * Integration tests for the file-in, file-out subtitle workflow
 */

use std::fs;

use anyhow::Result;

use cuegate::app_config::Config;
use cuegate::app_controller::Controller;
use cuegate::providers::mock::MockTranslator;
use cuegate::subtitle_processor::SubtitleCollection;
use cuegate::validation::{GateThresholds, ViolationCode};

use crate::common;

fn french_config() -> Config {
    Config {
        target_language: "fr".to_string(),
        ..Config::default()
    }
}

fn french_translator() -> Box<MockTranslator> {
    Box::new(MockTranslator::working().with_dictionary([
        ("Hello", "Bonjour"),
        ("World", "Monde"),
        ("Test", "Essai"),
    ]))
}

/// Translate a file and check the written SRT and the report
#[tokio::test]
async fn test_controllerRun_withSrtFile_shouldWriteTranslatedFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;
    let controller = Controller::with_translator(french_config(), french_translator());

    let report = controller.run(&input, None, false).await?.expect("job should run");

    assert_eq!(report.output, temp_dir.path().join("episode.fr.srt"));
    assert_eq!(report.provider, "mock");
    assert!(report.gate.passed);
    assert!(report.fallback_ids.is_empty());
    assert_eq!(report.stats.direct, 3);

    let written = SubtitleCollection::load(&report.output)?;
    let texts: Vec<&str> = written.segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["Bonjour", "Monde", "Essai"]);

    let original = SubtitleCollection::load(&input)?;
    for (source, translated) in original.segments.iter().zip(&written.segments) {
        assert_eq!(source.start, translated.start);
        assert_eq!(source.end, translated.end);
    }
    Ok(())
}

#[tokio::test]
async fn test_controllerRun_withExistingOutput_shouldSkipUnlessForced() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;
    let output = common::create_test_file(temp_dir.path(), "custom.srt", "keep me")?;
    let controller = Controller::with_translator(french_config(), french_translator());

    let skipped = controller.run(&input, Some(output.clone()), false).await?;
    assert!(skipped.is_none());
    assert_eq!(fs::read_to_string(&output)?, "keep me");

    let forced = controller.run(&input, Some(output.clone()), true).await?;
    assert!(forced.is_some());
    assert!(fs::read_to_string(&output)?.contains("Bonjour"));
    Ok(())
}

#[tokio::test]
async fn test_controllerRun_withOmittingProvider_shouldKeepSourceTextAndReportIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;
    let controller = Controller::with_translator(french_config(), Box::new(MockTranslator::omitting(&[2])));

    let report = controller.run(&input, None, false).await?.expect("job should run");

    assert_eq!(report.fallback_ids, vec![2]);
    let written = fs::read_to_string(&report.output)?;
    assert!(written.contains("[fr] Hello"));
    assert!(written.contains("\nWorld\n"));
    Ok(())
}

#[test]
fn test_controllerRun_withMissingInput_shouldFail() {
    let temp_dir = common::create_temp_dir().unwrap();
    let controller = Controller::with_translator(french_config(), french_translator());
    let missing = temp_dir.path().join("nope.srt");

    let result = tokio_test::block_on(async { controller.run(&missing, None, false).await });

    let err = result.unwrap_err();
    assert!(err.to_string().contains("Input file does not exist"));
}

/// The report serializes to JSON with the gate verdict
#[tokio::test]
async fn test_report_shouldSerializeToJson() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;
    let controller = Controller::with_translator(french_config(), french_translator());

    let report = controller.run(&input, None, false).await?.expect("job should run");
    let json = serde_json::to_value(&report)?;

    assert_eq!(json["target_language"], "fr");
    assert_eq!(json["gate"]["passed"], true);
    assert_eq!(json["stats"]["batches"], 1);
    Ok(())
}

#[test]
fn test_checkFile_withTightCues_shouldReportViolations() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "tight.srt",
        "1\n00:00:01,000 --> 00:00:03,000\nFirst\n\n2\n00:00:03,020 --> 00:00:10,000\nSecond\n",
    )?;

    let result = Controller::check_file(&path, &GateThresholds::default())?;

    assert!(!result.passed);
    let codes: Vec<ViolationCode> = result.violations.iter().map(|v| v.code).collect();
    assert_eq!(codes, vec![ViolationCode::Overlaps, ViolationCode::MaxCue]);
    Ok(())
}

#[test]
fn test_checkFile_withSampleFile_shouldPass() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(temp_dir.path(), "sample.srt")?;

    let result = Controller::check_file(&path, &GateThresholds::default())?;

    assert!(result.passed);
    assert_eq!(result.stats.total_cues, 3);
    Ok(())
}
