/*!
 * Tests for subtitle loading and writing
 */

use anyhow::Result;
use cuegate::errors::SubtitleError;
use cuegate::subtitle_processor::{Cue, Segment, SubtitleCollection, format_timestamp};

use crate::common;

/// Test loading an SRT file from disk
#[test]
fn test_load_withSrtFile_shouldReadSegmentsInOrder() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(temp_dir.path(), "sample.srt")?;

    let collection = SubtitleCollection::load(&path)?;

    assert_eq!(collection.source_file, path);
    let texts: Vec<&str> = collection.segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["Hello", "World", "Test"]);
    assert_eq!(collection.segments[2], Segment::new(3, "Test", 10.0, 14.0));
    Ok(())
}

/// Test loading a JSON segment list chosen by extension
#[test]
fn test_load_withJsonFile_shouldKeepGivenIds() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "segments.JSON",
        r#"[{"id": 7, "text": "Seven", "start": 1.0, "end": 2.0},
            {"id": 3, "text": "Three", "start": 2.5, "end": 3.5}]"#,
    )?;

    let collection = SubtitleCollection::load(&path)?;

    let ids: Vec<usize> = collection.segments.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![7, 3]);
    Ok(())
}

#[test]
fn test_load_withMissingFile_shouldFailWithPath() {
    let err = SubtitleCollection::load("/definitely/not/here.srt").unwrap_err();
    assert!(err.to_string().contains("here.srt"));
}

#[test]
fn test_parseSrtString_withCrlfAndBom_shouldParse() {
    let content = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,500\r\nFirst\r\n\r\n2\r\n00:00:03.000 --> 00:00:04.000\r\nSecond\r\n";
    let segments = SubtitleCollection::parse_srt_string(content).unwrap();

    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].text, "First");
    assert_eq!(segments[0].end, 2.5);
    assert_eq!(segments[1].start, 3.0);
}

#[test]
fn test_parseSrtString_withEmptyBlock_shouldSkipAndRenumber() {
    let content = "1\n00:00:01,000 --> 00:00:02,000\n\n2\n00:00:03,000 --> 00:00:04,000\nKept\n";
    let segments = SubtitleCollection::parse_srt_string(content).unwrap();

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].id, 1);
    assert_eq!(segments[0].text, "Kept");
}

#[test]
fn test_parseSrtString_withOnlyGarbage_shouldBeMalformed() {
    let err = SubtitleCollection::parse_srt_string("not a subtitle\nat all\n").unwrap_err();
    assert!(matches!(err, SubtitleError::Malformed(_)));
}

#[test]
fn test_parseJsonString_withWrongShape_shouldFail() {
    let err = SubtitleCollection::parse_json_string(r#"{"id": 1}"#).unwrap_err();
    assert!(matches!(err, SubtitleError::InvalidSegments(_)));
}

/// Written files parse back to the same timing and text
#[test]
fn test_writeCuesToSrt_shouldCreateParentsAndParseBack() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("nested/out/translated.srt");
    let cues = vec![
        Cue::new(1.0, 2.25, "שלום"),
        Cue::new(3.0, 4.5, "Two\nlines"),
    ];

    SubtitleCollection::write_cues_to_srt(&cues, &path)?;
    let segments = SubtitleCollection::parse_srt_string(&std::fs::read_to_string(&path)?)?;

    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].text, "שלום");
    assert_eq!(segments[0].end, 2.25);
    assert_eq!(segments[1].text, "Two\nlines");
    Ok(())
}

#[test]
fn test_cueFromSegment_shouldKeepTiming() {
    let segment = Segment::new(4, "Source", 12.5, 15.0);
    let cue = Cue::from_segment(&segment, "Cible");

    assert_eq!(cue, Cue::new(12.5, 15.0, "Cible"));
    assert_eq!(cue.duration(), 2.5);
    assert_eq!(cue.to_string(), "00:00:12,500 --> 00:00:15,000 Cible");
}

#[test]
fn test_formatTimestamp_withNegative_shouldClampToZero() {
    assert_eq!(format_timestamp(-3.0), "00:00:00,000");
    assert_eq!(format_timestamp(36000.001), "10:00:00,001");
}
