use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::SubtitleError;

// @module: Segment and cue model, SRT and JSON input/output

// @const: SRT timestamp regex (comma or dot before milliseconds)
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("timestamp regex is valid")
});

// @struct: One source text unit with a stable id and timing window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    // @field: Stable id, assigned by original sequence position
    pub id: usize,

    // @field: Source text
    pub text: String,

    // @field: Start time in seconds
    pub start: f64,

    // @field: End time in seconds
    pub end: f64,
}

impl Segment {
    pub fn new(id: usize, text: impl Into<String>, start: f64, end: f64) -> Self {
        Segment {
            id,
            text: text.into(),
            start,
            end,
        }
    }

    /// On-screen duration in seconds (may be zero or negative for broken input)
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

// @struct: A segment after translation, ready for presentation checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    // @field: Start time in seconds
    pub start: f64,

    // @field: End time in seconds
    pub end: f64,

    // @field: Translated (or fallback) text
    pub text: String,
}

impl Cue {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Cue {
            start,
            end,
            text: text.into(),
        }
    }

    /// Build a cue from a segment, replacing its text
    pub fn from_segment(segment: &Segment, text: impl Into<String>) -> Self {
        Cue::new(segment.start, segment.end, text)
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Render this cue as one SRT block with the given 1-based index
    pub fn to_srt_block(&self, index: usize) -> String {
        format!(
            "{}\n{} --> {}\n{}\n\n",
            index,
            format_timestamp(self.start),
            format_timestamp(self.end),
            self.text
        )
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} --> {} {}",
            format_timestamp(self.start),
            format_timestamp(self.end),
            self.text
        )
    }
}

/// Format seconds as an SRT timestamp (HH:MM:SS,mmm)
pub fn format_timestamp(seconds: f64) -> String {
    let ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let secs = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Ordered segment list loaded from a file
#[derive(Debug)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// Segments in original order
    pub segments: Vec<Segment>,
}

impl SubtitleCollection {
    /// Load segments from an SRT file or a JSON segment list, chosen by extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let segments = if is_json {
            Self::parse_json_string(&content)?
        } else {
            Self::parse_srt_string(&content)?
        };

        debug!("Loaded {} segments from {}", segments.len(), path.display());

        Ok(SubtitleCollection {
            source_file: path.to_path_buf(),
            segments,
        })
    }

    /// Parse a JSON array of `{id, text, start, end}` objects
    pub fn parse_json_string(content: &str) -> Result<Vec<Segment>, SubtitleError> {
        serde_json::from_str::<Vec<Segment>>(content)
            .map_err(|e| SubtitleError::InvalidSegments(e.to_string()))
    }

    /// Parse SRT content into segments.
    ///
    /// Blocks keep their file order and are re-numbered 1..=N; blocks with no
    /// text are skipped.
    pub fn parse_srt_string(content: &str) -> Result<Vec<Segment>, SubtitleError> {
        let mut segments = Vec::new();

        let mut in_block = false;
        let mut timing: Option<(f64, f64)> = None;
        let mut current_text = String::new();

        let mut flush = |timing: &mut Option<(f64, f64)>, text: &mut String| {
            if let Some((start, end)) = timing.take() {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    warn!("Skipping empty subtitle block at {}", format_timestamp(start));
                } else {
                    let id = segments.len() + 1;
                    segments.push(Segment::new(id, trimmed, start, end));
                }
            }
            text.clear();
        };

        for (idx, line) in content.lines().enumerate() {
            let line_number = idx + 1;
            let trimmed = line.trim().trim_start_matches('\u{feff}');

            if trimmed.is_empty() {
                if timing.is_some() {
                    flush(&mut timing, &mut current_text);
                }
                in_block = false;
                continue;
            }

            if !in_block && timing.is_none() && trimmed.parse::<usize>().is_ok() {
                in_block = true;
                continue;
            }

            if timing.is_none() {
                if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                    let start = parse_captured_seconds(&caps, 1);
                    let end = parse_captured_seconds(&caps, 5);
                    match (start, end) {
                        (Some(start), Some(end)) => {
                            timing = Some((start, end));
                            in_block = true;
                            continue;
                        }
                        _ => {
                            return Err(SubtitleError::InvalidTimestamp {
                                line: line_number,
                                content: trimmed.to_string(),
                            });
                        }
                    }
                }

                if trimmed.contains("-->") {
                    return Err(SubtitleError::InvalidTimestamp {
                        line: line_number,
                        content: trimmed.to_string(),
                    });
                }

                warn!("Unexpected text at line {} before timestamp: {}", line_number, trimmed);
                continue;
            }

            if !current_text.is_empty() {
                current_text.push('\n');
            }
            current_text.push_str(trimmed);
        }

        if timing.is_some() {
            flush(&mut timing, &mut current_text);
        }

        if segments.is_empty() {
            return Err(SubtitleError::Malformed(
                "no valid subtitle blocks were found".to_string(),
            ));
        }

        Ok(segments)
    }

    /// Write cues to an SRT file, creating parent directories as needed
    pub fn write_cues_to_srt<P: AsRef<Path>>(cues: &[Cue], path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let mut file = fs::File::create(path)
            .with_context(|| format!("Failed to create subtitle file: {}", path.display()))?;

        file.write_all(Self::format_srt(cues).as_bytes())?;

        Ok(())
    }

    /// Render cues as SRT text
    pub fn format_srt(cues: &[Cue]) -> String {
        cues.iter()
            .enumerate()
            .map(|(i, cue)| cue.to_srt_block(i + 1))
            .collect()
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Segments: {}", self.segments.len())?;
        Ok(())
    }
}

fn parse_captured_seconds(caps: &regex::Captures, start_idx: usize) -> Option<f64> {
    let part = |offset: usize| -> Option<u64> { caps.get(start_idx + offset)?.as_str().parse().ok() };

    let hours = part(0)?;
    let minutes = part(1)?;
    let seconds = part(2)?;
    let millis = part(3)?;

    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    let total_ms = (hours * 3600 + minutes * 60 + seconds) * 1000 + millis;
    Some(total_ms as f64 / 1000.0)
}
