use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

use crate::error::{Result, ReelError};

/// A timed subtitle line, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleCue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl SubtitleCue {
    pub fn new<S: Into<String>>(start: f64, end: f64, text: S) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Both bounds are inclusive
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }
}

/// Ordered list of cues for one composition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubtitleTrack {
    cues: Vec<SubtitleCue>,
}

impl SubtitleTrack {
    pub fn new(cues: Vec<SubtitleCue>) -> Self {
        Self { cues }
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// Find the cue active at `time`. Overlapping cues resolve to the first in sequence order.
    pub fn cue_at(&self, time: f64) -> Option<&SubtitleCue> {
        self.cues.iter().find(|cue| cue.contains(time))
    }

    /// Sanity check the cue list. Problems are reported, never enforced.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for (index, cue) in self.cues.iter().enumerate() {
            let number = index + 1;
            if cue.start < 0.0 || cue.end < 0.0 {
                warnings.push(format!("cue {} has a negative timestamp", number));
            }
            if cue.start >= cue.end {
                warnings.push(format!(
                    "cue {} starts at {:.3}s but ends at {:.3}s",
                    number, cue.start, cue.end
                ));
            }
            if cue.text.trim().is_empty() {
                warnings.push(format!("cue {} has no text", number));
            }
        }

        for (index, pair) in self.cues.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.start < prev.start {
                warnings.push(format!("cue {} starts before cue {}", index + 2, index + 1));
            } else if next.start < prev.end {
                warnings.push(format!("cue {} overlaps cue {}", index + 2, index + 1));
            }
        }

        warnings
    }

    /// Log validation warnings and return how many were found
    pub fn log_warnings(&self) -> usize {
        let warnings = self.validate();
        for warning in &warnings {
            warn!("Subtitle check: {}", warning);
        }
        warnings.len()
    }

    /// Serialize the cues as a TypeScript data module
    pub fn to_data_module(&self) -> Result<String> {
        let json = serde_json::to_string_pretty(&self.cues)?;
        Ok(format!("export const SUBTITLES = {};\n", json))
    }

    pub fn to_srt(&self) -> String {
        let mut srt_content = String::new();

        for (index, cue) in self.cues.iter().enumerate() {
            srt_content.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                index + 1,
                format_srt_time(cue.start),
                format_srt_time(cue.end),
                cue.text.trim()
            ));
        }

        srt_content
    }

    /// Write the track as an SRT file
    pub async fn write_srt<P: AsRef<Path>>(&self, output_path: P) -> Result<()> {
        let output_path = output_path.as_ref();
        info!("Generating SRT file: {}", output_path.display());

        fs::write(output_path, self.to_srt()).await.map_err(ReelError::Io)?;

        info!("SRT file generated with {} cues", self.cues.len());
        Ok(())
    }
}

/// Format time in seconds to SRT time format (HH:MM:SS,mmm)
fn format_srt_time(seconds: f64) -> String {
    let total_milliseconds = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}
