use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ReelError};
use crate::subtitle::{SubtitleCue, SubtitleTrack};

fn default_audio_file_name() -> String {
    "audio.mp3".to_string()
}

fn default_output_file_name() -> String {
    "output.mp4".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub composition: CompositionConfig,
    pub audio: AudioConfig,
    pub output: OutputConfig,
    pub render: RenderConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub subtitles: Vec<SubtitleCue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionConfig {
    /// Identifier the renderer exposes the composition under
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Total length of the video
    pub duration_seconds: f64,
    /// How cue data reaches the composition source
    #[serde(default)]
    pub subtitle_mode: SubtitleMode,
    /// Custom composition template (built-in template when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
    /// Custom entry-point template (built-in template when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_template: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubtitleMode {
    /// Inline: cue data is prepended to the composition source
    #[default]
    Inline,
    /// SideFile: cue data is written to `subtitles.ts` and imported
    SideFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Remote narration track
    pub url: String,
    /// File name inside the workspace's public directory
    #[serde(default = "default_audio_file_name")]
    pub file_name: String,
    /// Whole-request timeout for the download
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Explicit output path; overrides `file_name` and `timestamped`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_output_file_name")]
    pub file_name: String,
    /// Append a local timestamp to the file stem
    #[serde(default)]
    pub timestamped: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Launcher binary (e.g., npx)
    pub binary: String,
    /// Package invoked through the launcher
    pub package: String,
    /// Video codec identifier
    pub codec: String,
    pub pixel_format: String,
    /// Constant rate factor (lower = better quality)
    pub crf: u32,
    /// Number of frames rendered in parallel
    pub concurrency: u32,
    /// Flags handed to the headless browser
    /// Common options: ["--disable-web-security", "--gl=swangle"]
    pub browser_flags: Vec<String>,
    pub log_level: String,
    /// Abort the render step after this many seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Parent directory for job workspaces (OS temp dir when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            id: "EducationalVideo".to_string(),
            width: 1920,
            height: 1080,
            fps: 30,
            duration_seconds: 80.0,
            subtitle_mode: SubtitleMode::Inline,
            template: None,
            entry_template: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            composition: CompositionConfig::default(),
            audio: AudioConfig {
                url: "https://github.com/GetyeTek/wordwise-images/raw/00d4db02f9d2c3d1cf8bda0395637c38ea46aaec/history-of-ethiopia.mp3".to_string(),
                file_name: default_audio_file_name(),
                timeout_secs: Some(300),
            },
            output: OutputConfig {
                path: None,
                file_name: default_output_file_name(),
                timestamped: false,
            },
            render: RenderConfig {
                binary: "npx".to_string(),
                package: "remotion".to_string(),
                codec: "h264".to_string(),
                pixel_format: "yuv420p".to_string(),
                crf: 18,
                concurrency: 2,
                browser_flags: vec![],
                log_level: "info".to_string(),
                timeout_secs: None,
            },
            workspace: WorkspaceConfig::default(),
            subtitles: vec![
                SubtitleCue::new(1.1, 4.8, "History of Ethiopia and the Horn, Unit 1"),
                SubtitleCue::new(5.2, 11.9, "Let's make it simple, like a friend talking, without skipping the main points."),
                SubtitleCue::new(12.5, 15.8, "History can be confusing with its many names and dates..."),
                SubtitleCue::new(16.2, 18.0, "...but if you grasp the CONCEPT, it's easy."),
                SubtitleCue::new(23.2, 25.5, "First, what does 'History' mean?"),
                SubtitleCue::new(26.0, 32.0, "The word comes from the Greek 'Istoria', meaning INQUIRY, or research."),
                SubtitleCue::new(34.0, 36.0, "There is a difference between the PAST and HISTORY."),
                SubtitleCue::new(37.8, 42.8, "The PAST is everything that ever happened. All actions, thoughts, events."),
                SubtitleCue::new(43.0, 45.8, "But the past is unwritten, unstudied."),
                SubtitleCue::new(46.0, 52.8, "HISTORY is the written, analyzed report about the past, created by historians."),
                SubtitleCue::new(57.5, 100.8, "History isn't just a list of names and dates."),
                SubtitleCue::new(101.5, 106.0, "It's the study of how humans interacted with their environment over time."),
                SubtitleCue::new(106.8, 117.5, "While Sociology studies society NOW (a snapshot), History studies CHANGE and CONTINUITY over time."),
            ],
        }
    }
}

/// Everything one render needs, resolved from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RenderJob {
    pub composition_id: String,
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub duration_in_frames: u64,
    pub codec: String,
    pub audio_source_url: String,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReelError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ReelError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ReelError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ReelError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let composition = &self.composition;
        if composition.id.trim().is_empty() {
            return Err(ReelError::Config("composition.id must not be empty".to_string()));
        }
        // Interpolated into the entry module as a JSX attribute.
        if !composition.id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ReelError::Config(format!(
                "composition.id may only contain letters, digits and '-', got '{}'",
                composition.id
            )));
        }
        if composition.width == 0 || composition.height == 0 {
            return Err(ReelError::Config(format!(
                "composition size must be non-zero, got {}x{}",
                composition.width, composition.height
            )));
        }
        if composition.fps == 0 {
            return Err(ReelError::Config("composition.fps must be non-zero".to_string()));
        }
        if !(composition.duration_seconds > 0.0) || !composition.duration_seconds.is_finite() {
            return Err(ReelError::Config(format!(
                "composition.duration_seconds must be positive, got {}",
                composition.duration_seconds
            )));
        }
        if self.duration_in_frames() == 0 {
            return Err(ReelError::Config(format!(
                "composition.duration_seconds {} is shorter than one frame at {} fps",
                composition.duration_seconds, composition.fps
            )));
        }
        if self.audio.url.trim().is_empty() {
            return Err(ReelError::Config("audio.url must not be empty".to_string()));
        }
        let file_name = self.audio.file_name.as_str();
        if matches!(file_name.trim(), "" | "." | "..")
            || file_name.contains(['/', '\\', '\''])
        {
            return Err(ReelError::Config(format!(
                "audio.file_name must be a plain file name, got '{}'",
                self.audio.file_name
            )));
        }
        Ok(())
    }

    pub fn subtitle_track(&self) -> SubtitleTrack {
        SubtitleTrack::new(self.subtitles.clone())
    }

    pub fn duration_in_frames(&self) -> u64 {
        (self.composition.duration_seconds * self.composition.fps as f64).round() as u64
    }

    /// Output location, relative paths resolved against `base_dir`
    pub fn output_path(&self, base_dir: &Path, now: DateTime<Local>) -> PathBuf {
        let relative = match &self.output.path {
            Some(path) => path.clone(),
            None if self.output.timestamped => {
                let name = Path::new(&self.output.file_name);
                let stem = name
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| "output".to_string());
                let extension = name
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_else(|| "mp4".to_string());
                PathBuf::from(format!("{}-{}.{}", stem, now.format("%Y%m%d-%H%M%S"), extension))
            }
            None => PathBuf::from(&self.output.file_name),
        };

        if relative.is_absolute() {
            relative
        } else {
            base_dir.join(relative)
        }
    }

    /// Resolve the job for a run started in `base_dir` at `now`
    pub fn render_job(&self, base_dir: &Path, now: DateTime<Local>) -> RenderJob {
        RenderJob {
            composition_id: self.composition.id.clone(),
            output_path: self.output_path(base_dir, now),
            width: self.composition.width,
            height: self.composition.height,
            fps: self.composition.fps,
            duration_in_frames: self.duration_in_frames(),
            codec: self.render.codec.clone(),
            audio_source_url: self.audio.url.clone(),
        }
    }
}
