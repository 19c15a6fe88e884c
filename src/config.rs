use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, WordloopError};

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("wordloop")
}

fn default_keep_intermediates() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub video: VideoConfig,
    pub overlay: OverlayConfig,
    pub media: MediaConfig,
    pub storage: StorageConfig,
    /// Seed for every random decision (grid shuffle, font size, jitter).
    /// Leave unset for a fresh layout on each run.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Total length of the output video and the looped audio track
    pub duration_secs: f64,
    /// Playback speed factor applied to the pronunciation clip
    pub tempo: f64,
    /// JPEG quality for saved frames (1-100)
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    pub font_family: String,
    pub font_weight: String,
    pub fill_color: String,
    /// Smallest font size, inclusive
    pub min_font_size: u32,
    /// Largest font size, exclusive
    pub max_font_size: u32,
    /// Vertical jitter in pixels, applied as a uniform pick in [-jitter, jitter]
    pub jitter: i32,
    /// Margin kept between the text and the image edges when clamping
    pub padding: f32,
    /// Standard deviation of the drop-shadow blur
    pub shadow_blur: f32,
    /// Offset of the drop shadow on both axes
    pub shadow_offset: f32,
    /// Extra directories loaded into the font database
    #[serde(default)]
    pub font_dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Upper bound for any single ffmpeg/ffprobe invocation
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Additional encoding options appended to the final mux
    /// Common options: ["-preset", "medium", "-crf", "23", "-movflags", "+faststart"]
    #[serde(default)]
    pub video_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory for per-request workspaces
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Keep the staged inputs, frames and intermediate audio after a run
    #[serde(default = "default_keep_intermediates")]
    pub keep_intermediates: bool,
    /// Optional newline-separated word list used by `roll`
    #[serde(default)]
    pub word_list: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            video: VideoConfig {
                duration_secs: 10.0,
                tempo: 1.5,
                jpeg_quality: 90,
            },
            overlay: OverlayConfig {
                font_family: "Arial, sans-serif".to_string(),
                font_weight: "bold".to_string(),
                fill_color: "yellow".to_string(),
                min_font_size: 50,
                max_font_size: 80,
                jitter: 20,
                padding: 10.0,
                shadow_blur: 3.0,
                shadow_offset: 10.0,
                font_dirs: Vec::new(),
            },
            media: MediaConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
                timeout_secs: default_timeout_secs(),
                video_options: vec![
                    // "-preset".to_string(), "medium".to_string(),
                    // "-crf".to_string(), "23".to_string(),
                ],
            },
            storage: StorageConfig {
                work_dir: default_work_dir(),
                keep_intermediates: default_keep_intermediates(),
                word_list: None,
            },
            seed: None,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WordloopError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| WordloopError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| WordloopError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(self.video.duration_secs.is_finite() && self.video.duration_secs > 0.0) {
            return Err(WordloopError::Config(format!(
                "video.duration_secs must be positive, got {}",
                self.video.duration_secs
            )));
        }
        // atempo accepts 0.5..=100.0
        if !(0.5..=100.0).contains(&self.video.tempo) {
            return Err(WordloopError::Config(format!(
                "video.tempo must be within 0.5..=100.0, got {}",
                self.video.tempo
            )));
        }
        if self.overlay.min_font_size == 0 || self.overlay.min_font_size >= self.overlay.max_font_size {
            return Err(WordloopError::Config(format!(
                "overlay font size range {}..{} is empty",
                self.overlay.min_font_size, self.overlay.max_font_size
            )));
        }
        if self.overlay.jitter < 0 {
            return Err(WordloopError::Config("overlay.jitter must not be negative".to_string()));
        }
        if self.media.timeout_secs == 0 {
            return Err(WordloopError::Config("media.timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }
}
