use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, debug};

use crate::config::MediaConfig;
use crate::error::{Result, WordloopError};
use super::{MediaCommand, MediaCommandBuilder, MediaProcessorTrait};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    duration: Option<String>,
}

/// Read the container duration out of `ffprobe -of json` output
pub fn parse_probe_duration(stdout: &[u8]) -> Result<f64> {
    let parsed: ProbeOutput = serde_json::from_slice(stdout)?;
    let raw = parsed
        .format
        .and_then(|format| format.duration)
        .ok_or_else(|| WordloopError::Metadata("ffprobe did not report a duration".to_string()))?;

    let duration: f64 = raw
        .trim()
        .parse()
        .map_err(|_| WordloopError::Metadata(format!("ffprobe reported a non-numeric duration '{}'", raw)))?;

    if !duration.is_finite() || duration < 0.0 {
        return Err(WordloopError::Metadata(format!("ffprobe reported an invalid duration {}", duration)));
    }
    Ok(duration)
}

/// Media processor backed by the ffmpeg and ffprobe binaries
pub struct FfmpegProcessor {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegProcessor {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.ffmpeg_path, &config.ffprobe_path);

        Self {
            config,
            command_builder,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    fn check_binary(command: MediaCommand) -> Result<()> {
        let stdout = command.execute_blocking()?;
        let version_info = String::from_utf8_lossy(&stdout);
        // The first line carries the version
        let first_line = version_info.lines().next().unwrap_or("unknown version");
        debug!("{} is available: {}", command.binary_path, first_line);
        Ok(())
    }
}

#[async_trait]
impl MediaProcessorTrait for FfmpegProcessor {
    async fn adjust_tempo(&self, input: &Path, output: &Path, tempo: f64) -> Result<()> {
        info!("Adjusting audio speed to {}x: {} -> {}", tempo, input.display(), output.display());

        let command = self.command_builder.adjust_tempo(input, output, tempo);
        command.execute(self.timeout()).await?;

        info!("Adjusted audio saved to {}", output.display());
        Ok(())
    }

    async fn probe_duration(&self, input: &Path) -> Result<f64> {
        debug!("Probing duration of {}", input.display());

        let command = self.command_builder.probe_duration(input);
        let stdout = command.execute_capture(self.timeout()).await?;
        let duration = parse_probe_duration(&stdout)?;

        info!("Audio duration: {} seconds", duration);
        Ok(duration)
    }

    async fn loop_audio(&self, input: &Path, output: &Path, duration: f64) -> Result<()> {
        info!("Looping {} to {}s -> {}", input.display(), duration, output.display());

        let command = self.command_builder.loop_audio(input, output, duration);
        command.execute(self.timeout()).await?;

        info!("Looped audio saved to {}", output.display());
        Ok(())
    }

    async fn mux_frames(
        &self,
        frame_pattern: &Path,
        framerate: f64,
        audio: &Path,
        output: &Path,
        duration: f64,
    ) -> Result<()> {
        info!(
            "Muxing {} at {:.4} fps with {} for {}s -> {}",
            frame_pattern.display(), framerate, audio.display(), duration, output.display()
        );

        let command = self.command_builder.mux_frames(
            frame_pattern,
            framerate,
            audio,
            output,
            duration,
            &self.config.video_options,
        );
        command.execute(self.timeout()).await?;

        info!("Video saved to {}", output.display());
        Ok(())
    }

    fn check_availability(&self) -> Result<()> {
        Self::check_binary(self.command_builder.ffmpeg_version())?;
        Self::check_binary(self.command_builder.ffprobe_version())?;
        info!("Media processor is available");
        Ok(())
    }
}
