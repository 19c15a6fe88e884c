// Media processing over ffmpeg/ffprobe
//
// - Commands: argument builders for each ffmpeg/ffprobe invocation
// - Processor: the ffmpeg-backed implementation of MediaProcessorTrait
//
// Every operation is addressed by file paths and awaited to completion
// before the next pipeline step starts.

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Audio processing and muxing operations used by the pipeline
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Write a copy of `input` played back at `tempo` times the original speed
    async fn adjust_tempo(&self, input: &Path, output: &Path, tempo: f64) -> Result<()>;

    /// Duration of an audio file in seconds
    async fn probe_duration(&self, input: &Path) -> Result<f64>;

    /// Repeat `input` indefinitely and cut the result at exactly `duration` seconds
    async fn loop_audio(&self, input: &Path, output: &Path, duration: f64) -> Result<()>;

    /// Encode a numbered image sequence at `framerate` with `audio` as the sole
    /// audio track, cut at `duration` seconds
    async fn mux_frames(
        &self,
        frame_pattern: &Path,
        framerate: f64,
        audio: &Path,
        output: &Path,
        duration: f64,
    ) -> Result<()>;

    /// Check if ffmpeg and ffprobe are available
    fn check_availability(&self) -> Result<()>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::FfmpegProcessor::new(config))
    }
}
