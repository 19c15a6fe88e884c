use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, WordloopError};

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set pixel format
    pub fn pixel_format<S: Into<String>>(self, format: S) -> Self {
        self.arg("-pix_fmt").arg(format)
    }

    /// Add audio filter
    pub fn audio_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-af").arg(filter)
    }

    /// Limit output duration in seconds
    pub fn duration(self, seconds: f64) -> Self {
        self.arg("-t").arg(seconds.to_string())
    }

    /// Execute the command, discarding stdout
    pub async fn execute(&self, timeout: Duration) -> Result<()> {
        self.run(timeout).await.map(|_| ())
    }

    /// Execute the command and return its stdout
    pub async fn execute_capture(&self, timeout: Duration) -> Result<Vec<u8>> {
        self.run(timeout).await
    }

    /// Run the command synchronously, for quick checks made outside a runtime context
    pub fn execute_blocking(&self) -> Result<Vec<u8>> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);

        let output = std::process::Command::new(&self.binary_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| WordloopError::Encoding(format!("{} not found: {}", self.binary_path, e)))?;

        if !output.status.success() {
            return Err(WordloopError::Encoding(format!("{} failed", self.description)));
        }
        Ok(output.stdout)
    }

    async fn run(&self, timeout: Duration) -> Result<Vec<u8>> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            WordloopError::Encoding(format!("Failed to execute {}: {}", self.binary_path, e))
        })?;

        // Dropping the pending future on timeout kills the child
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| WordloopError::Timeout {
                description: self.description.clone(),
                seconds: timeout.as_secs(),
            })?
            .map_err(|e| WordloopError::Encoding(format!("{} failed to complete: {}", self.description, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WordloopError::Encoding(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

/// Builder for the ffmpeg/ffprobe invocations the pipeline needs
#[derive(Debug, Clone)]
pub struct MediaCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(ffmpeg_path: S1, ffprobe_path: S2) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Build tempo adjustment command
    pub fn adjust_tempo<P: AsRef<Path>>(&self, input: P, output: P, tempo: f64) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, format!("Tempo adjustment ({}x)", tempo))
            .overwrite()
            .input(input)
            .audio_filter(format!("atempo={}", tempo))
            .output(output)
    }

    /// Build duration probe command
    pub fn probe_duration<P: AsRef<Path>>(&self, input: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Duration probe")
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "json"])
            .output(input)
    }

    /// Build audio looping command: repeat the input forever, cut at `duration`
    pub fn loop_audio<P: AsRef<Path>>(&self, input: P, output: P, duration: f64) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Audio looping")
            .overwrite()
            .args(["-stream_loop", "-1"])
            .input(input)
            .duration(duration)
            .output(output)
    }

    /// Build image sequence + audio mux command, cut at `duration` seconds
    pub fn mux_frames<P: AsRef<Path>>(
        &self,
        frame_pattern: P,
        framerate: f64,
        audio: P,
        output: P,
        duration: f64,
        additional_options: &[String],
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.ffmpeg_path, "Video muxing")
            .overwrite()
            .arg("-framerate")
            .arg(framerate.to_string())
            .input(frame_pattern)
            .input(audio)
            .video_codec("libx264")
            .pixel_format("yuv420p");

        // Add user-specified additional options
        for option in additional_options {
            cmd = cmd.arg(option);
        }

        // The last frame lasts a whole clip and can outrun the looped audio
        cmd.duration(duration).output(output)
    }

    /// Build ffmpeg version check command
    pub fn ffmpeg_version(&self) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "ffmpeg version check").arg("-version")
    }

    /// Build ffprobe version check command
    pub fn ffprobe_version(&self) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "ffprobe version check").arg("-version")
    }
}
