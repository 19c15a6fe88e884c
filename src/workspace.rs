use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::word::Word;

/// Per-request scratch directory. Every generation gets its own
/// `{base}/{word}-{uuid}` so concurrent runs for the same word never share
/// paths.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    word: Word,
}

impl Workspace {
    pub async fn create<P: AsRef<Path>>(base: P, word: &Word) -> Result<Self> {
        let root = base.as_ref().join(format!("{}-{}", word, Uuid::new_v4()));
        fs::create_dir_all(root.join("frames")).await?;
        debug!("Created workspace {}", root.display());

        Ok(Self {
            root,
            word: word.clone(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Staged copy of the source image
    pub fn image_path(&self) -> PathBuf {
        self.root.join(format!("{}.png", self.word))
    }

    /// Staged copy of the pronunciation clip, keeping the caller's extension
    pub fn audio_path(&self, extension: Option<&str>) -> PathBuf {
        self.root.join(format!("{}.{}", self.word, extension.unwrap_or("mp3")))
    }

    pub fn adjusted_audio_path(&self) -> PathBuf {
        self.root.join(format!("{}_adjusted.mp3", self.word))
    }

    pub fn looped_audio_path(&self) -> PathBuf {
        self.root.join(format!("{}_looped.mp3", self.word))
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.root.join("frames")
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.frames_dir().join(format!("frame_{}.jpg", index))
    }

    /// ffmpeg image2 pattern matching every `frame_path`
    pub fn frame_pattern(&self) -> PathBuf {
        self.frames_dir().join("frame_%d.jpg")
    }

    pub fn video_path(&self) -> PathBuf {
        self.root.join(format!("{}.mp4", self.word))
    }

    /// Remove the workspace and everything in it
    pub async fn cleanup(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                debug!("Removed workspace {}", self.root.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("Failed to remove workspace {}: {}", self.root.display(), e);
                Err(e.into())
            }
        }
    }
}
