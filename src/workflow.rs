use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Result, WordloopError};
use crate::frames::{Frame, FrameSequencer, frame_count};
use crate::grid::GridPlan;
use crate::media::{MediaProcessorTrait, MediaProcessorFactory};
use crate::overlay::{OverlayRenderer, TextOverlayRenderer};
use crate::random::RandomSource;
use crate::word::Word;
use crate::workspace::Workspace;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
const AUDIO_EXTENSIONS: [&str; 4] = ["mp3", "wav", "m4a", "ogg"];

/// Outcome of one successful video generation
#[derive(Debug, Clone)]
pub struct VideoReport {
    pub word: Word,
    pub output: PathBuf,
    pub workspace: PathBuf,
    pub adjusted_duration: f64,
    pub frame_count: usize,
    pub framerate: f64,
    pub frames: Vec<Frame>,
}

/// A word with its image and pronunciation clip found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordAsset {
    pub word: String,
    pub image: PathBuf,
    pub audio: PathBuf,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<(String, String)>,
}

/// Probe result for a pronunciation clip before any processing
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub duration: f64,
    pub adjusted_duration: f64,
    pub frame_count: Option<usize>,
}

pub struct Workflow {
    config: Config,
    media: Box<dyn MediaProcessorTrait>,
    renderer: Arc<dyn OverlayRenderer>,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let media = MediaProcessorFactory::create_processor(config.media.clone());

        // Check dependencies
        media.check_availability()?;

        let renderer = TextOverlayRenderer::new(config.overlay.clone());
        Self::with_components(config, media, Box::new(renderer))
    }

    /// Assemble a workflow from explicit collaborators, skipping availability checks
    pub fn with_components(
        config: Config,
        media: Box<dyn MediaProcessorTrait>,
        renderer: Box<dyn OverlayRenderer>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            media,
            renderer: Arc::from(renderer),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn random_source(&self) -> RandomSource {
        RandomSource::new(self.config.seed)
    }

    /// Build a looping video for `word` from an image and a pronunciation clip.
    ///
    /// Without `output` the video lands next to the image as `{word}.mp4`.
    pub async fn generate(
        &self,
        word: &str,
        image_path: &Path,
        audio_path: &Path,
        output: Option<&Path>,
    ) -> Result<VideoReport> {
        let word = Word::new(word)?;
        info!("Generating video for '{}'", word);

        // Validate input files
        for input in [image_path, audio_path] {
            if !input.is_file() {
                return Err(WordloopError::FileNotFound(input.display().to_string()));
            }
        }

        let output = match output {
            Some(path) => path.to_path_buf(),
            None => image_path
                .parent()
                .ok_or_else(|| WordloopError::Config("Cannot determine output directory".to_string()))?
                .join(format!("{}.mp4", word)),
        };
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let workspace = Workspace::create(&self.config.storage.work_dir, &word).await?;
        let rng = self.random_source();

        let result: Result<VideoReport> = async {
            let mut report = self
                .run_pipeline(&word, image_path, audio_path, &workspace, rng)
                .await?;
            fs::copy(workspace.video_path(), &output).await?;
            report.output = output.clone();
            Ok(report)
        }
        .await;

        if !self.config.storage.keep_intermediates {
            if let Err(e) = workspace.cleanup().await {
                warn!("Leaving workspace behind: {}", e);
            }
        }

        match &result {
            Ok(report) => info!(
                "Video for '{}' saved to {} ({} frames)",
                word,
                report.output.display(),
                report.frame_count
            ),
            Err(e) => warn!("Video generation for '{}' failed: {}", word, e),
        }
        result
    }

    async fn run_pipeline(
        &self,
        word: &Word,
        image_path: &Path,
        audio_path: &Path,
        workspace: &Workspace,
        mut rng: RandomSource,
    ) -> Result<VideoReport> {
        let video = &self.config.video;

        // Step 1: Stage inputs under the word's file keys
        let source = image::open(image_path)?.to_rgba8();
        let (width, height) = source.dimensions();
        if width == 0 || height == 0 {
            return Err(WordloopError::Metadata(format!(
                "{} has no pixels",
                image_path.display()
            )));
        }
        source.save(workspace.image_path())?;

        let staged_audio = workspace.audio_path(audio_path.extension().and_then(|e| e.to_str()));
        fs::copy(audio_path, &staged_audio).await?;

        // Step 2: Speed up the clip and measure the result
        let adjusted_audio = workspace.adjusted_audio_path();
        self.media.adjust_tempo(&staged_audio, &adjusted_audio, video.tempo).await?;

        info!("Getting audio duration");
        let duration = self.media.probe_duration(&adjusted_audio).await?;

        // Step 3: One frame per adjusted clip length
        let count = frame_count(duration, video.duration_secs)?;
        let plan = GridPlan::new(width, height, &mut rng)?;
        plan.ensure_capacity(count)?;

        // Rasterizing and JPEG encoding are CPU bound; keep them off the async workers
        let renderer = Arc::clone(&self.renderer);
        let frame_word = word.clone();
        let frame_workspace = workspace.clone();
        let jpeg_quality = video.jpeg_quality;
        let frames = tokio::task::spawn_blocking(move || {
            let sequencer = FrameSequencer::new(renderer.as_ref(), jpeg_quality);
            sequencer.render_frames(
                &frame_word,
                &source,
                &plan,
                count,
                |index| frame_workspace.frame_path(index),
                &mut rng,
            )
        })
        .await??;

        // Step 4: Loop the adjusted clip to the full video length
        let looped_audio = workspace.looped_audio_path();
        self.media
            .loop_audio(&adjusted_audio, &looped_audio, video.duration_secs)
            .await?;

        // Step 5: Mux frames and looped audio
        let framerate = 1.0 / duration;
        let video_path = workspace.video_path();
        self.media
            .mux_frames(
                &workspace.frame_pattern(),
                framerate,
                &looped_audio,
                &video_path,
                video.duration_secs,
            )
            .await?;

        Ok(VideoReport {
            word: word.clone(),
            output: video_path,
            workspace: workspace.root().to_path_buf(),
            adjusted_duration: duration,
            frame_count: count,
            framerate,
            frames,
        })
    }

    /// Generate a video for every word asset found under `input_dir`
    pub async fn generate_batch(
        &self,
        input_dir: &Path,
        output_dir: Option<&Path>,
    ) -> Result<BatchSummary> {
        info!("Processing directory: {}", input_dir.display());

        if !input_dir.is_dir() {
            return Err(WordloopError::Config("Input path is not a directory".to_string()));
        }

        let output_dir = output_dir.unwrap_or(input_dir);
        fs::create_dir_all(output_dir).await?;

        let assets = find_word_assets(input_dir);
        info!("Found {} word assets to process", assets.len());

        let progress = ProgressBar::new(assets.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .map_err(|e| WordloopError::Config(format!("Invalid progress template: {}", e)))?
                .progress_chars("#>-"),
        );

        let mut summary = BatchSummary::default();
        for asset in assets {
            progress.set_message(asset.word.clone());
            let output = output_dir.join(format!("{}.mp4", asset.word));
            match self.generate(&asset.word, &asset.image, &asset.audio, Some(&output)).await {
                Ok(report) => {
                    info!("Successfully processed: {}", asset.word);
                    summary.succeeded.push(report.output);
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", asset.word, e);
                    summary.failed.push((asset.word, e.to_string()));
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        Ok(summary)
    }

    /// Measure a pronunciation clip and predict the frame count after tempo adjustment
    pub async fn probe(&self, audio_path: &Path) -> Result<ProbeReport> {
        if !audio_path.is_file() {
            return Err(WordloopError::FileNotFound(audio_path.display().to_string()));
        }
        let duration = self.media.probe_duration(audio_path).await?;
        let adjusted_duration = duration / self.config.video.tempo;
        let frame_count = frame_count(adjusted_duration, self.config.video.duration_secs).ok();

        Ok(ProbeReport {
            duration,
            adjusted_duration,
            frame_count,
        })
    }
}

/// Find `{word}.png|jpg|jpeg` images with a matching `{word}.mp3|wav|m4a|ogg`
/// clip, either beside the image or in a sibling `audios` directory.
pub fn find_word_assets(input_dir: &Path) -> Vec<WordAsset> {
    let mut assets = Vec::new();

    for entry in WalkDir::new(input_dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() || !has_extension(path, &IMAGE_EXTENSIONS) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(dir) = path.parent() else {
            continue;
        };

        let mut candidates = vec![dir.to_path_buf()];
        if let Some(parent) = dir.parent() {
            candidates.push(parent.join("audios"));
        }

        let audio = candidates.iter().find_map(|candidate| {
            AUDIO_EXTENSIONS
                .iter()
                .map(|ext| candidate.join(format!("{}.{}", stem, ext)))
                .find(|p| p.is_file())
        });

        match audio {
            Some(audio) => assets.push(WordAsset {
                word: stem.to_string(),
                image: path.to_path_buf(),
                audio,
            }),
            None => warn!("No pronunciation clip found for {}", path.display()),
        }
    }

    assets.sort_by(|a, b| a.word.cmp(&b.word).then_with(|| a.image.cmp(&b.image)));
    assets
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockMediaProcessorTrait;
    use crate::overlay::stub::BlockRenderer;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        image: PathBuf,
        audio: PathBuf,
    }

    fn fixture(word: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join(format!("{}.png", word));
        RgbaImage::from_pixel(512, 512, Rgba([10, 20, 30, 255]))
            .save(&image)
            .unwrap();
        let audio = dir.path().join(format!("{}.mp3", word));
        std::fs::write(&audio, b"ID3").unwrap();
        Fixture { dir, image, audio }
    }

    fn config_in(dir: &Path, keep: bool) -> Config {
        let mut config = Config::default();
        config.storage.work_dir = dir.join("work");
        config.storage.keep_intermediates = keep;
        config.seed = Some(1234);
        config
    }

    fn media_with_duration(duration: f64) -> MockMediaProcessorTrait {
        let mut media = MockMediaProcessorTrait::new();
        media
            .expect_adjust_tempo()
            .withf(|_, _, tempo| *tempo == 1.5)
            .times(1)
            .returning(|_, _, _| Ok(()));
        media
            .expect_probe_duration()
            .times(1)
            .returning(move |_| Ok(duration));
        media
    }

    #[tokio::test]
    async fn test_generate_two_second_clip_makes_eight_frames() {
        let fx = fixture("dog");
        let mut media = media_with_duration(2.0 / 1.5);
        media
            .expect_loop_audio()
            .withf(|input, output, duration| {
                input.ends_with("dog_adjusted.mp3") && output.ends_with("dog_looped.mp3") && *duration == 10.0
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        media
            .expect_mux_frames()
            .withf(|pattern, framerate, audio, _, duration| {
                pattern.ends_with("frames/frame_%d.jpg")
                    && (*framerate - 0.75).abs() < 1e-9
                    && audio.ends_with("dog_looped.mp3")
                    && *duration == 10.0
            })
            .times(1)
            .returning(|_, _, _, output, _| {
                std::fs::write(output, b"mp4")?;
                Ok(())
            });

        let workflow = Workflow::with_components(
            config_in(fx.dir.path(), true),
            Box::new(media),
            Box::new(BlockRenderer),
        )
        .unwrap();
        let output = fx.dir.path().join("out").join("dog.mp4");
        let report = workflow
            .generate("dog", &fx.image, &fx.audio, Some(&output))
            .await
            .unwrap();

        assert_eq!(report.frame_count, 8);
        assert_eq!(report.frames.len(), 8);
        assert_eq!(report.output, output);
        assert!(output.is_file());
        for (i, frame) in report.frames.iter().enumerate() {
            assert_eq!(frame.index, i);
            assert!(frame.path.is_file());
        }
        assert!(report.workspace.join("dog.png").is_file());
        assert!(report.workspace.join("dog.mp3").is_file());
    }

    #[tokio::test]
    async fn test_generate_one_second_clip_needs_too_many_cells() {
        let fx = fixture("cat");
        let mut media = media_with_duration(1.0 / 1.5);
        media.expect_loop_audio().times(0);
        media.expect_mux_frames().times(0);

        let workflow = Workflow::with_components(
            config_in(fx.dir.path(), false),
            Box::new(media),
            Box::new(BlockRenderer),
        )
        .unwrap();
        let err = workflow
            .generate("cat", &fx.image, &fx.audio, None)
            .await
            .unwrap_err();

        assert!(matches!(err, WordloopError::InsufficientCells { requested: 15, available: 14 }));
        assert!(!fx.dir.path().join("cat.mp4").exists());
        // workspace removed when intermediates are not kept
        let leftovers = std::fs::read_dir(fx.dir.path().join("work")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_generate_zero_duration_is_division_error() {
        let fx = fixture("cat");
        let mut media = media_with_duration(0.0);
        media.expect_loop_audio().times(0);
        media.expect_mux_frames().times(0);

        let workflow = Workflow::with_components(
            config_in(fx.dir.path(), true),
            Box::new(media),
            Box::new(BlockRenderer),
        )
        .unwrap();
        let err = workflow
            .generate("cat", &fx.image, &fx.audio, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WordloopError::Division(_)));
    }

    #[tokio::test]
    async fn test_mux_failure_propagates() {
        let fx = fixture("dog");
        let mut media = media_with_duration(2.0);
        media.expect_loop_audio().times(1).returning(|_, _, _| Ok(()));
        media
            .expect_mux_frames()
            .times(1)
            .returning(|_, _, _, _, _| Err(WordloopError::Encoding("Video muxing failed: libx264 missing".to_string())));

        let workflow = Workflow::with_components(
            config_in(fx.dir.path(), true),
            Box::new(media),
            Box::new(BlockRenderer),
        )
        .unwrap();
        let err = workflow
            .generate("dog", &fx.image, &fx.audio, None)
            .await
            .unwrap_err();
        match err {
            WordloopError::Encoding(message) => assert!(message.contains("libx264")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!fx.dir.path().join("dog.mp4").exists());
    }

    #[tokio::test]
    async fn test_generate_rejects_missing_inputs_and_empty_word() {
        let fx = fixture("dog");
        let workflow = Workflow::with_components(
            config_in(fx.dir.path(), true),
            Box::new(MockMediaProcessorTrait::new()),
            Box::new(BlockRenderer),
        )
        .unwrap();

        let missing = fx.dir.path().join("nope.mp3");
        let err = workflow.generate("dog", &fx.image, &missing, None).await.unwrap_err();
        assert!(matches!(err, WordloopError::FileNotFound(_)));

        let err = workflow.generate("  ", &fx.image, &fx.audio, None).await.unwrap_err();
        assert!(matches!(err, WordloopError::InvalidWord(_)));
    }

    #[tokio::test]
    async fn test_probe_predicts_frame_count() {
        let fx = fixture("dog");
        let mut media = MockMediaProcessorTrait::new();
        media.expect_probe_duration().returning(|_| Ok(2.0));
        let workflow = Workflow::with_components(
            config_in(fx.dir.path(), true),
            Box::new(media),
            Box::new(BlockRenderer),
        )
        .unwrap();

        let report = workflow.probe(&fx.audio).await.unwrap();
        assert_eq!(report.duration, 2.0);
        assert!((report.adjusted_duration - 2.0 / 1.5).abs() < 1e-12);
        assert_eq!(report.frame_count, Some(8));
    }

    #[test]
    fn test_with_components_validates_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path(), true);
        config.overlay.min_font_size = 80;
        config.overlay.max_font_size = 80;

        let result = Workflow::with_components(
            config,
            Box::new(MockMediaProcessorTrait::new()),
            Box::new(BlockRenderer),
        );
        assert!(matches!(result, Err(WordloopError::Config(_))));
    }

    #[test]
    fn test_find_word_assets() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("dog.png"), b"png").unwrap();
        std::fs::write(root.join("dog.mp3"), b"mp3").unwrap();
        std::fs::write(root.join("lonely.jpg"), b"jpg").unwrap();
        std::fs::write(root.join("notes.txt"), b"txt").unwrap();

        std::fs::create_dir_all(root.join("public/images")).unwrap();
        std::fs::create_dir_all(root.join("public/audios")).unwrap();
        std::fs::write(root.join("public/images/cat.PNG"), b"png").unwrap();
        std::fs::write(root.join("public/audios/cat.wav"), b"wav").unwrap();

        let assets = find_word_assets(root);
        let words: Vec<&str> = assets.iter().map(|a| a.word.as_str()).collect();
        assert_eq!(words, vec!["cat", "dog"]);
        assert_eq!(assets[0].audio, root.join("public/audios/cat.wav"));
        assert_eq!(assets[1].audio, root.join("dog.mp3"));
    }
}
