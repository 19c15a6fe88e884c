use assert_fs::prelude::*;
use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use std::path::Path;
use std::sync::{Arc, Mutex};

use wordloop::config::Config;
use wordloop::error::{Result, WordloopError};
use wordloop::media::MediaProcessorTrait;
use wordloop::overlay::{OverlayRenderer, RenderedOverlay, TextExtent, TextPlacement};
use wordloop::random::RandomSource;
use wordloop::word::Word;
use wordloop::workflow::Workflow;

/// Stands in for ffmpeg: records each step and writes placeholder outputs.
/// The adjusted clip length is looked up from the word in the file name.
struct FakeMedia {
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeMedia {
    fn new() -> Self {
        Self { calls: Arc::new(Mutex::new(Vec::new())) }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn word_of(path: &Path) -> String {
    let name = path.file_name().unwrap().to_string_lossy();
    name.split(['_', '.']).next().unwrap().to_string()
}

#[async_trait]
impl MediaProcessorTrait for FakeMedia {
    async fn adjust_tempo(&self, input: &Path, output: &Path, tempo: f64) -> Result<()> {
        self.record(format!("tempo {} {}", word_of(input), tempo));
        std::fs::copy(input, output)?;
        Ok(())
    }

    async fn probe_duration(&self, input: &Path) -> Result<f64> {
        self.record(format!("probe {}", word_of(input)));
        match word_of(input).as_str() {
            "dog" => Ok(2.0 / 1.5),
            "cat" => Ok(1.0 / 1.5),
            "owl" => Ok(10.0),
            other => Err(WordloopError::Encoding(format!("no clip for {}", other))),
        }
    }

    async fn loop_audio(&self, input: &Path, output: &Path, duration: f64) -> Result<()> {
        self.record(format!("loop {} {}", word_of(input), duration));
        std::fs::write(output, b"looped")?;
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
        let frames = std::fs::read_dir(frame_pattern.parent().unwrap())?.count();
        self.record(format!("mux {} {} frames {:.2} for {}", word_of(audio), frames, framerate, duration));
        std::fs::write(output, b"mp4")?;
        Ok(())
    }

    fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

/// Draws a one-pixel red dot at the anchor
struct DotRenderer;

impl OverlayRenderer for DotRenderer {
    fn draw(&self, current: &RgbaImage, _word: &Word, anchor: (u32, u32), _rng: &mut RandomSource) -> Result<RenderedOverlay> {
        let mut image = current.clone();
        image.put_pixel(anchor.0, anchor.1, Rgba([255, 0, 0, 255]));
        Ok(RenderedOverlay {
            image,
            font_size: 50,
            extent: TextExtent { width: 1.0, height: 1.0 },
            placement: TextPlacement { x: anchor.0 as f32, y: anchor.1 as f32 },
        })
    }
}

fn write_image(child: &assert_fs::fixture::ChildPath) {
    RgbaImage::from_pixel(512, 512, Rgba([255, 255, 255, 255]))
        .save(child.path())
        .unwrap();
}

fn config(work_dir: &Path, keep: bool) -> Config {
    let mut config = Config::default();
    config.storage.work_dir = work_dir.to_path_buf();
    config.storage.keep_intermediates = keep;
    config.seed = Some(99);
    config
}

#[tokio::test]
async fn generate_runs_steps_in_order() {
    let temp = assert_fs::TempDir::new().unwrap();
    let image = temp.child("dog.png");
    write_image(&image);
    let audio = temp.child("dog.mp3");
    audio.write_binary(b"ID3").unwrap();
    let work = temp.child("work");

    let media = FakeMedia::new();
    let calls = Arc::clone(&media.calls);
    let workflow = Workflow::with_components(
        config(work.path(), true),
        Box::new(media),
        Box::new(DotRenderer),
    )
    .unwrap();

    let report = workflow
        .generate("dog", image.path(), audio.path(), None)
        .await
        .unwrap();

    assert_eq!(report.frame_count, 8);
    assert_eq!(report.output, temp.path().join("dog.mp4"));
    assert!(report.output.is_file());
    assert!((report.framerate - 0.75).abs() < 1e-9);

    let frames_dir = report.workspace.join("frames");
    for i in 0..8 {
        assert!(frames_dir.join(format!("frame_{}.jpg", i)).is_file());
    }
    assert!(!frames_dir.join("frame_8.jpg").exists());
    assert!(report.workspace.join("dog_adjusted.mp3").is_file());
    assert!(report.workspace.join("dog_looped.mp3").is_file());

    let calls = calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            "tempo dog 1.5".to_string(),
            "probe dog".to_string(),
            "loop dog 10".to_string(),
            "mux dog 8 frames 0.75 for 10".to_string(),
        ]
    );
}

#[tokio::test]
async fn generate_without_intermediates_cleans_up() {
    let temp = assert_fs::TempDir::new().unwrap();
    let image = temp.child("owl.png");
    write_image(&image);
    let audio = temp.child("owl.mp3");
    audio.write_binary(b"ID3").unwrap();
    let work = temp.child("work");
    let output = temp.child("videos/owl.mp4");

    let workflow = Workflow::with_components(
        config(work.path(), false),
        Box::new(FakeMedia::new()),
        Box::new(DotRenderer),
    )
    .unwrap();
    let report = workflow
        .generate("owl", image.path(), audio.path(), Some(output.path()))
        .await
        .unwrap();

    assert_eq!(report.frame_count, 1);
    assert!(output.path().is_file());
    assert!(!report.workspace.exists());
}

#[tokio::test]
async fn batch_reports_successes_and_failures() {
    let temp = assert_fs::TempDir::new().unwrap();
    let input = temp.child("public");
    input.create_dir_all().unwrap();
    write_image(&input.child("dog.png"));
    input.child("dog.mp3").write_binary(b"ID3").unwrap();
    write_image(&input.child("cat.png"));
    input.child("cat.mp3").write_binary(b"ID3").unwrap();
    let out = temp.child("out");

    let workflow = Workflow::with_components(
        config(temp.child("work").path(), false),
        Box::new(FakeMedia::new()),
        Box::new(DotRenderer),
    )
    .unwrap();
    let summary = workflow
        .generate_batch(input.path(), Some(out.path()))
        .await
        .unwrap();

    assert_eq!(summary.succeeded, vec![out.path().join("dog.mp4")]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "cat");
    assert!(summary.failed[0].1.contains("15"));
    assert!(!out.path().join("cat.mp4").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_generations_use_separate_workspaces() {
    let temp = assert_fs::TempDir::new().unwrap();
    let image = temp.child("dog.png");
    write_image(&image);
    let audio = temp.child("dog.mp3");
    audio.write_binary(b"ID3").unwrap();
    let work = temp.child("work");

    let workflow = Arc::new(
        Workflow::with_components(config(work.path(), true), Box::new(FakeMedia::new()), Box::new(DotRenderer))
            .unwrap(),
    );

    let handles: Vec<_> = (0..2)
        .map(|i| {
            let workflow = Arc::clone(&workflow);
            let image = image.path().to_path_buf();
            let audio = audio.path().to_path_buf();
            let output = temp.path().join(format!("out-{}/dog.mp4", i));
            tokio::spawn(async move { workflow.generate("dog", &image, &audio, Some(&output)).await })
        })
        .collect();

    let mut workspaces = Vec::new();
    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.frame_count, 8);
        assert!(report.output.is_file());
        workspaces.push(report.workspace);
    }
    assert_ne!(workspaces[0], workspaces[1]);
    assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 2);
}
