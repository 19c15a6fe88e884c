use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::{RgbImage, RgbaImage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Result, WordloopError};
use crate::grid::{Cell, GridPlan};
use crate::overlay::OverlayRenderer;
use crate::random::RandomSource;
use crate::word::Word;

/// Shortest adjusted clip we accept before the frame count blows up
const MIN_DURATION_SECS: f64 = 1e-6;

/// Number of frames for a clip of `duration` seconds looped over `total` seconds
pub fn frame_count(duration: f64, total: f64) -> Result<usize> {
    if !duration.is_finite() || duration < MIN_DURATION_SECS {
        return Err(WordloopError::Division(duration));
    }
    let count = (total / duration).round();
    // A clip longer than twice the video would yield no frame at all
    if count < 1.0 {
        return Err(WordloopError::Division(duration));
    }
    Ok(count as usize)
}

/// One saved overlay frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    pub cell: Cell,
    pub anchor: (u32, u32),
    pub font_size: u32,
    pub path: PathBuf,
}

pub struct FrameSequencer<'a> {
    renderer: &'a dyn OverlayRenderer,
    jpeg_quality: u8,
}

impl<'a> FrameSequencer<'a> {
    pub fn new(renderer: &'a dyn OverlayRenderer, jpeg_quality: u8) -> Self {
        Self {
            renderer,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    /// Render `count` frames, each one drawn on top of the previous frame's
    /// output, and save frame `i` to `frame_path(i)`.
    ///
    /// Fails before drawing anything if the plan has fewer than `count` cells.
    pub fn render_frames<F>(
        &self,
        word: &Word,
        source: &RgbaImage,
        plan: &GridPlan,
        count: usize,
        frame_path: F,
        rng: &mut RandomSource,
    ) -> Result<Vec<Frame>>
    where
        F: Fn(usize) -> PathBuf,
    {
        plan.ensure_capacity(count)?;
        info!("Placing text {} times", count);

        let mut frames = Vec::with_capacity(count);
        plan.cursor().take(count).enumerate().try_fold(
            None::<RgbaImage>,
            |previous, (index, cell)| -> Result<Option<RgbaImage>> {
                let current = previous.as_ref().unwrap_or(source);
                let anchor = plan.anchor(cell);
                info!("Placing text at cell ({}, {})", cell.x, cell.y);

                let rendered = self.renderer.draw(current, word, anchor, rng)?;
                let path = frame_path(index);
                save_jpeg(&rendered.image, &path, self.jpeg_quality)?;
                info!("Image with text saved to {}", path.display());

                frames.push(Frame {
                    index,
                    cell,
                    anchor,
                    font_size: rendered.font_size,
                    path,
                });
                Ok(Some(rendered.image))
            },
        )?;

        Ok(frames)
    }
}

fn save_jpeg(image: &RgbaImage, path: &Path, quality: u8) -> Result<()> {
    let rgb: RgbImage = image.convert();
    let mut writer = BufWriter::new(File::create(path)?);
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))?;
    writer.flush()?;
    Ok(())
}
