//! Word-on-image overlay.
//!
//! The word is laid out as SVG text so glyph metrics come from a real shaping
//! pass: a first tree measures the rendered bounding box at the chosen font
//! size, a second full-canvas tree draws the word with its drop shadow at the
//! clamped position. The rasterized overlay is then alpha-composited onto the
//! previous image at the origin.

use image::RgbaImage;
use resvg::tiny_skia;
use tracing::{debug, warn};
use usvg::fontdb;

use crate::config::OverlayConfig;
use crate::error::{Result, WordloopError};
use crate::random::RandomSource;
use crate::word::{Word, escape_xml};

/// Rendered size of the word at a given font size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: f32,
    pub height: f32,
}

/// Where the text is drawn: `x` is the left edge, `y` the baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    pub x: f32,
    pub y: f32,
}

/// Center the text on `anchor`, apply vertical jitter, then push it back
/// inside the image with `padding`.
///
/// Each edge rule is applied once, in order (left, top, right, bottom), and
/// is not re-checked against the others. Text wider or taller than the image
/// minus padding can therefore still overflow one side.
pub fn place_text(
    anchor: (u32, u32),
    extent: TextExtent,
    image_size: (u32, u32),
    jitter: i32,
    padding: f32,
) -> TextPlacement {
    let (anchor_x, anchor_y) = (anchor.0 as f32, anchor.1 as f32);
    let (width, height) = (image_size.0 as f32, image_size.1 as f32);

    let mut x = anchor_x - extent.width / 2.0;
    let mut y = anchor_y + extent.height / 2.0 + jitter as f32;

    if x < 0.0 {
        x = padding;
    }
    if y < extent.height {
        y = extent.height + padding;
    }
    if x + extent.width > width {
        x = width - extent.width - padding;
    }
    if y > height {
        y = height - padding;
    }

    TextPlacement { x, y }
}

/// Result of drawing one word onto an image
#[derive(Debug, Clone)]
pub struct RenderedOverlay {
    pub image: RgbaImage,
    pub font_size: u32,
    pub extent: TextExtent,
    pub placement: TextPlacement,
}

/// Draws one word overlay onto a copy of the current frame image
pub trait OverlayRenderer: Send + Sync {
    fn draw(
        &self,
        current: &RgbaImage,
        word: &Word,
        anchor: (u32, u32),
        rng: &mut RandomSource,
    ) -> Result<RenderedOverlay>;
}

pub struct TextOverlayRenderer {
    config: OverlayConfig,
    options: usvg::Options<'static>,
}

impl TextOverlayRenderer {
    pub fn new(config: OverlayConfig) -> Self {
        let mut options = usvg::Options::default();
        {
            let db = options.fontdb_mut();
            db.load_system_fonts();
            for dir in &config.font_dirs {
                db.load_fonts_dir(dir);
            }
            ensure_sans_serif_fallback(db);
            debug!("Font database loaded with {} faces", db.len());
        }
        if options.fontdb.is_empty() {
            warn!("No fonts found; text overlays cannot be rendered until fonts are installed or overlay.font_dirs is set");
        }

        Self { config, options }
    }

    /// Whether any font face is available for shaping
    pub fn has_fonts(&self) -> bool {
        !self.options.fontdb.is_empty()
    }

    /// Measure the rendered bounding box of `word` at `font_size`
    pub fn measure(&self, word: &Word, font_size: u32) -> Result<TextExtent> {
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><text x="0" y="0" font-family="{}" font-size="{}px" font-weight="{}">{}</text></svg>"#,
            escape_xml(&self.config.font_family),
            font_size,
            escape_xml(&self.config.font_weight),
            word.escaped(),
        );
        let tree = usvg::Tree::from_data(svg.as_bytes(), &self.options)
            .map_err(|e| WordloopError::Svg(format!("Failed to parse measurement SVG: {}", e)))?;

        let text = find_text(tree.root()).ok_or_else(|| {
            WordloopError::Metadata(format!("no glyphs could be shaped for '{}'", word))
        })?;
        let bbox = text.bounding_box();
        let extent = TextExtent {
            width: bbox.width().ceil(),
            height: bbox.height().ceil(),
        };
        if !(extent.width > 0.0 && extent.height > 0.0) {
            return Err(WordloopError::Metadata(format!(
                "rendered text '{}' has no size ({}x{})",
                word, extent.width, extent.height
            )));
        }
        Ok(extent)
    }

    /// Full-canvas SVG drawing `word` at `placement` with a drop shadow
    pub fn overlay_svg(
        &self,
        word: &Word,
        size: (u32, u32),
        font_size: u32,
        placement: TextPlacement,
    ) -> String {
        let c = &self.config;
        format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
                r#"<defs><filter id="shadow" x="-50%" y="-50%" width="200%" height="200%">"#,
                r#"<feGaussianBlur in="SourceAlpha" stdDeviation="{blur}" result="blur"/>"#,
                r#"<feOffset in="blur" dx="{offset}" dy="{offset}" result="offsetBlur"/>"#,
                r#"<feMerge><feMergeNode in="offsetBlur"/><feMergeNode in="SourceGraphic"/></feMerge>"#,
                r#"</filter></defs>"#,
                r#"<text x="{x}" y="{y}" font-family="{family}" font-size="{size}px" font-weight="{weight}" fill="{fill}" filter="url(#shadow)">{word}</text>"#,
                r#"</svg>"#,
            ),
            w = size.0,
            h = size.1,
            blur = c.shadow_blur,
            offset = c.shadow_offset,
            x = placement.x,
            y = placement.y,
            family = escape_xml(&c.font_family),
            size = font_size,
            weight = escape_xml(&c.font_weight),
            fill = escape_xml(&c.fill_color),
            word = word.escaped(),
        )
    }

    /// Draw `word` near `anchor` onto a copy of `source`
    pub fn render(
        &self,
        source: &RgbaImage,
        word: &Word,
        anchor: (u32, u32),
        rng: &mut RandomSource,
    ) -> Result<RenderedOverlay> {
        let (width, height) = source.dimensions();
        if width == 0 || height == 0 {
            return Err(WordloopError::Metadata("source image has no pixels".to_string()));
        }

        let font_size = rng.font_size(self.config.min_font_size, self.config.max_font_size);
        let extent = self.measure(word, font_size)?;
        let jitter = rng.jitter(self.config.jitter);
        let placement = place_text(anchor, extent, (width, height), jitter, self.config.padding);

        debug!(
            "Placing '{}' at ({:.1}, {:.1}) size {}px, extent {}x{}, jitter {}",
            word, placement.x, placement.y, font_size, extent.width, extent.height, jitter
        );

        let svg = self.overlay_svg(word, (width, height), font_size, placement);
        let tree = usvg::Tree::from_data(svg.as_bytes(), &self.options)
            .map_err(|e| WordloopError::Svg(format!("Failed to parse overlay SVG: {}", e)))?;

        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| WordloopError::Svg(format!("failed to allocate {}x{} overlay", width, height)))?;
        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        let overlay = pixmap_to_rgba(&pixmap)?;
        let mut image = source.clone();
        image::imageops::overlay(&mut image, &overlay, 0, 0);

        Ok(RenderedOverlay {
            image,
            font_size,
            extent,
            placement,
        })
    }
}

impl OverlayRenderer for TextOverlayRenderer {
    fn draw(
        &self,
        current: &RgbaImage,
        word: &Word,
        anchor: (u32, u32),
        rng: &mut RandomSource,
    ) -> Result<RenderedOverlay> {
        self.render(current, word, anchor, rng)
    }
}

fn find_text(group: &usvg::Group) -> Option<&usvg::Text> {
    group.children().iter().find_map(|node| match node {
        usvg::Node::Text(text) => Some(&**text),
        usvg::Node::Group(group) => find_text(group),
        usvg::Node::Path(_) | usvg::Node::Image(_) => None,
    })
}

/// Point the generic sans-serif family at an installed face when the
/// default one (Arial) is missing
fn ensure_sans_serif_fallback(db: &mut fontdb::Database) {
    let query = fontdb::Query {
        families: &[fontdb::Family::SansSerif],
        ..Default::default()
    };
    if db.query(&query).is_some() {
        return;
    }
    let fallback = db
        .faces()
        .find_map(|face| face.families.first().map(|(name, _)| name.clone()));
    if let Some(name) = fallback {
        debug!("Using '{}' as sans-serif fallback", name);
        db.set_sans_serif_family(name);
    }
}

fn pixmap_to_rgba(pixmap: &tiny_skia::Pixmap) -> Result<RgbaImage> {
    let mut data = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        data.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
        .ok_or_else(|| WordloopError::Metadata("overlay buffer size mismatch".to_string()))
}
