use std::path::Path;
use std::sync::Arc;
use std::thread;

use ab_glyph::{Font, FontArc, OutlineCurve, PxScale, ScaleFont};
use anyhow::{anyhow, Context, Result};
use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use tiny_skia::{
    FillRule, FilterQuality, IntSize, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PixmapPaint,
    Rect, Stroke as SkiaStroke, Transform,
};

use crate::annotation::{Color, Marker, Stroke};
use crate::export::{
    estimated_advance, RasterHandle, RasterOptions, Rasterizer, SceneSnapshot, FOOTER_COLOR,
    FOOTER_FONT_SIZE, FOOTER_PADDING, FOOTER_RULE_WIDTH,
};

/// Composites background, strokes, markers and footer into one opaque image.
pub struct Flattener {
    font: Option<FontArc>,
}

impl Flattener {
    pub fn new(font: Option<FontArc>) -> Self {
        Self { font }
    }

    pub fn with_system_font(custom: Option<&Path>) -> Self {
        let font = load_font(custom);
        if font.is_none() {
            tracing::warn!("no usable font found; exported glyph markers and notes will be blank");
        }
        Self::new(font)
    }

    /// Footer text width at unscaled size, from the loaded font when there is one.
    fn footer_advance(&self, text: &str) -> f32 {
        match self.font.as_ref() {
            Some(font) => text_advance(font, FOOTER_FONT_SIZE, text),
            None => estimated_advance(text),
        }
    }

    pub fn flatten(&self, scene: &SceneSnapshot, scale: f32) -> Result<RgbaImage> {
        let measure = |text: &str| self.footer_advance(text);
        let layout = scene.footer_layout(&measure);
        let footer_height = layout.as_ref().map_or(0.0, |layout| layout.height);

        let width = (scene.bounds.width * scale).ceil().max(1.0) as u32;
        let height = ((scene.bounds.height + footer_height) * scale).ceil().max(1.0) as u32;
        let mut pixmap =
            Pixmap::new(width, height).ok_or_else(|| anyhow!("cannot allocate pixmap"))?;
        pixmap.fill(tiny_skia::Color::WHITE);

        draw_background(&mut pixmap, scene, scale)?;

        for stroke in &scene.strokes {
            draw_stroke(&mut pixmap, stroke, scale)?;
        }
        // Store order is stacking order: later markers cover earlier ones.
        for marker in &scene.markers {
            match (marker.kind.glyph(), self.font.as_ref()) {
                (None, _) => fill_disc(&mut pixmap, marker, scale)?,
                (Some(glyph), Some(font)) => fill_glyph(&mut pixmap, font, glyph, marker, scale),
                (Some(_), None) => {}
            }
        }

        if let Some(layout) = layout.as_ref() {
            let rule = Rect::from_xywh(
                0.0,
                (scene.bounds.height + layout.rule_y) * scale,
                width as f32,
                FOOTER_RULE_WIDTH * scale,
            )
            .ok_or_else(|| anyhow!("invalid footer rule"))?;
            pixmap.fill_rect(rule, &paint_for(FOOTER_COLOR), Transform::identity(), None);
        }

        let mut output = RgbaImage::from_raw(width, height, pixmap.data().to_vec())
            .ok_or_else(|| anyhow!("cannot construct output image"))?;

        if let (Some(font), Some(layout)) = (self.font.as_ref(), layout) {
            let color = Rgba(FOOTER_COLOR.as_array());
            for line in layout.lines.iter().filter(|line| !line.text.is_empty()) {
                draw_text_mut(
                    &mut output,
                    color,
                    (FOOTER_PADDING * scale) as i32,
                    ((scene.bounds.height + line.y) * scale) as i32,
                    FOOTER_FONT_SIZE * scale,
                    font,
                    &line.text,
                );
            }
        }

        Ok(output)
    }
}

impl Rasterizer for Flattener {
    fn request(&self, scene: SceneSnapshot, options: RasterOptions) -> Result<RasterHandle> {
        Ok(RasterHandle::ready(self.flatten(&scene, options.scale)))
    }
}

/// Runs the flatten on a worker thread so the UI keeps drawing meanwhile.
#[derive(Clone)]
pub struct ThreadedRasterizer {
    inner: Arc<Flattener>,
}

impl ThreadedRasterizer {
    pub fn new(inner: Flattener) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl Rasterizer for ThreadedRasterizer {
    fn request(&self, scene: SceneSnapshot, options: RasterOptions) -> Result<RasterHandle> {
        let (tx, handle) = RasterHandle::channel();
        let flattener = Arc::clone(&self.inner);
        thread::Builder::new()
            .name("rasterize".to_string())
            .spawn(move || {
                let result = flattener.flatten(&scene, options.scale);
                if let Err(err) = &result {
                    tracing::error!("rasterization failed: {err:#}");
                }
                let _ = tx.send(result);
            })
            .context("cannot start rasterizer thread")?;
        Ok(handle)
    }
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .context("cannot encode PNG")?;
    Ok(buffer.into_inner())
}

fn paint_for(color: Color) -> Paint<'static> {
    let [r, g, b, a] = color.as_array();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

fn draw_background(pixmap: &mut Pixmap, scene: &SceneSnapshot, scale: f32) -> Result<()> {
    let source = &scene.background;
    if source.width() == 0 || source.height() == 0 {
        return Ok(());
    }

    let mut data = source.as_raw().clone();
    for px in data.chunks_exact_mut(4) {
        let alpha = px[3] as u16;
        for channel in &mut px[..3] {
            *channel = ((*channel as u16 * alpha + 127) / 255) as u8;
        }
    }
    let size = IntSize::from_wh(source.width(), source.height())
        .ok_or_else(|| anyhow!("invalid background size"))?;
    let background =
        Pixmap::from_vec(data, size).ok_or_else(|| anyhow!("cannot wrap background pixels"))?;

    let sx = scene.bounds.width * scale / source.width() as f32;
    let sy = scene.bounds.height * scale / source.height() as f32;
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(
        0,
        0,
        background.as_ref(),
        &paint,
        Transform::from_scale(sx, sy),
        None,
    );
    Ok(())
}

fn draw_stroke(pixmap: &mut Pixmap, stroke: &Stroke, scale: f32) -> Result<()> {
    let paint = paint_for(stroke.paint_color());
    let width = stroke.width * scale;

    if let [only] = stroke.points.as_slice() {
        let mut pb = PathBuilder::new();
        pb.push_circle(only.x * scale, only.y * scale, width * 0.5);
        let dot = pb.finish().ok_or_else(|| anyhow!("cannot build stroke dot"))?;
        pixmap.fill_path(&dot, &paint, FillRule::Winding, Transform::identity(), None);
        return Ok(());
    }

    let mut points = stroke.points.iter();
    let Some(first) = points.next() else {
        return Ok(());
    };
    let mut pb = PathBuilder::new();
    pb.move_to(first.x * scale, first.y * scale);
    for point in points {
        pb.line_to(point.x * scale, point.y * scale);
    }
    let path = pb.finish().ok_or_else(|| anyhow!("cannot build stroke path"))?;
    let outline = SkiaStroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    };
    pixmap.stroke_path(&path, &paint, &outline, Transform::identity(), None);
    Ok(())
}

fn fill_disc(pixmap: &mut Pixmap, marker: &Marker, scale: f32) -> Result<()> {
    let radius = marker.size * 0.5;
    let mut pb = PathBuilder::new();
    pb.push_circle(
        (marker.position.x + radius) * scale,
        (marker.position.y + radius) * scale,
        (radius * scale).max(0.5),
    );
    let path = pb.finish().ok_or_else(|| anyhow!("cannot build marker disc"))?;
    pixmap.fill_path(
        &path,
        &paint_for(marker.color),
        FillRule::Winding,
        Transform::identity(),
        None,
    );
    Ok(())
}

fn fill_glyph(pixmap: &mut Pixmap, font: &FontArc, glyph: &str, marker: &Marker, scale: f32) {
    let origin = (marker.position.x * scale, marker.position.y * scale);
    let Some(path) = text_path(font, glyph, origin, marker.size * scale) else {
        return;
    };
    pixmap.fill_path(
        &path,
        &paint_for(marker.color),
        FillRule::Winding,
        Transform::identity(),
        None,
    );
}

/// Horizontal advance of `text` at `size` px, kerning included.
pub fn text_advance(font: &FontArc, size: f32, text: &str) -> f32 {
    let scaled = font.as_scaled(PxScale::from(size));
    let mut width = 0.0;
    let mut previous = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        previous = Some(id);
    }
    width
}

/// Glyph outlines of `text` set on one line with its top-left at `origin`, as a single path.
/// `None` when nothing in `text` has an outline.
fn text_path(
    font: &FontArc,
    text: &str,
    origin: (f32, f32),
    size: f32,
) -> Option<tiny_skia::Path> {
    let scaled = font.as_scaled(PxScale::from(size));
    let (sx, sy) = (scaled.h_scale_factor(), scaled.v_scale_factor());
    let baseline = origin.1 + scaled.ascent();
    let mut pen_x = origin.0;
    let mut previous = None;
    let mut pb = PathBuilder::new();

    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            pen_x += scaled.kern(prev, id);
        }
        if let Some(outline) = font.outline(id) {
            let left = pen_x;
            // Outlines are in font units with y pointing up.
            let map = |p: ab_glyph::Point| (left + p.x * sx, baseline - p.y * sy);
            let mut contour_end: Option<(f32, f32)> = None;
            for curve in &outline.curves {
                let (start, end) = match *curve {
                    OutlineCurve::Line(a, b) => (a, b),
                    OutlineCurve::Quad(a, _, b) => (a, b),
                    OutlineCurve::Cubic(a, _, _, b) => (a, b),
                };
                let start = map(start);
                if contour_end != Some(start) {
                    if contour_end.is_some() {
                        pb.close();
                    }
                    pb.move_to(start.0, start.1);
                }
                match *curve {
                    OutlineCurve::Line(_, b) => {
                        let b = map(b);
                        pb.line_to(b.0, b.1);
                    }
                    OutlineCurve::Quad(_, c, b) => {
                        let (c, b) = (map(c), map(b));
                        pb.quad_to(c.0, c.1, b.0, b.1);
                    }
                    OutlineCurve::Cubic(_, c1, c2, b) => {
                        let (c1, c2, b) = (map(c1), map(c2), map(b));
                        pb.cubic_to(c1.0, c1.1, c2.0, c2.1, b.0, b.1);
                    }
                }
                contour_end = Some(map(end));
            }
            if contour_end.is_some() {
                pb.close();
            }
        }
        pen_x += scaled.h_advance(id);
        previous = Some(id);
    }

    pb.finish()
}

/// The proportional face egui ships with.
fn bundled_font() -> Option<FontArc> {
    let definitions = egui::FontDefinitions::default();
    let data = definitions.font_data.get("Ubuntu-Light")?;
    FontArc::try_from_vec(data.font.to_vec()).ok()
}

pub fn load_font(custom: Option<&Path>) -> Option<FontArc> {
    const CANDIDATES: [&str; 8] = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "C:\\Windows\\Fonts\\seguisym.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];

    let custom = custom.into_iter().map(Path::to_path_buf);
    let defaults = CANDIDATES.iter().map(|path| Path::new(path).to_path_buf());
    for path in custom.chain(defaults) {
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        match FontArc::try_from_vec(bytes) {
            Ok(font) => {
                tracing::debug!(path = %path.display(), "loaded export font");
                return Some(font);
            }
            Err(err) => tracing::warn!(path = %path.display(), "unusable font: {err}"),
        }
    }

    tracing::debug!("no system font found, using the bundled face");
    bundled_font()
}
