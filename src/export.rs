use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use image::RgbaImage;

use crate::annotation::{Color, Marker, Stroke};
use crate::geometry::SurfaceBounds;
use crate::store::AnnotationStore;

pub const FOOTER_MARGIN_TOP: f32 = 10.0;
pub const FOOTER_RULE_WIDTH: f32 = 2.0;
pub const FOOTER_PADDING: f32 = 10.0;
pub const FOOTER_FONT_SIZE: f32 = 16.0;
pub const FOOTER_LINE_HEIGHT: f32 = FOOTER_FONT_SIZE * 1.25;
pub const FOOTER_COLOR: Color = Color::RED;

/// Read-only notes block appended below the surface while an export is captured.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataFooter {
    pub positive: String,
    pub negative: String,
    pub notes: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FooterLine {
    pub text: String,
    /// Top of the line, relative to the footer's top edge.
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FooterLayout {
    pub height: f32,
    /// Offset of the separator rule from the footer's top edge.
    pub rule_y: f32,
    pub lines: Vec<FooterLine>,
}

impl MetadataFooter {
    fn blocks(&self) -> Vec<(&'static str, &str)> {
        let mut blocks = vec![
            ("Positive Adj:", self.positive.as_str()),
            ("Negative Adj:", self.negative.as_str()),
        ];
        if !self.notes.trim().is_empty() {
            blocks.push(("Notes:", self.notes.as_str()));
        }
        blocks
    }

    /// Lays the blocks out top to bottom. Each `\n` starts a new line and lines wider than
    /// `max_width` (as measured by `advance`) wrap at spaces, or mid-word when one word
    /// alone is too wide. No characters are dropped except the separating spaces.
    pub fn layout(&self, max_width: f32, advance: &dyn Fn(&str) -> f32) -> FooterLayout {
        let rule_y = FOOTER_MARGIN_TOP;
        let mut y = FOOTER_MARGIN_TOP + FOOTER_RULE_WIDTH;
        let mut lines = Vec::new();
        let mut push = |text: String, y: &mut f32| {
            lines.push(FooterLine { text, y: *y });
            *y += FOOTER_LINE_HEIGHT;
        };

        for (heading, body) in self.blocks() {
            y += FOOTER_PADDING;
            for row in wrap_paragraph(heading, max_width, advance) {
                push(row, &mut y);
            }
            for line in body.split('\n') {
                for row in wrap_paragraph(line.trim_end_matches('\r'), max_width, advance) {
                    push(row, &mut y);
                }
            }
            y += FOOTER_PADDING;
        }

        FooterLayout {
            height: y,
            rule_y,
            lines,
        }
    }
}

/// Width of the footer text column for a surface `surface_width` wide.
pub fn footer_wrap_width(surface_width: f32) -> f32 {
    surface_width - 2.0 * FOOTER_PADDING
}

/// Font-free advance estimate for footer text, used where no font is at hand.
pub fn estimated_advance(text: &str) -> f32 {
    text.chars().count() as f32 * FOOTER_FONT_SIZE * 0.6
}

fn wrap_paragraph(line: &str, max_width: f32, advance: &dyn Fn(&str) -> f32) -> Vec<String> {
    if max_width <= 0.0 || advance(line) <= max_width {
        return vec![line.to_string()];
    }

    let mut rows = Vec::new();
    let mut current = String::new();
    for word in line.split_inclusive(' ') {
        let candidate = format!("{current}{word}");
        if current.is_empty() || advance(candidate.trim_end()) <= max_width {
            current = candidate;
            continue;
        }
        rows.push(current.trim_end().to_string());
        current = word.to_string();
    }
    rows.push(current.trim_end().to_string());

    rows.into_iter()
        .flat_map(|row| split_long_row(row, max_width, advance))
        .collect()
}

/// Breaks a single overlong row by characters; every piece keeps at least one character.
fn split_long_row(row: String, max_width: f32, advance: &dyn Fn(&str) -> f32) -> Vec<String> {
    if advance(&row) <= max_width {
        return vec![row];
    }
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in row.chars() {
        current.push(ch);
        if current.chars().count() > 1 && advance(&current) > max_width {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(ch);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// The footer currently attached to the live view, if any.
#[derive(Debug, Default)]
pub struct FooterSlot {
    footer: Option<MetadataFooter>,
}

impl FooterSlot {
    pub fn current(&self) -> Option<&MetadataFooter> {
        self.footer.as_ref()
    }
}

/// Attaches a footer for the guard's lifetime and restores the previous state on drop,
/// including on early return or unwinding.
pub struct FooterGuard<'a> {
    slot: &'a mut FooterSlot,
    previous: Option<MetadataFooter>,
}

impl<'a> FooterGuard<'a> {
    pub fn attach(slot: &'a mut FooterSlot, footer: MetadataFooter) -> Self {
        let previous = slot.footer.replace(footer);
        Self { slot, previous }
    }

    pub fn footer(&self) -> Option<&MetadataFooter> {
        self.slot.current()
    }
}

impl Drop for FooterGuard<'_> {
    fn drop(&mut self) {
        self.slot.footer = self.previous.take();
    }
}

/// Everything a rasterizer needs, copied out of the live state at request time.
#[derive(Clone, Debug)]
pub struct SceneSnapshot {
    pub bounds: SurfaceBounds,
    pub background: Arc<RgbaImage>,
    pub markers: Vec<Marker>,
    pub strokes: Vec<Stroke>,
    pub footer: Option<MetadataFooter>,
}

impl SceneSnapshot {
    /// Footer laid out to the surface width, measured with `advance`.
    pub fn footer_layout(&self, advance: &dyn Fn(&str) -> f32) -> Option<FooterLayout> {
        let max_width = footer_wrap_width(self.bounds.width);
        self.footer
            .as_ref()
            .map(|footer| footer.layout(max_width, advance))
    }

    /// Output height in surface units, footer included.
    pub fn total_height(&self, advance: &dyn Fn(&str) -> f32) -> f32 {
        self.bounds.height
            + self
                .footer_layout(advance)
                .map(|layout| layout.height)
                .unwrap_or(0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterOptions {
    pub scale: f32,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self { scale: 2.0 }
    }
}

/// Single-shot result of a rasterization request.
pub struct RasterHandle {
    rx: Receiver<Result<RgbaImage>>,
}

impl RasterHandle {
    pub fn channel() -> (Sender<Result<RgbaImage>>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }

    pub fn ready(result: Result<RgbaImage>) -> Self {
        let (tx, handle) = Self::channel();
        let _ = tx.send(result);
        handle
    }

    /// `None` while the rasterizer is still working.
    pub fn try_take(&mut self) -> Option<Result<RgbaImage>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                Some(Err(anyhow!("rasterizer stopped without producing an image")))
            }
        }
    }

    #[cfg(test)]
    pub fn wait(self) -> Result<RgbaImage> {
        self.rx
            .recv()
            .map_err(|_| anyhow!("rasterizer stopped without producing an image"))?
    }
}

pub trait Rasterizer {
    /// Accepts a scene for rasterization. Errors here mean the request was rejected outright;
    /// failures while rendering arrive through the handle.
    fn request(&self, scene: SceneSnapshot, options: RasterOptions) -> Result<RasterHandle>;
}

/// Physical page description handed to a document packager, in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSpec {
    pub width_mm: f32,
    pub height_mm: f32,
}

impl PageSpec {
    pub const A4_PORTRAIT: Self = Self {
        width_mm: 210.0,
        height_mm: 297.0,
    };
}

pub trait DocumentPackager {
    fn package(&self, image: &RgbaImage, page: PageSpec) -> Result<Vec<u8>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportTarget {
    Image,
    Document,
}

impl ExportTarget {
    pub fn default_file_name(self) -> &'static str {
        match self {
            Self::Image => "compass-image.png",
            Self::Document => "compass-layout.pdf",
        }
    }

    pub fn filter(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::Image => ("PNG", &["png"]),
            Self::Document => ("PDF", &["pdf"]),
        }
    }

    pub fn encode(self, image: &RgbaImage, packager: &dyn DocumentPackager) -> Result<Vec<u8>> {
        match self {
            Self::Image => crate::flatten::encode_png(image),
            Self::Document => packager
                .package(image, PageSpec::A4_PORTRAIT)
                .context("cannot package document"),
        }
    }
}

/// Borrowed view of the state an export reads, plus the footer slot it temporarily mutates.
pub struct LiveView<'a> {
    pub bounds: SurfaceBounds,
    pub background: Option<&'a Arc<RgbaImage>>,
    pub store: &'a AnnotationStore,
    pub footer_slot: &'a mut FooterSlot,
}

#[derive(Clone, Copy, Debug)]
pub struct ExportAdapter {
    options: RasterOptions,
}

impl ExportAdapter {
    pub fn new(scale: f32) -> Self {
        Self {
            options: RasterOptions { scale },
        }
    }

    /// Snapshots the live view (with `footer` attached when given) and hands it to the rasterizer.
    /// The footer slot is back to its prior state when this returns, whatever the outcome.
    pub fn export_snapshot<R: Rasterizer + ?Sized>(
        &self,
        view: LiveView<'_>,
        footer: Option<MetadataFooter>,
        rasterizer: &R,
    ) -> Result<RasterHandle> {
        let LiveView {
            bounds,
            background,
            store,
            footer_slot,
        } = view;

        if bounds.is_empty() {
            bail!("there is no background to export");
        }
        let background = Arc::clone(background.context("there is no background to export")?);

        let guard = footer.map(|footer| FooterGuard::attach(footer_slot, footer));
        let snapshot = SceneSnapshot {
            bounds,
            background,
            markers: store.markers().to_vec(),
            strokes: store.strokes().cloned().collect(),
            footer: guard
                .as_ref()
                .and_then(|guard| guard.footer().cloned()),
        };
        tracing::info!(
            markers = snapshot.markers.len(),
            strokes = snapshot.strokes.len(),
            footer = snapshot.footer.is_some(),
            scale = self.options.scale,
            "requesting rasterization"
        );

        let handle = rasterizer
            .request(snapshot, self.options)
            .context("rasterizer rejected the export");
        drop(guard);
        handle
    }
}

/// An export in flight: the pending raster plus where its output goes.
pub struct PendingExport {
    pub target: ExportTarget,
    pub path: PathBuf,
    handle: RasterHandle,
}

impl PendingExport {
    pub fn new(target: ExportTarget, path: PathBuf, handle: RasterHandle) -> Self {
        Self {
            target,
            path,
            handle,
        }
    }

    /// Once the raster is ready, encodes and writes it. `None` while still rendering.
    pub fn poll(&mut self, packager: &dyn DocumentPackager) -> Option<Result<PathBuf>> {
        let raster = self.handle.try_take()?;
        Some(
            raster
                .and_then(|image| write_export(self.target, &image, &self.path, packager))
                .map(|()| self.path.clone()),
        )
    }
}

pub fn write_export(
    target: ExportTarget,
    image: &RgbaImage,
    path: &Path,
    packager: &dyn DocumentPackager,
) -> Result<()> {
    let bytes = target.encode(image, packager)?;
    std::fs::write(path, bytes).with_context(|| format!("cannot write {}", path.display()))
}
