use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use egui::{ColorImage, Context as EguiContext, TextureHandle, TextureId, TextureOptions, Vec2};
use image::RgbaImage;

use crate::config::BackgroundEntry;

pub const UPLOAD_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

#[derive(Clone, Debug, PartialEq)]
pub enum BackgroundSource {
    Catalog(BackgroundEntry),
    Upload(PathBuf),
}

impl BackgroundSource {
    pub fn label(&self) -> String {
        match self {
            Self::Catalog(entry) => entry.label.clone(),
            Self::Upload(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }

    fn path(&self) -> &Path {
        match self {
            Self::Catalog(entry) => &entry.path,
            Self::Upload(path) => path,
        }
    }
}

/// Decoded background plus its lazily created GPU texture.
pub struct BackgroundImage {
    pub label: String,
    pub pixels: Arc<RgbaImage>,
    texture: Option<TextureHandle>,
}

impl BackgroundImage {
    pub fn new(label: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            label: label.into(),
            pixels: Arc::new(pixels),
            texture: None,
        }
    }

    pub fn size_vec2(&self) -> Vec2 {
        Vec2::new(self.pixels.width() as f32, self.pixels.height() as f32)
    }

    pub fn ensure_texture(&mut self, ctx: &EguiContext) -> TextureId {
        if let Some(texture) = self.texture.as_ref() {
            return texture.id();
        }
        let size = [self.pixels.width() as usize, self.pixels.height() as usize];
        let color = ColorImage::from_rgba_unmultiplied(size, self.pixels.as_raw());
        let texture = ctx.load_texture("background", color, TextureOptions::LINEAR);
        let id = texture.id();
        self.texture = Some(texture);
        id
    }
}

pub fn load(source: &BackgroundSource) -> Result<BackgroundImage> {
    let path = source.path();
    let bytes =
        std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    decode(source.label(), &bytes).with_context(|| format!("cannot load {}", path.display()))
}

/// Decodes an in-memory file into a background.
pub fn decode(label: impl Into<String>, bytes: &[u8]) -> Result<BackgroundImage> {
    let image = image::load_from_memory(bytes).context("unsupported or corrupt image")?;
    if image.width() == 0 || image.height() == 0 {
        anyhow::bail!("image has no pixels");
    }
    Ok(BackgroundImage::new(label, image.to_rgba8()))
}

pub fn pick_upload() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Choose a background image")
        .add_filter("Images", &UPLOAD_EXTENSIONS)
        .pick_file()
}
