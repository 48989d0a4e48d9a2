use anyhow::{bail, Context, Result};
use image::RgbaImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::export::{DocumentPackager, PageSpec};

const POINTS_PER_MM: f32 = 72.0 / 25.4;

/// Packages one raster into a single-page PDF, full page width, top-aligned.
#[derive(Clone, Copy, Debug, Default)]
pub struct PdfPackager;

/// Placement of the image on the page, in PDF points with a bottom-left origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

pub fn place_on_page(image_width: u32, image_height: u32, page: PageSpec) -> Placement {
    let page_w = page.width_mm * POINTS_PER_MM;
    let page_h = page.height_mm * POINTS_PER_MM;
    let mut width = page_w;
    let mut height = image_height as f32 * page_w / image_width.max(1) as f32;
    if height > page_h {
        // Tall content is shrunk to fit instead of running off the page.
        width *= page_h / height;
        height = page_h;
    }
    Placement {
        x: 0.0,
        y: page_h - height,
        width,
        height,
    }
}

impl DocumentPackager for PdfPackager {
    fn package(&self, image: &RgbaImage, page: PageSpec) -> Result<Vec<u8>> {
        if image.width() == 0 || image.height() == 0 {
            bail!("cannot package an empty image");
        }

        let rgb: Vec<u8> = image
            .pixels()
            .flat_map(|px| {
                let [r, g, b, a] = px.0;
                // Composite over white; PDF image XObjects here carry no alpha.
                let over_white = |c: u8| ((c as u16 * a as u16 + 255 * (255 - a as u16)) / 255) as u8;
                [over_white(r), over_white(g), over_white(b)]
            })
            .collect();

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width() as i64,
                "Height" => image.height() as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            rgb,
        ));
        let resources_id = doc.add_object(dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        });

        let placement = place_on_page(image.width(), image.height(), page);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        placement.width.into(),
                        0.into(),
                        0.into(),
                        placement.height.into(),
                        placement.x.into(),
                        placement.y.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().context("cannot encode page content")?,
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                (page.width_mm * POINTS_PER_MM).into(),
                (page.height_mm * POINTS_PER_MM).into(),
            ],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).context("cannot serialize PDF")?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};
    use lopdf::Document;

    use super::{place_on_page, PdfPackager};
    use crate::export::{DocumentPackager, PageSpec};

    #[test]
    fn wide_image_spans_page_width_from_the_top() {
        let placement = place_on_page(1000, 500, PageSpec::A4_PORTRAIT);
        let page_w = 210.0 * 72.0 / 25.4;
        let page_h = 297.0 * 72.0 / 25.4;
        assert!((placement.width - page_w).abs() < 0.01);
        assert!((placement.height - page_w / 2.0).abs() < 0.01);
        assert!((placement.y + placement.height - page_h).abs() < 0.01);
    }

    #[test]
    fn tall_image_is_shrunk_to_fit() {
        let placement = place_on_page(100, 1000, PageSpec::A4_PORTRAIT);
        let page_h = 297.0 * 72.0 / 25.4;
        assert!((placement.height - page_h).abs() < 0.01);
        assert!(placement.y.abs() < 0.01);
        assert!(placement.width < page_h / 5.0);
    }

    #[test]
    fn packaged_pdf_has_one_page() {
        let image = RgbaImage::from_pixel(40, 30, Rgba([200, 10, 10, 255]));
        let bytes = PdfPackager
            .package(&image, PageSpec::A4_PORTRAIT)
            .expect("pdf packages");
        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).expect("pdf reloads");
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn empty_image_is_rejected() {
        assert!(PdfPackager
            .package(&RgbaImage::new(0, 0), PageSpec::A4_PORTRAIT)
            .is_err());
    }
}
