//! PDF output.
//!
//! `PdfDocument` is what the assembler needs from a PDF writer. `LopdfDocument`
//! implements it by embedding each image as an RGB image XObject on its own page.

use anyhow::{Context, Result};
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;

use crate::config::PageGeometry;

/// Points per millimetre.
const PT_PER_MM: f32 = 72.0 / 25.4;

/// How an image is put on its page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PageLayout {
    /// Page is exactly the image, one pixel per point.
    Natural,
    /// Fixed page; image scaled to the printable width, centred, top-aligned.
    FitWidth(PageGeometry),
}

/// Page size and image rectangle, in points. `y` is measured from the bottom edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub page_width: f32,
    pub page_height: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Computes where an image of `width`x`height` pixels lands on its page.
pub fn place(width: u32, height: u32, layout: PageLayout) -> Placement {
    let (w, h) = (width as f32, height as f32);
    match layout {
        PageLayout::Natural => Placement {
            page_width: w,
            page_height: h,
            x: 0.0,
            y: 0.0,
            width: w,
            height: h,
        },
        PageLayout::FitWidth(geometry) => {
            let page_width = geometry.width_mm * PT_PER_MM;
            let page_height = geometry.height_mm * PT_PER_MM;
            let margin = geometry.margin_mm * PT_PER_MM;
            let printable_width = page_width - 2.0 * margin;
            let printable_height = page_height - 2.0 * margin;

            let mut scale = printable_width / w;
            // Very tall images would run off the bottom; shrink to fit instead
            if h * scale > printable_height {
                scale = printable_height / h;
            }
            let (draw_width, draw_height) = (w * scale, h * scale);

            Placement {
                page_width,
                page_height,
                x: (page_width - draw_width) / 2.0,
                y: page_height - margin - draw_height,
                width: draw_width,
                height: draw_height,
            }
        }
    }
}

/// A PDF under construction.
pub trait PdfDocument {
    /// Appends one page showing `image`.
    fn add_page(&mut self, image: &DynamicImage, layout: PageLayout) -> Result<()>;

    fn page_count(&self) -> usize;

    /// Serializes the document to `path`.
    fn write(&mut self, path: &Path) -> Result<()>;
}

impl<T: PdfDocument + ?Sized> PdfDocument for &mut T {
    fn add_page(&mut self, image: &DynamicImage, layout: PageLayout) -> Result<()> {
        (**self).add_page(image, layout)
    }

    fn page_count(&self) -> usize {
        (**self).page_count()
    }

    fn write(&mut self, path: &Path) -> Result<()> {
        (**self).write(path)
    }
}

pub struct LopdfDocument {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl LopdfDocument {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }
}

impl Default for LopdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfDocument for LopdfDocument {
    fn add_page(&mut self, image: &DynamicImage, layout: PageLayout) -> Result<()> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let placement = place(width, height, layout);

        let image_stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            rgb.into_raw(),
        );
        let image_id = self.doc.add_object(image_stream);

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
        let content_id = self.doc.add_object(Stream::new(
            dictionary! {},
            content.encode().context("Failed to encode page content")?,
        ));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                placement.page_width.into(),
                placement.page_height.into(),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        });
        self.kids.push(page_id.into());
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.kids.len()
    }

    fn write(&mut self, path: &Path) -> Result<()> {
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids.clone(),
            "Count" => self.kids.len() as i64,
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        if self.doc.trailer.get(b"Root").is_err() {
            let catalog_id = self.doc.add_object(dictionary! {
                "Type" => "Catalog",
                "Pages" => self.pages_id,
            });
            self.doc.trailer.set("Root", catalog_id);
        }

        self.doc.compress();
        self.doc
            .save(path)
            .with_context(|| format!("Failed to write PDF {}", path.display()))?;
        Ok(())
    }
}
