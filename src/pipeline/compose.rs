//! Output document assembly: new pages, embedded page images, serialisation.
//!
//! The export pipeline talks to an [`OutputDocument`]; [`PdfWriter`] is the
//! default implementation, built on `lopdf`. Each slide becomes an image
//! XObject (RGB, plus a DeviceGray `SMask` when the raster has transparency)
//! drawn with a single `cm` + `Do` pair. Pages are kept in memory until
//! [`OutputDocument::serialize`], when content streams, the page tree and the
//! catalog are written and every stream is Flate-compressed.

use crate::error::NoteError;
use crate::layout::{PageSize, Placement};
use image::RgbaImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

/// Handle to a page created by [`OutputDocument::add_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHandle(pub(crate) usize);

/// Handle to an embedded image; dimensions are in raw pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHandle {
    pub(crate) index: usize,
    pub width: u32,
    pub height: u32,
}

impl ImageHandle {
    /// Width / height of the embedded raster.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// A PDF under construction.
pub trait OutputDocument: Send {
    /// Append a blank page of `size` points.
    fn add_page(&mut self, size: PageSize) -> PageHandle;

    /// Embed a raster so it can be drawn on any page.
    fn embed_image(&mut self, image: &RgbaImage) -> Result<ImageHandle, String>;

    /// Draw an embedded image at `at` (points, bottom-left origin).
    fn draw_image(
        &mut self,
        page: PageHandle,
        image: &ImageHandle,
        at: Placement,
    ) -> Result<(), String>;

    /// Drop `page` if it is the most recently added page and nothing was
    /// drawn on it. Any other call is ignored.
    fn discard_page(&mut self, page: PageHandle);

    fn page_count(&self) -> usize;

    /// Finish the document and encode it to PDF bytes.
    fn serialize(self: Box<Self>) -> Result<Vec<u8>, NoteError>;
}

struct PendingPage {
    size: PageSize,
    operations: Vec<Operation>,
    xobjects: Dictionary,
}

/// [`OutputDocument`] that writes PDF 1.5 with lopdf.
pub struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    pages: Vec<PendingPage>,
    images: Vec<ObjectId>,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            pages: Vec::new(),
            images: Vec::new(),
        }
    }
}

fn xobject_name(index: usize) -> String {
    format!("Im{index}")
}

impl OutputDocument for PdfWriter {
    fn add_page(&mut self, size: PageSize) -> PageHandle {
        self.pages.push(PendingPage {
            size,
            operations: Vec::new(),
            xobjects: Dictionary::new(),
        });
        PageHandle(self.pages.len() - 1)
    }

    fn embed_image(&mut self, image: &RgbaImage) -> Result<ImageHandle, String> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(format!("cannot embed an empty {width}x{height} image"));
        }

        let pixel_count = (width as usize) * (height as usize);
        let mut rgb = Vec::with_capacity(pixel_count * 3);
        let mut alpha = Vec::with_capacity(pixel_count);
        for px in image.pixels() {
            rgb.extend_from_slice(&px.0[..3]);
            alpha.push(px.0[3]);
        }

        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            rgb,
        );

        if alpha.iter().any(|&a| a != u8::MAX) {
            let smask = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width as i64,
                    "Height" => height as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                alpha,
            );
            let smask_id = self.doc.add_object(smask);
            stream.dict.set("SMask", smask_id);
        }

        let id = self.doc.add_object(stream);
        self.images.push(id);
        debug!("Embedded {}x{} image as object {:?}", width, height, id);

        Ok(ImageHandle {
            index: self.images.len() - 1,
            width,
            height,
        })
    }

    fn draw_image(
        &mut self,
        page: PageHandle,
        image: &ImageHandle,
        at: Placement,
    ) -> Result<(), String> {
        let image_id = *self
            .images
            .get(image.index)
            .ok_or_else(|| format!("unknown image #{}", image.index))?;
        let target = self
            .pages
            .get_mut(page.0)
            .ok_or_else(|| format!("unknown page #{}", page.0))?;

        let name = xobject_name(image.index);
        target.xobjects.set(name.clone(), image_id);
        target.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    at.width.into(),
                    0.into(),
                    0.into(),
                    at.height.into(),
                    at.x.into(),
                    at.y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn discard_page(&mut self, page: PageHandle) {
        let is_last_empty = page.0 + 1 == self.pages.len()
            && self.pages.last().is_some_and(|p| p.operations.is_empty());
        if is_last_empty {
            self.pages.pop();
            debug!("Discarded empty page #{}", page.0);
        }
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn serialize(self: Box<Self>) -> Result<Vec<u8>, NoteError> {
        let PdfWriter {
            mut doc,
            pages_id,
            pages,
            ..
        } = *self;

        let fail = |detail: String| NoteError::SerializationFailed { detail };

        let mut kids = Vec::with_capacity(pages.len());
        for page in pages {
            let content = Content {
                operations: page.operations,
            }
            .encode()
            .map_err(|e| fail(format!("content stream: {e}")))?;
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => Object::Array(vec![
                    0.into(),
                    0.into(),
                    page.size.width.into(),
                    page.size.height.into(),
                ]),
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "XObject" => page.xobjects,
                },
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| fail(format!("write: {e}")))?;
        debug!("Serialised {} pages → {} bytes", count, output.len());
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Orientation;
    use image::Rgba;

    fn placement() -> Placement {
        Placement {
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 50.0,
        }
    }

    #[test]
    fn empty_document_serialises() {
        let bytes = Box::new(PdfWriter::new()).serialize().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 0);
    }

    #[test]
    fn pages_keep_their_media_box() {
        let mut w = PdfWriter::new();
        w.add_page(Orientation::Portrait.page_dimensions());
        w.add_page(Orientation::Landscape.page_dimensions());
        assert_eq!(w.page_count(), 2);

        let bytes = Box::new(w).serialize().unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);

        let second = doc.get_dictionary(pages[&2]).unwrap();
        let mbox = second.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(mbox[2].as_float().unwrap(), 842.0);
        assert_eq!(mbox[3].as_float().unwrap(), 595.0);
    }

    #[test]
    fn drawn_image_is_referenced_from_page_resources() {
        let mut w = PdfWriter::new();
        let page = w.add_page(Orientation::Portrait.page_dimensions());
        let img = w
            .embed_image(&RgbaImage::from_pixel(8, 4, Rgba([10, 20, 30, 255])))
            .unwrap();
        assert_eq!((img.width, img.height), (8, 4));
        assert_eq!(img.aspect(), 2.0);
        w.draw_image(page, &img, placement()).unwrap();

        let bytes = Box::new(w).serialize().unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = doc.get_pages()[&1];
        let content = doc.get_page_content(page_id).unwrap();
        let ops = Content::decode(&content).unwrap().operations;
        let names: Vec<&str> = ops.iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(names, vec!["q", "cm", "Do", "Q"]);

        let resources = doc.get_dictionary(page_id).unwrap().get(b"Resources").unwrap();
        let xobjects = resources.as_dict().unwrap().get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
        let image = doc.get_object(image_id).unwrap().as_stream().unwrap();
        assert_eq!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), 8);
        assert!(image.dict.get(b"SMask").is_err(), "opaque image needs no mask");
    }

    #[test]
    fn transparent_image_gets_soft_mask() {
        let mut w = PdfWriter::new();
        let page = w.add_page(Orientation::Portrait.page_dimensions());
        let mut raster = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        raster.put_pixel(1, 1, Rgba([0, 0, 0, 0]));
        let img = w.embed_image(&raster).unwrap();
        w.draw_image(page, &img, placement()).unwrap();

        let bytes = Box::new(w).serialize().unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let has_mask = doc.objects.values().any(|o| {
            o.as_stream()
                .map(|s| s.dict.get(b"SMask").is_ok())
                .unwrap_or(false)
        });
        assert!(has_mask);
    }

    #[test]
    fn only_the_last_empty_page_is_discarded() {
        let mut w = PdfWriter::new();
        let first = w.add_page(Orientation::Portrait.page_dimensions());
        let img = w
            .embed_image(&RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255])))
            .unwrap();
        w.draw_image(first, &img, placement()).unwrap();

        w.discard_page(first);
        assert_eq!(w.page_count(), 1, "page with content stays");

        let second = w.add_page(Orientation::Portrait.page_dimensions());
        w.discard_page(first);
        assert_eq!(w.page_count(), 2, "not the last page");
        w.discard_page(second);
        assert_eq!(w.page_count(), 1);
    }

    #[test]
    fn bad_handles_are_errors() {
        let mut w = PdfWriter::new();
        let img = ImageHandle {
            index: 3,
            width: 1,
            height: 1,
        };
        assert!(w.draw_image(PageHandle(0), &img, placement()).is_err());
        assert!(w.embed_image(&RgbaImage::new(0, 0)).is_err());
    }
}
