//! Page images taken from the image objects embedded in a PDF.

use std::path::Path;

use image::{DynamicImage, ImageBuffer, Rgba};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{load_document, Rasterizer, Result};
use crate::error::PdfError;

/// Rasterizer for scanned PDFs.
///
/// A scanned invoice carries one full-page picture per page; this picks the
/// largest decodable image XObject of each page instead of rendering vector
/// content. Pages without such an image fail the whole call.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedImageRasterizer;

impl EmbeddedImageRasterizer {
    /// Create a new rasterizer.
    pub fn new() -> Self {
        Self
    }

    fn page_image(&self, doc: &Document, number: u32, page_id: ObjectId) -> Option<DynamicImage> {
        let resources = page_resources(doc, page_id)?;
        let xobjects = resources.get(b"XObject").ok()?;
        let Ok((_, Object::Dictionary(xobjects))) = doc.dereference(xobjects) else {
            return None;
        };

        let mut best: Option<DynamicImage> = None;
        for (_name, obj_ref) in xobjects.iter() {
            let Ok((_, obj)) = doc.dereference(obj_ref) else {
                continue;
            };
            if let Some(img) = decode_image_object(doc, obj) {
                let area = u64::from(img.width()) * u64::from(img.height());
                let best_area = best
                    .as_ref()
                    .map(|b| u64::from(b.width()) * u64::from(b.height()))
                    .unwrap_or(0);
                if area > best_area {
                    best = Some(img);
                }
            }
        }

        trace!("Page {} image: {:?}", number, best.as_ref().map(|i| (i.width(), i.height())));
        best
    }
}

impl Rasterizer for EmbeddedImageRasterizer {
    fn rasterize(&self, path: &Path) -> Result<Vec<DynamicImage>> {
        let doc = load_document(path)?;
        let pages = doc.get_pages();

        let mut images = Vec::with_capacity(pages.len());
        for (&number, &page_id) in pages.iter() {
            let image = self.page_image(&doc, number, page_id).ok_or_else(|| {
                PdfError::Render(format!("page {number} has no decodable image"))
            })?;
            images.push(image);
        }

        debug!("Took {} page images from {}", images.len(), path.display());
        Ok(images)
    }
}

/// Get the resources dictionary of a page, following `Parent` inheritance.
fn page_resources(doc: &Document, node_id: ObjectId) -> Option<Dictionary> {
    let Ok(Object::Dictionary(dict)) = doc.get_object(node_id) else {
        return None;
    };

    if let Ok(resources) = dict.get(b"Resources") {
        if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
            return Some(res_dict.clone());
        }
    }

    match dict.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => page_resources(doc, *parent_id),
        _ => None,
    }
}

fn decode_image_object(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;

    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;

    if let Ok(filter) = dict.get(b"Filter") {
        let filter_name = match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            _ => None,
        };

        match filter_name {
            Some(b"DCTDecode") => {
                return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                    .ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Skipping image with unsupported filter {:?}", filter_name.map(String::from_utf8_lossy));
                return None;
            }
            _ => {}
        }
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB");

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);

    image_from_raw(&data, width, height, color_space, bits)
}

/// Build an RGBA image from raw 8-bit RGB or grayscale samples.
fn image_from_raw(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits_per_component: i64,
) -> Option<DynamicImage> {
    if bits_per_component != 8 {
        trace!("Unsupported bits per component: {}", bits_per_component);
        return None;
    }

    let pixels = (width as usize) * (height as usize);
    let rgba: Vec<u8> = match color_space {
        b"DeviceRGB" | b"RGB" if data.len() >= pixels * 3 => data[..pixels * 3]
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], 255])
            .collect(),
        b"DeviceGray" | b"G" if data.len() >= pixels => {
            data[..pixels].iter().flat_map(|&g| [g, g, g, 255]).collect()
        }
        _ => {
            trace!(
                "Could not decode image: {}x{}, colorspace={:?}, data_len={}",
                width,
                height,
                String::from_utf8_lossy(color_space),
                data.len()
            );
            return None;
        }
    };

    ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba).map(DynamicImage::ImageRgba8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_from_raw_gray() {
        let img = image_from_raw(&[0, 128, 255, 64], 2, 2, b"DeviceGray", 8).unwrap();
        assert_eq!((img.width(), img.height()), (2, 2));
        assert_eq!(img.to_rgba8().get_pixel(1, 0).0, [128, 128, 128, 255]);
    }

    #[test]
    fn test_image_from_raw_rgb() {
        let img = image_from_raw(&[10, 20, 30], 1, 1, b"DeviceRGB", 8).unwrap();
        assert_eq!(img.to_rgba8().get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_image_from_raw_rejects_short_data() {
        assert!(image_from_raw(&[1, 2], 2, 2, b"DeviceGray", 8).is_none());
        assert!(image_from_raw(&[0; 16], 2, 2, b"DeviceCMYK", 8).is_none());
        assert!(image_from_raw(&[0; 4], 2, 2, b"DeviceGray", 1).is_none());
    }

    #[test]
    fn test_rasterize_missing_file() {
        let result = EmbeddedImageRasterizer::new().rasterize(Path::new("/nonexistent/scan.pdf"));
        assert!(matches!(result, Err(PdfError::Parse(_))));
    }
}
