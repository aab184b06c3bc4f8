//! Image XObject discovery and publishing.

use std::collections::HashSet;
use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};

use crate::document::PaperDocument;
use crate::error::{Error, Result};

use super::compress::{compress_image, decode_image};
use super::quality::{ImageFormat, Quality};
use super::{write_atomic, ExtractionWarning};

/// Form XObjects nested deeper than this are not searched.
const MAX_FORM_DEPTH: usize = 8;

/// Steps taken up the page tree looking for inherited resources.
const MAX_PARENT_STEPS: usize = 32;

/// An image XObject found on a page.
#[derive(Debug, Clone)]
pub struct PageImage<'a> {
    /// Zero-based page index
    pub page: usize,
    /// Zero-based position among the page's images
    pub index: usize,
    /// Resource name the image is registered under
    pub name: String,
    /// Object id, `None` for inline dictionaries
    pub id: Option<ObjectId>,
    /// The image stream
    pub stream: &'a Stream,
}

/// Image XObjects of one page in resource order.
///
/// Form XObjects are searched recursively. Each image object is listed once
/// per page and stencil masks (`/ImageMask true`) are skipped.
pub fn page_images(doc: &LopdfDocument, page_id: ObjectId, page: usize) -> Vec<PageImage<'_>> {
    let mut walker = ImageWalker {
        doc,
        page,
        seen: HashSet::new(),
        images: Vec::new(),
    };
    if let Some(resources) = page_resources(doc, page_id) {
        walker.walk(resources, 0);
    }
    walker.images
}

struct ImageWalker<'a> {
    doc: &'a LopdfDocument,
    page: usize,
    seen: HashSet<ObjectId>,
    images: Vec<PageImage<'a>>,
}

impl<'a> ImageWalker<'a> {
    fn walk(&mut self, resources: &'a Dictionary, depth: usize) {
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|o| resolve(self.doc, o))
            .and_then(|o| o.as_dict().ok())
        else {
            return;
        };

        for (name, obj) in xobjects.iter() {
            let (id, target) = match obj {
                Object::Reference(id) => (Some(*id), self.doc.get_object(*id).ok()),
                other => (None, Some(other)),
            };
            let Some(Object::Stream(stream)) = target else {
                continue;
            };
            if let Some(id) = id {
                if !self.seen.insert(id) {
                    continue;
                }
            }

            let subtype = stream.dict.get(b"Subtype").and_then(Object::as_name).ok();
            match subtype {
                Some(b"Image") => {
                    let is_mask = stream
                        .dict
                        .get(b"ImageMask")
                        .and_then(Object::as_bool)
                        .unwrap_or(false);
                    if is_mask {
                        log::debug!("Skipping stencil mask on page {}", self.page);
                        continue;
                    }
                    self.images.push(PageImage {
                        page: self.page,
                        index: self.images.len(),
                        name: String::from_utf8_lossy(name).into_owned(),
                        id,
                        stream,
                    });
                }
                Some(b"Form") if depth < MAX_FORM_DEPTH => {
                    if let Some(inner) = stream
                        .dict
                        .get(b"Resources")
                        .ok()
                        .and_then(|o| resolve(self.doc, o))
                        .and_then(|o| o.as_dict().ok())
                    {
                        self.walk(inner, depth + 1);
                    }
                }
                _ => {}
            }
        }
    }
}

fn resolve<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Resources of a page, inherited from the page tree when absent.
fn page_resources(doc: &LopdfDocument, page_id: ObjectId) -> Option<&Dictionary> {
    let mut current = doc.get_dictionary(page_id).ok();
    for _ in 0..MAX_PARENT_STEPS {
        let dict = current?;
        if let Some(resources) = dict
            .get(b"Resources")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
        {
            return Some(resources);
        }
        current = dict
            .get(b"Parent")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
            .ok();
    }
    None
}

/// Where and how images are written.
#[derive(Debug, Clone)]
pub struct ImageOptions {
    /// Directory receiving the files, created when missing
    pub output_dir: PathBuf,
    /// Compression tier
    pub quality: Quality,
    /// Output encoding
    pub format: ImageFormat,
    /// Attach the compressed bytes as base64 to each result
    pub return_base64: bool,
}

/// A published image file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedImage {
    /// Zero-based page index
    pub page: usize,
    /// Zero-based position among the page's images
    pub index: usize,
    /// File name within the output directory
    pub filename: String,
    /// Full path of the file
    pub path: PathBuf,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Source width in pixels
    pub original_width: u32,
    /// Source height in pixels
    pub original_height: u32,
    /// Size of the written file in bytes
    pub file_size: u64,
    /// Output encoding
    pub format: ImageFormat,
    /// Compressed file contents, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

/// File name of an extracted image, numbered from one.
pub fn image_filename(page: usize, index: usize, format: ImageFormat) -> String {
    format!("page{}_img{}.{}", page + 1, index + 1, format.extension())
}

/// Images written by one call and the images skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageExtraction {
    /// Published images in page order
    pub images: Vec<ExtractedImage>,
    /// Images that could not be decoded or encoded
    pub warnings: Vec<ExtractionWarning>,
}

/// Decode, compress and publish every image on the given pages.
///
/// `pages` must already be validated against the document. Undecodable
/// images are skipped with a warning; a directory that cannot be created or
/// written fails the call.
pub fn extract_images(
    document: &PaperDocument,
    pages: &[usize],
    options: &ImageOptions,
) -> Result<ImageExtraction> {
    std::fs::create_dir_all(&options.output_dir).map_err(|source| Error::OutputDir {
        path: options.output_dir.clone(),
        source,
    })?;

    let doc = document.inner();
    let mut result = ImageExtraction::default();

    for &page in pages {
        let page_id = document.page_id(page)?;
        for image in page_images(doc, page_id, page) {
            match publish(doc, &image, options) {
                Ok(extracted) => result.images.push(extracted),
                Err(Error::ImageDecode {
                    page,
                    index,
                    reason,
                }) => {
                    log::warn!("Skipping image {} on page {}: {}", index, page, reason);
                    result
                        .warnings
                        .push(ExtractionWarning::image(page, index, reason));
                }
                Err(e) => return Err(e),
            }
        }
    }

    log::info!(
        "Wrote {} images to {} ({} skipped)",
        result.images.len(),
        options.output_dir.display(),
        result.warnings.len()
    );
    Ok(result)
}

fn publish(doc: &LopdfDocument, image: &PageImage<'_>, options: &ImageOptions) -> Result<ExtractedImage> {
    let decode_error = |reason: String| Error::ImageDecode {
        page: image.page,
        index: image.index,
        reason,
    };

    let decoded = decode_image(doc, image.stream).map_err(decode_error)?;
    let compressed = compress_image(decoded, options.quality, options.format)
        .map_err(|e| decode_error(e.to_string()))?;

    let filename = image_filename(image.page, image.index, options.format);
    let path = options.output_dir.join(&filename);
    write_atomic(&path, &compressed.bytes).map_err(|source| Error::OutputDir {
        path: options.output_dir.clone(),
        source,
    })?;

    log::debug!(
        "{} ({}): {}x{} -> {}x{}, {} bytes",
        filename,
        image.name,
        compressed.original_width,
        compressed.original_height,
        compressed.width,
        compressed.height,
        compressed.bytes.len()
    );

    Ok(ExtractedImage {
        page: image.page,
        index: image.index,
        filename,
        path,
        width: compressed.width,
        height: compressed.height,
        original_width: compressed.original_width,
        original_height: compressed.original_height,
        file_size: compressed.bytes.len() as u64,
        format: options.format,
        base64: options
            .return_base64
            .then(|| BASE64.encode(&compressed.bytes)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{rgb_image_stream, PdfBuilder};
    use lopdf::dictionary;

    #[test]
    fn test_image_filename() {
        assert_eq!(image_filename(0, 0, ImageFormat::Jpeg), "page1_img1.jpg");
        assert_eq!(image_filename(4, 2, ImageFormat::Png), "page5_img3.png");
    }

    #[test]
    fn test_page_images_in_order_and_masks_skipped() {
        let mask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ImageMask" => true,
            },
            vec![0],
        );
        let doc = PdfBuilder::new()
            .page_with_xobjects(
                "q 10 0 0 10 0 0 cm /Im1 Do Q",
                vec![
                    ("Im1", rgb_image_stream(4, 4)),
                    ("Mask", mask),
                    ("Im2", rgb_image_stream(2, 3)),
                ],
            )
            .build();
        let page_id = *doc.get_pages().values().next().unwrap();

        let images = page_images(&doc, page_id, 0);
        let names: Vec<&str> = images.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Im1", "Im2"]);
        assert_eq!(images[1].index, 1);
    }

    #[test]
    fn test_images_inside_forms_found() {
        let mut builder = PdfBuilder::new();
        let image_id = builder.add_object(rgb_image_stream(3, 3));
        let form = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(10),
                    Object::Integer(10),
                ],
                "Resources" => dictionary! {
                    "XObject" => dictionary! { "Inner" => image_id },
                },
            },
            b"/Inner Do".to_vec(),
        );
        let doc = builder.page_with_xobjects("/Fm1 Do", vec![("Fm1", form)]).build();
        let page_id = *doc.get_pages().values().next().unwrap();

        let images = page_images(&doc, page_id, 0);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name, "Inner");
        assert_eq!(images[0].id, Some(image_id));
    }
}
