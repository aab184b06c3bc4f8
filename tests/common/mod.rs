//! PDF fixtures shared by the integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// Builds PDFs page by page with Helvetica text and image XObjects.
pub struct Paper {
    doc: Document,
    pages_id: ObjectId,
    fonts_id: ObjectId,
    kids: Vec<Object>,
}

/// Content of one page under construction.
#[derive(Default)]
pub struct PageSpec {
    content: String,
    images: Vec<(String, Stream)>,
}

impl PageSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `text` at (x, y) in Helvetica (`F1`) or Helvetica-Bold (`F2`).
    pub fn text(mut self, font: &str, size: f32, x: f32, y: f32, text: &str) -> Self {
        let escaped = text
            .replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)");
        self.content
            .push_str(&format!("BT /{font} {size} Tf {x} {y} Td ({escaped}) Tj ET\n"));
        self
    }

    /// Draw an image XObject.
    pub fn image(mut self, stream: Stream) -> Self {
        let name = format!("Im{}", self.images.len() + 1);
        self.content
            .push_str(&format!("q 200 0 0 100 72 300 cm /{name} Do Q\n"));
        self.images.push((name, stream));
        self
    }
}

impl Paper {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let regular = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let fonts_id = doc.add_object(dictionary! { "F1" => regular, "F2" => bold });
        Self {
            doc,
            pages_id,
            fonts_id,
            kids: Vec::new(),
        }
    }

    pub fn page(mut self, spec: PageSpec) -> Self {
        let mut xobjects = Dictionary::new();
        for (name, stream) in spec.images {
            let id = self.doc.add_object(stream);
            xobjects.set(name, id);
        }
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, spec.content.into_bytes()));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => self.fonts_id,
                "XObject" => xobjects,
            },
        });
        self.kids.push(page_id.into());
        self
    }

    /// Write the PDF with an Info dictionary carrying `title`.
    pub fn save(mut self, path: &Path, title: Option<&str>) -> PathBuf {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ],
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        if let Some(title) = title {
            let info_id = self.doc.add_object(dictionary! {
                "Title" => Object::string_literal(title),
                "Author" => Object::string_literal("Test Author"),
                "CreationDate" => Object::string_literal("D:20240115103045Z"),
            });
            self.doc.trailer.set("Info", info_id);
        }
        self.doc.save(path).unwrap();
        path.to_path_buf()
    }
}

/// A page of body text mentioning its page number.
pub fn text_page(page: usize) -> PageSpec {
    PageSpec::new()
        .text("F1", 10.0, 72.0, 700.0, &format!("Page {} opens with a sentence", page))
        .text("F1", 10.0, 72.0, 688.0, "about transformers and attention")
        .text("F1", 10.0, 72.0, 676.0, "that continues on a third line.")
}

/// An uncompressed 8-bit RGB image.
pub fn rgb_image(width: u32, height: u32) -> Stream {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[(x % 251) as u8, (y % 241) as u8, ((x + y) % 256) as u8]);
        }
    }
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        data,
    )
}

/// A DCT-encoded (JPEG) RGB image.
pub fn jpeg_image(width: u32, height: u32) -> Stream {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 90])
    });
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
        .unwrap();
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        bytes,
    )
    .with_compression(false)
}

/// An image in an encoding the extractor cannot decode.
pub fn jpx_image() -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 8,
            "Height" => 8,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "JPXDecode",
        },
        vec![0u8; 16],
    )
    .with_compression(false)
}

/// Files in a directory, sorted by name.
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
