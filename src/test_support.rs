//! In-memory PDF fixtures for unit tests.

use std::path::Path;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// Builds small PDFs with the standard Helvetica and Times fonts.
///
/// Font resources: `F1` Helvetica, `F2` Helvetica-Bold, `F3`
/// Helvetica-Oblique, `F4` Times-Roman.
pub(crate) struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    fonts_id: ObjectId,
    kids: Vec<Object>,
    info: Option<Dictionary>,
}

impl PdfBuilder {
    pub(crate) fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for (key, base) in [
            ("F1", "Helvetica"),
            ("F2", "Helvetica-Bold"),
            ("F3", "Helvetica-Oblique"),
            ("F4", "Times-Roman"),
        ] {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => base,
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(key, font_id);
        }
        let fonts_id = doc.add_object(fonts);

        Self {
            doc,
            pages_id,
            fonts_id,
            kids: Vec::new(),
            info: None,
        }
    }

    /// Add an arbitrary object, e.g. an image shared between pages.
    pub(crate) fn add_object<T: Into<Object>>(&mut self, object: T) -> ObjectId {
        self.doc.add_object(object)
    }

    /// Add a page with the given content stream.
    pub(crate) fn page(self, content: &str) -> Self {
        self.page_with_xobjects(content, Vec::new())
    }

    /// Add a page whose resources register the given XObjects by name.
    pub(crate) fn page_with_xobjects(mut self, content: &str, xobjects: Vec<(&str, Stream)>) -> Self {
        let mut xobject_dict = Dictionary::new();
        for (name, stream) in xobjects {
            let id = self.doc.add_object(stream);
            xobject_dict.set(name, id);
        }

        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let resources = dictionary! {
            "Font" => self.fonts_id,
            "XObject" => xobject_dict,
        };
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.kids.push(page_id.into());
        self
    }

    /// Set the document information dictionary.
    pub(crate) fn info(mut self, info: Dictionary) -> Self {
        self.info = Some(info);
        self
    }

    pub(crate) fn build(mut self) -> Document {
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
        if let Some(info) = self.info {
            let info_id = self.doc.add_object(info);
            self.doc.trailer.set("Info", info_id);
        }
        self.doc
    }

    pub(crate) fn save(self, path: &Path) {
        let mut doc = self.build();
        doc.save(path).unwrap();
    }
}

/// One line of text as its own text object.
pub(crate) fn text_line(font: &str, size: f32, x: f32, y: f32, text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)");
    format!("BT /{font} {size} Tf {x} {y} Td ({escaped}) Tj ET\n")
}

/// An uncompressed 8-bit RGB image XObject with a diagonal gradient.
pub(crate) fn rgb_image_stream(width: u32, height: u32) -> Stream {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[(x * 40 % 256) as u8, (y * 40 % 256) as u8, 128]);
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
