//! Decoding of PDF image XObjects and re-encoding at a quality tier.
//!
//! Supported inputs are JPEG (`DCTDecode`) and raw samples behind `FlateDecode`,
//! `LZWDecode` or no filter, in gray, RGB, CMYK and indexed color spaces at
//! 1 to 16 bits per component. Soft masks become an alpha channel.

use std::io::Cursor;

use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, ImageBuffer, Rgb, RgbImage, RgbaImage};
use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream};

use crate::error::Result;

use super::quality::{ImageFormat, Quality};

/// Images above this many pixels are refused rather than decoded.
const MAX_PIXELS: u64 = 100_000_000;

/// Filters that need a codec this crate does not carry.
const UNSUPPORTED_FILTERS: [&[u8]; 3] = [b"JPXDecode", b"JBIG2Decode", b"CCITTFaxDecode"];

/// An image re-encoded for output.
#[derive(Debug, Clone)]
pub struct CompressedImage {
    /// Encoded file contents
    pub bytes: Vec<u8>,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Width of the decoded source
    pub original_width: u32,
    /// Height of the decoded source
    pub original_height: u32,
}

/// Decode an image XObject.
///
/// Errors are plain reasons; the caller knows the page and index they
/// belong to.
pub fn decode_image(doc: &LopdfDocument, stream: &Stream) -> std::result::Result<DynamicImage, String> {
    let image = decode_samples(doc, stream)?;

    let smask = match stream.dict.get(b"SMask") {
        Ok(Object::Reference(id)) => doc.get_object(*id).ok().and_then(|o| o.as_stream().ok()),
        _ => None,
    };
    let Some(smask) = smask else {
        return Ok(image);
    };

    match decode_samples(doc, smask) {
        Ok(mask) => Ok(apply_soft_mask(image, mask)),
        Err(reason) => {
            log::debug!("Ignoring undecodable soft mask: {}", reason);
            Ok(image)
        }
    }
}

fn decode_samples(doc: &LopdfDocument, stream: &Stream) -> std::result::Result<DynamicImage, String> {
    let filters = filter_names(&stream.dict);
    if let Some(filter) = filters
        .iter()
        .find(|f| UNSUPPORTED_FILTERS.contains(&f.as_slice()))
    {
        return Err(format!("{} is not supported", String::from_utf8_lossy(filter)));
    }

    let width = dict_u32(&stream.dict, b"Width").ok_or("missing /Width")?;
    let height = dict_u32(&stream.dict, b"Height").ok_or("missing /Height")?;
    if width == 0 || height == 0 {
        return Err("empty image".to_string());
    }
    if width as u64 * height as u64 > MAX_PIXELS {
        return Err(format!("image too large ({}x{})", width, height));
    }

    let invert = decode_inverted(&stream.dict);

    if filters.last().is_some_and(|f| f == b"DCTDecode") {
        let data = if filters.len() > 1 {
            // Outer filters wrap the JPEG bytes; lopdf stops at DCTDecode
            stream
                .decompressed_content()
                .map_err(|e| format!("cannot decompress: {}", e))?
        } else {
            stream.content.clone()
        };
        let mut image = image::load_from_memory_with_format(&data, image::ImageFormat::Jpeg)
            .map_err(|e| format!("invalid JPEG data: {}", e))?;
        if invert {
            image.invert();
        }
        return Ok(image);
    }

    let data = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream
            .decompressed_content()
            .map_err(|e| format!("cannot decompress: {}", e))?
    };

    let bits = dict_u32(&stream.dict, b"BitsPerComponent").unwrap_or(8);
    if !matches!(bits, 1 | 2 | 4 | 8 | 16) {
        return Err(format!("unsupported bit depth {}", bits));
    }

    let color_space = match stream.dict.get(b"ColorSpace") {
        Ok(obj) => ColorSpace::resolve(doc, obj, 0)?,
        Err(_) => ColorSpace::Gray,
    };
    let raster = Raster {
        width,
        height,
        bits,
        components: color_space.sample_components(),
    };
    let samples = raster.unpack(&data, !matches!(color_space, ColorSpace::Indexed { .. }))?;
    let samples = match (&color_space, invert) {
        (_, false) => samples,
        // indices run from hival down to 0
        (ColorSpace::Indexed { hival, .. }, true) => {
            samples.into_iter().map(|i| hival.saturating_sub(i)).collect()
        }
        (_, true) => samples.into_iter().map(|s| 255 - s).collect(),
    };

    color_space.to_image(width, height, samples)
}

/// Names in `/Filter`, which may be a single name or an array.
fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

fn dict_u32(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key)
        .and_then(Object::as_i64)
        .ok()
        .and_then(|v| u32::try_from(v).ok())
}

/// A `/Decode [1 0]` array flips sample values.
fn decode_inverted(dict: &Dictionary) -> bool {
    let Ok(Object::Array(items)) = dict.get(b"Decode") else {
        return false;
    };
    let value = |o: &Object| match o {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    };
    matches!(
        (items.first().and_then(value), items.get(1).and_then(value)),
        (Some(lo), Some(hi)) if lo > hi
    )
}

/// Color space of raw image samples.
#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<ColorSpace>,
        hival: u8,
        lookup: Vec<u8>,
    },
}

impl ColorSpace {
    fn resolve(doc: &LopdfDocument, obj: &Object, depth: u8) -> std::result::Result<Self, String> {
        if depth > 4 {
            return Err("color space nesting too deep".to_string());
        }
        match obj {
            Object::Reference(id) => {
                let target = doc
                    .get_object(*id)
                    .map_err(|e| format!("broken color space reference: {}", e))?;
                Self::resolve(doc, target, depth + 1)
            }
            Object::Name(name) => Self::from_name(name),
            Object::Array(items) => {
                let family = items
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .ok_or("color space array without a family name")?;
                match family {
                    b"ICCBased" => {
                        let n = items
                            .get(1)
                            .and_then(|o| match o {
                                Object::Reference(id) => doc.get_object(*id).ok(),
                                other => Some(other),
                            })
                            .and_then(|o| o.as_stream().ok())
                            .and_then(|s| dict_u32(&s.dict, b"N"))
                            .unwrap_or(3);
                        match n {
                            1 => Ok(ColorSpace::Gray),
                            3 => Ok(ColorSpace::Rgb),
                            4 => Ok(ColorSpace::Cmyk),
                            _ => Err(format!("ICC profile with {} components", n)),
                        }
                    }
                    b"Indexed" | b"I" => {
                        let base = items.get(1).ok_or("indexed color space without base")?;
                        let base = Self::resolve(doc, base, depth + 1)?;
                        if matches!(base, ColorSpace::Indexed { .. }) {
                            return Err("indexed over indexed color space".to_string());
                        }
                        let hival = items
                            .get(2)
                            .and_then(|o| o.as_i64().ok())
                            .map(|v| v.clamp(0, 255) as u8)
                            .ok_or("indexed color space without hival")?;
                        let lookup = match items.get(3) {
                            Some(Object::String(bytes, _)) => bytes.clone(),
                            Some(Object::Reference(id)) => match doc.get_object(*id) {
                                Ok(Object::Stream(s)) => {
                                    s.decompressed_content().unwrap_or_else(|_| s.content.clone())
                                }
                                Ok(Object::String(bytes, _)) => bytes.clone(),
                                _ => return Err("unreadable indexed lookup table".to_string()),
                            },
                            Some(Object::Stream(s)) => {
                                s.decompressed_content().unwrap_or_else(|_| s.content.clone())
                            }
                            _ => return Err("indexed color space without lookup".to_string()),
                        };
                        Ok(ColorSpace::Indexed {
                            base: Box::new(base),
                            hival,
                            lookup,
                        })
                    }
                    other => Self::from_name(other),
                }
            }
            _ => Err("malformed color space".to_string()),
        }
    }

    fn from_name(name: &[u8]) -> std::result::Result<Self, String> {
        match name {
            b"DeviceGray" | b"G" | b"CalGray" => Ok(ColorSpace::Gray),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(ColorSpace::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(ColorSpace::Cmyk),
            other => Err(format!(
                "unsupported color space {}",
                String::from_utf8_lossy(other)
            )),
        }
    }

    /// Components per pixel in the color space itself.
    fn components(&self) -> usize {
        match self {
            ColorSpace::Gray => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
            ColorSpace::Indexed { base, .. } => base.components(),
        }
    }

    /// Components per pixel in the stream data.
    fn sample_components(&self) -> usize {
        match self {
            ColorSpace::Indexed { .. } => 1,
            other => other.components(),
        }
    }

    /// Build an image from 8-bit samples (palette indices for indexed data).
    fn to_image(
        &self,
        width: u32,
        height: u32,
        samples: Vec<u8>,
    ) -> std::result::Result<DynamicImage, String> {
        match self {
            ColorSpace::Gray => GrayImage::from_raw(width, height, samples)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| "sample buffer size mismatch".to_string()),
            ColorSpace::Rgb => RgbImage::from_raw(width, height, samples)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| "sample buffer size mismatch".to_string()),
            ColorSpace::Cmyk => {
                let rgb: Vec<u8> = samples.chunks_exact(4).flat_map(cmyk_to_rgb).collect();
                RgbImage::from_raw(width, height, rgb)
                    .map(DynamicImage::ImageRgb8)
                    .ok_or_else(|| "sample buffer size mismatch".to_string())
            }
            ColorSpace::Indexed {
                base,
                hival,
                lookup,
            } => {
                let n = base.components();
                let mut expanded = Vec::with_capacity(samples.len() * n);
                for index in samples {
                    let index = index.min(*hival) as usize;
                    let entry = lookup
                        .get(index * n..index * n + n)
                        .ok_or("palette index beyond lookup table")?;
                    expanded.extend_from_slice(entry);
                }
                base.to_image(width, height, expanded)
            }
        }
    }
}

fn cmyk_to_rgb(cmyk: &[u8]) -> [u8; 3] {
    let k = 255 - cmyk[3] as u16;
    let channel = |c: u8| ((255 - c as u16) * k / 255) as u8;
    [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
}

/// Packed sample layout of an image.
struct Raster {
    width: u32,
    height: u32,
    bits: u32,
    components: usize,
}

impl Raster {
    /// Unpack rows into one byte per sample.
    ///
    /// With `scale`, values are stretched to the full 0-255 range; without it
    /// they are kept as-is (palette indices).
    fn unpack(&self, data: &[u8], scale: bool) -> std::result::Result<Vec<u8>, String> {
        let samples_per_row = self.width as usize * self.components;
        let row_bytes = (samples_per_row * self.bits as usize).div_ceil(8);
        let needed = row_bytes * self.height as usize;
        if data.len() < needed {
            return Err(format!(
                "truncated image data ({} of {} bytes)",
                data.len(),
                needed
            ));
        }

        if self.bits == 8 {
            return Ok(data[..needed].to_vec());
        }

        let max = (1u32 << self.bits.min(8)) - 1;
        let mut out = Vec::with_capacity(samples_per_row * self.height as usize);
        for row in data[..needed].chunks_exact(row_bytes) {
            if self.bits == 16 {
                out.extend(row.chunks_exact(2).map(|pair| pair[0]));
                continue;
            }
            for i in 0..samples_per_row {
                let bit = i * self.bits as usize;
                let byte = row[bit / 8];
                let shift = 8 - self.bits as usize - bit % 8;
                let value = (byte as u32 >> shift) & max;
                out.push(if scale { (value * 255 / max) as u8 } else { value as u8 });
            }
        }
        Ok(out)
    }
}

/// Use a decoded soft mask as the alpha channel.
fn apply_soft_mask(image: DynamicImage, mask: DynamicImage) -> DynamicImage {
    let (width, height) = image.dimensions();
    let mask = if mask.dimensions() != (width, height) {
        mask.resize_exact(width, height, FilterType::Triangle)
    } else {
        mask
    }
    .to_luma8();

    let mut rgba: RgbaImage = image.to_rgba8();
    for (pixel, alpha) in rgba.pixels_mut().zip(mask.pixels()) {
        pixel[3] = alpha[0];
    }
    DynamicImage::ImageRgba8(rgba)
}

/// Resize and encode a decoded image for a tier.
///
/// Images are only ever shrunk, preserving aspect ratio. JPEG output
/// flattens transparency onto white and records the tier's DPI.
pub fn compress_image(image: DynamicImage, quality: Quality, format: ImageFormat) -> Result<CompressedImage> {
    let settings = quality.settings();
    let (original_width, original_height) = image.dimensions();

    let image = if original_width.max(original_height) > settings.max_dimension {
        image.resize(settings.max_dimension, settings.max_dimension, FilterType::Lanczos3)
    } else {
        image
    };
    let (width, height) = image.dimensions();

    let mut bytes = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let mut encoder = JpegEncoder::new_with_quality(&mut bytes, settings.jpeg_quality);
            encoder.set_pixel_density(PixelDensity::dpi(settings.dpi));
            match image {
                DynamicImage::ImageLuma8(gray) => encoder.encode_image(&gray)?,
                other if other.color().has_alpha() => {
                    encoder.encode_image(&flatten_on_white(&other.to_rgba8()))?
                }
                other => encoder.encode_image(&other.to_rgb8())?,
            }
        }
        ImageFormat::Png => {
            let encoder = PngEncoder::new_with_quality(
                Cursor::new(&mut bytes),
                CompressionType::Best,
                PngFilter::Adaptive,
            );
            image.write_with_encoder(encoder)?;
        }
    }

    Ok(CompressedImage {
        bytes,
        width,
        height,
        original_width,
        original_height,
    })
}

fn flatten_on_white(rgba: &RgbaImage) -> RgbImage {
    ImageBuffer::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |c: u8| ((c as u16 * a as u16 + 255 * (255 - a as u16)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
