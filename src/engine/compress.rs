//! Stream and image recompression.
//!
//! Three passes over the object table, in this order:
//!
//! 1. **Streams**: every non-image stream that is either unfiltered or
//!    plain `FlateDecode` is re-deflated at the requested zlib level.
//! 2. **Images**: 8-bit DeviceRGB / DeviceGray images are re-encoded as
//!    JPEG at a fixed quality, independent of the zlib level.
//! 3. **Orphans**: objects no longer reachable from the trailer are dropped.
//!    Identical objects are *not* merged; two pages sharing a byte-equal
//!    font program keep two copies.
//!
//! Passes 1 and 2 keep a rewrite only when it is strictly smaller than what
//! it replaces, so they never grow the file.

use crate::engine::stream_filters;
use crate::error::ToolkitError;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use lopdf::{Dictionary, Document, Object, Stream};
use std::io::{Read, Write};
use tracing::{debug, trace};

const OP: &str = "compression";

/// What a compression run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressStats {
    pub streams_recompressed: usize,
    pub images_recompressed: usize,
    pub objects_pruned: usize,
}

/// Compress `doc` in place.
///
/// # Arguments
/// * `zlib_level`    — 0–9, already mapped from the user-facing level
/// * `image_quality` — JPEG quality for recompressed images
pub fn compress_document(
    doc: &mut Document,
    zlib_level: u32,
    image_quality: u8,
) -> Result<CompressStats, ToolkitError> {
    let mut stats = CompressStats::default();
    let level = Compression::new(zlib_level.min(9));

    for (id, object) in doc.objects.iter_mut() {
        let Object::Stream(stream) = object else {
            continue;
        };
        if is_image(&stream.dict) {
            if recompress_image(stream, image_quality)? {
                trace!("Recompressed image {:?}", id);
                stats.images_recompressed += 1;
            }
        } else if recompress_stream(stream, level)? {
            stats.streams_recompressed += 1;
        }
    }

    stats.objects_pruned = doc.prune_objects().len();

    debug!(
        "Compression: {} streams, {} images recompressed; {} orphans pruned",
        stats.streams_recompressed, stats.images_recompressed, stats.objects_pruned
    );
    Ok(stats)
}

fn is_image(dict: &Dictionary) -> bool {
    matches!(dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Image")
}

fn name_is(dict: &Dictionary, key: &[u8], value: &[u8]) -> bool {
    matches!(dict.get(key), Ok(Object::Name(n)) if n == value)
}

// ── Generic streams ──────────────────────────────────────────────────────

fn recompress_stream(stream: &mut Stream, level: Compression) -> Result<bool, ToolkitError> {
    // Cross-reference and object streams are rebuilt by the writer.
    if name_is(&stream.dict, b"Type", b"XRef") || name_is(&stream.dict, b"Type", b"ObjStm") {
        return Ok(false);
    }

    let filters = stream_filters(&stream.dict);
    let raw = match filters.as_slice() {
        [] => stream.content.clone(),
        [f] if f == b"FlateDecode" && !stream.dict.has(b"DecodeParms") => {
            match inflate(&stream.content) {
                Ok(raw) => raw,
                // Damaged data is left exactly as found.
                Err(_) => return Ok(false),
            }
        }
        _ => return Ok(false),
    };

    let packed = deflate(&raw, level)?;
    if packed.len() >= stream.content.len() {
        return Ok(false);
    }
    stream
        .dict
        .set("Filter", Object::Name(b"FlateDecode".to_vec()));
    stream.set_content(packed);
    Ok(true)
}

pub(crate) fn inflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 2);
    ZlibDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

fn deflate(data: &[u8], level: Compression) -> Result<Vec<u8>, ToolkitError> {
    let mut enc = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), level);
    enc.write_all(data)
        .and_then(|_| enc.finish())
        .map_err(|e| ToolkitError::engine(OP, format!("deflate failed: {e}")))
}

// ── Images ───────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
enum Channels {
    Rgb,
    Gray,
}

/// Re-encode one image XObject as JPEG when that makes it smaller.
///
/// Anything unusual is skipped, not failed: masks, non-8-bit samples,
/// indexed/ICC/CMYK colour spaces, predictors and chained filters.
fn recompress_image(stream: &mut Stream, quality: u8) -> Result<bool, ToolkitError> {
    let dict = &stream.dict;
    if dict.has(b"Mask") || dict.has(b"DecodeParms") {
        return Ok(false);
    }
    if matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true))) {
        return Ok(false);
    }
    if !matches!(dict.get(b"BitsPerComponent"), Ok(Object::Integer(8))) {
        return Ok(false);
    }
    let channels = if name_is(dict, b"ColorSpace", b"DeviceRGB") {
        Channels::Rgb
    } else if name_is(dict, b"ColorSpace", b"DeviceGray") {
        Channels::Gray
    } else {
        return Ok(false);
    };
    let (Some(width), Some(height)) = (dimension(dict, b"Width"), dimension(dict, b"Height")) else {
        return Ok(false);
    };

    let filters = stream_filters(dict);
    let decoded = match filters.as_slice() {
        [f] if f == b"DCTDecode" => {
            match image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg) {
                Ok(img) if img.width() == width && img.height() == height => img,
                _ => return Ok(false),
            }
        }
        [f] if f == b"FlateDecode" => match inflate(&stream.content) {
            Ok(raw) => match raw_to_image(raw, width, height, channels) {
                Some(img) => img,
                None => return Ok(false),
            },
            Err(_) => return Ok(false),
        },
        [] => match raw_to_image(stream.content.clone(), width, height, channels) {
            Some(img) => img,
            None => return Ok(false),
        },
        _ => return Ok(false),
    };

    let jpeg = encode_jpeg(&decoded, channels, quality)?;
    if jpeg.len() >= stream.content.len() {
        return Ok(false);
    }

    stream.dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    stream.set_content(jpeg);
    Ok(true)
}

fn dimension(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    match dict.get(key) {
        Ok(Object::Integer(n)) if *n > 0 => u32::try_from(*n).ok(),
        _ => None,
    }
}

fn raw_to_image(raw: Vec<u8>, width: u32, height: u32, channels: Channels) -> Option<DynamicImage> {
    let per_pixel = match channels {
        Channels::Rgb => 3,
        Channels::Gray => 1,
    };
    let expected = (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(per_pixel)?;
    if raw.len() < expected {
        return None;
    }
    let mut raw = raw;
    raw.truncate(expected);
    match channels {
        Channels::Rgb => image::RgbImage::from_raw(width, height, raw).map(DynamicImage::ImageRgb8),
        Channels::Gray => {
            image::GrayImage::from_raw(width, height, raw).map(DynamicImage::ImageLuma8)
        }
    }
}

fn encode_jpeg(img: &DynamicImage, channels: Channels, quality: u8) -> Result<Vec<u8>, ToolkitError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    let result = match channels {
        Channels::Rgb => img.to_rgb8().write_with_encoder(encoder),
        Channels::Gray => img.to_luma8().write_with_encoder(encoder),
    };
    result.map_err(|e| ToolkitError::engine(OP, format!("JPEG encoding failed: {e}")))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn image_stream(width: u32, height: u32, pixels: Vec<u8>) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            pixels,
        )
    }

    #[test]
    fn plain_stream_is_deflated() {
        let content = b"BT /F1 12 Tf 72 700 Td (Hello) Tj ET\n".repeat(50);
        let mut s = Stream::new(Dictionary::new(), content.clone());
        assert!(recompress_stream(&mut s, Compression::new(6)).unwrap());
        assert!(name_is(&s.dict, b"Filter", b"FlateDecode"));
        assert_eq!(inflate(&s.content).unwrap(), content);
    }

    #[test]
    fn foreign_filters_are_untouched() {
        let mut s = Stream::new(
            dictionary! { "Filter" => "LZWDecode" },
            b"opaque".to_vec(),
        );
        assert!(!recompress_stream(&mut s, Compression::best()).unwrap());
        assert_eq!(s.content, b"opaque");
    }

    #[test]
    fn raw_rgb_image_becomes_jpeg() {
        // Smooth gradient: compresses very well as JPEG.
        let (w, h) = (64u32, 64u32);
        let mut pixels = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                pixels.extend_from_slice(&[(x * 4) as u8, (y * 4) as u8, 128]);
            }
        }
        let mut s = image_stream(w, h, pixels);
        assert!(recompress_image(&mut s, 60).unwrap());
        assert!(name_is(&s.dict, b"Filter", b"DCTDecode"));
        assert_eq!(&s.content[..3], &[0xFFu8, 0xD8, 0xFF]);
    }

    #[test]
    fn short_pixel_data_is_skipped() {
        let mut s = image_stream(10, 10, vec![0; 12]);
        assert!(!recompress_image(&mut s, 60).unwrap());
    }

    #[test]
    fn indexed_images_are_skipped() {
        let mut s = image_stream(2, 2, vec![0; 12]);
        s.dict.set("ColorSpace", Object::Name(b"Indexed".to_vec()));
        assert!(!recompress_image(&mut s, 60).unwrap());
    }

    #[test]
    fn orphans_are_pruned_but_duplicates_kept() {
        let mut doc = Document::with_version("1.5");
        let a = doc.add_object(Object::String(b"same".to_vec(), lopdf::StringFormat::Literal));
        let b = doc.add_object(Object::String(b"same".to_vec(), lopdf::StringFormat::Literal));
        let _orphan = doc.add_object(Object::Integer(42));
        let catalog = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "A" => a,
            "B" => b,
        });
        doc.trailer.set("Root", catalog);

        let stats = compress_document(&mut doc, 9, 60).unwrap();
        assert_eq!(stats.objects_pruned, 1);
        assert!(doc.objects.contains_key(&a));
        assert!(doc.objects.contains_key(&b));
    }
}
