//! Conversions between host-facing image bytes / data URLs and premultiplied pixmaps.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use tiny_skia::{ColorU8, IntSize, Pixmap};

use crate::error::{EditorError, EditorResult};

/// Decode any format the `image` crate understands into a pixmap.
pub fn decode_pixmap(bytes: &[u8]) -> EditorResult<Pixmap> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    pixmap_from_rgba(&image)
}

pub fn pixmap_from_rgba(image: &RgbaImage) -> EditorResult<Pixmap> {
    let (width, height) = image.dimensions();
    let size =
        IntSize::from_wh(width, height).ok_or(EditorError::InvalidDimensions { width, height })?;
    let mut data = Vec::with_capacity(image.as_raw().len());
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        let c = ColorU8::from_rgba(r, g, b, a).premultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Pixmap::from_vec(data, size).ok_or(EditorError::InvalidDimensions { width, height })
}

pub fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let mut data = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
        .unwrap_or_else(|| RgbaImage::new(pixmap.width(), pixmap.height()))
}

pub fn encode_png(pixmap: &Pixmap) -> EditorResult<Vec<u8>> {
    let mut bytes = Vec::new();
    pixmap_to_rgba(pixmap)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|err| EditorError::Encode(err.to_string()))?;
    Ok(bytes)
}

pub fn to_data_url(bytes: &[u8], mime_type: &str) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

/// Bytes and MIME type carried by a base64 `data:` URL.
pub fn from_data_url(url: &str) -> EditorResult<(Vec<u8>, String)> {
    let rest = url.strip_prefix("data:").ok_or(EditorError::InvalidDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(EditorError::InvalidDataUrl)?;
    let mime_type = header.strip_suffix(";base64").ok_or(EditorError::InvalidDataUrl)?;
    let bytes = STANDARD.decode(payload.trim()).map_err(|_| EditorError::InvalidDataUrl)?;
    Ok((bytes, mime_type.to_owned()))
}
