// src/screenshot.rs

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// One captured screen, RGBA8.
pub type Frame = RgbaImage;

/// Solid frame of the given size, used by the headless desktop.
pub fn blank_frame(width: u32, height: u32, fill: [u8; 4]) -> Frame {
    RgbaImage::from_pixel(width, height, Rgba(fill))
}

/// Encode a frame as PNG bytes.
pub fn encode_png(frame: &Frame) -> Result<Vec<u8>> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(anyhow!("cannot encode an empty frame"));
    }
    let mut png = Vec::new();
    DynamicImage::ImageRgba8(frame.clone())
        .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
        .map_err(|e| anyhow!("png encoding failed: {}", e))?;
    Ok(png)
}

/// PNG-encode a frame and return it as standard base64, the shape the capture
/// endpoint ships to clients.
pub fn encode_png_base64(frame: &Frame) -> Result<String> {
    let png = encode_png(frame)?;
    log::debug!(
        "encoded {}x{} frame ({} KB png)",
        frame.width(),
        frame.height(),
        png.len() / 1024
    );
    Ok(general_purpose::STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_payload_decodes_to_png() {
        let frame = blank_frame(4, 3, [10, 20, 30, 255]);
        let b64 = encode_png_base64(&frame).unwrap();
        let bytes = general_purpose::STANDARD.decode(b64).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(2, 1), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn empty_frame_is_rejected() {
        let frame = RgbaImage::new(0, 0);
        assert!(encode_png(&frame).is_err());
    }
}
