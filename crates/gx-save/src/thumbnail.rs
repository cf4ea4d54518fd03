//! Save-state thumbnails

use gx_core::SaveError;

/// Borrowed RGBA frame as shown on the display surface
#[derive(Debug, Clone, Copy)]
pub struct FrameRef<'a> {
    pub rgba: &'a [u8],
    pub width: u32,
    pub height: u32,
}

/// Encode a half-size PNG thumbnail of `frame`
pub fn encode(frame: FrameRef<'_>) -> Result<Vec<u8>, SaveError> {
    let expected = frame.width as usize * frame.height as usize * 4;
    if frame.width < 2 || frame.height < 2 || frame.rgba.len() < expected {
        return Err(SaveError::Metadata(format!(
            "frame of {} bytes does not hold {}x{} RGBA",
            frame.rgba.len(),
            frame.width,
            frame.height
        )));
    }

    let width = frame.width / 2;
    let height = frame.height / 2;
    let stride = frame.width as usize * 4;

    // Nearest-neighbour: keep the top-left pixel of every 2x2 block
    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height as usize {
        let row = &frame.rgba[y * 2 * stride..];
        for x in 0..width as usize {
            let px = &row[x * 8..x * 8 + 4];
            rgba.extend_from_slice(&[px[0], px[1], px[2], 0xFF]);
        }
    }

    let mut png_buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_buf, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| SaveError::Metadata(format!("PNG encode error: {e}")))?;
        writer
            .write_image_data(&rgba)
            .map_err(|e| SaveError::Metadata(format!("PNG encode error: {e}")))?;
    }
    Ok(png_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dimensions(png_bytes: &[u8]) -> (u32, u32) {
        let reader = png::Decoder::new(png_bytes).read_info().unwrap();
        let info = reader.info();
        (info.width, info.height)
    }

    #[test]
    fn test_half_size_thumbnail() {
        let rgba = vec![0x40u8; 320 * 224 * 4];
        let png = encode(FrameRef {
            rgba: &rgba,
            width: 320,
            height: 224,
        })
        .unwrap();
        assert_eq!(&png[1..4], b"PNG");
        assert_eq!(dimensions(&png), (160, 112));
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let rgba = vec![0u8; 16];
        let result = encode(FrameRef {
            rgba: &rgba,
            width: 320,
            height: 224,
        });
        assert!(matches!(result, Err(SaveError::Metadata(_))));
    }
}
