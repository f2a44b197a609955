use std::path::Path;

use crate::error::RenderError;

/// Decoded texture ready for upload, always expanded to RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Channel count of the source file (3 or 4).
    pub channels: u8,
}

impl DecodedImage {
    pub fn bytes_per_row(&self) -> u32 {
        self.width * 4
    }
}

/// Decodes an image file. Only RGB and RGBA sources are accepted.
pub fn load_image(path: &Path) -> Result<DecodedImage, RenderError> {
    let image = image::open(path).map_err(|err| RenderError::TextureLoad {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    let channels = image.color().channel_count();
    if !matches!(channels, 3 | 4) {
        return Err(RenderError::TextureLoad {
            path: path.to_path_buf(),
            reason: format!("unsupported channel count {channels}"),
        });
    }
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    log::debug!(
        "decoded texture {} ({width}x{height}, {channels} channels)",
        path.display()
    );
    Ok(DecodedImage {
        pixels: rgba.into_raw(),
        width,
        height,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayAlphaImage, RgbImage, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn rgb_png_is_expanded_to_rgba() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rgb.png");
        RgbImage::from_pixel(2, 3, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let decoded = load_image(&path).unwrap();
        assert_eq!((decoded.width, decoded.height), (2, 3));
        assert_eq!(decoded.channels, 3);
        assert_eq!(decoded.pixels.len(), 2 * 3 * 4);
        assert_eq!(&decoded.pixels[..4], &[10, 20, 30, 255]);
        assert_eq!(decoded.bytes_per_row(), 8);
    }

    #[test]
    fn rgba_png_keeps_alpha() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rgba.png");
        RgbaImage::from_pixel(1, 1, image::Rgba([1, 2, 3, 4]))
            .save(&path)
            .unwrap();
        let decoded = load_image(&path).unwrap();
        assert_eq!(decoded.channels, 4);
        assert_eq!(decoded.pixels, vec![1, 2, 3, 4]);
    }

    #[test]
    fn two_channel_images_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gray.png");
        GrayAlphaImage::from_pixel(1, 1, image::LumaA([9, 9]))
            .save(&path)
            .unwrap();
        let err = load_image(&path).unwrap_err();
        assert!(matches!(err, RenderError::TextureLoad { .. }));
        assert!(err.to_string().contains("unsupported channel count 2"));
    }

    #[test]
    fn missing_file_is_a_texture_error() {
        let err = load_image(Path::new("does/not/exist.png")).unwrap_err();
        assert!(matches!(err, RenderError::TextureLoad { .. }));
    }
}
