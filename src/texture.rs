use std::{fmt, path::Path};

use anyhow::Context;
use asset_common::scene::TextureSlot;

/// Channel layout a texture is decoded to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn channels(self) -> u8 {
        match self {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub pixels: Vec<u8>,
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("pixels_len", &self.pixels.len())
            .finish()
    }
}

/// Turns encoded image bytes into raw, tightly packed pixels.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8], format: PixelFormat) -> anyhow::Result<DecodedImage>;
}

/// Decodes PNG and JPEG files with the `image` crate.
#[derive(Default)]
pub struct RasterDecoder {}

impl RasterDecoder {
    pub fn new() -> Self {
        Self {}
    }
}

impl ImageDecoder for RasterDecoder {
    fn decode(&self, bytes: &[u8], format: PixelFormat) -> anyhow::Result<DecodedImage> {
        let image = image::load_from_memory(bytes)?;
        let decoded = match format {
            PixelFormat::Rgb => {
                let image = image.to_rgb8();
                DecodedImage {
                    width: image.width(),
                    height: image.height(),
                    channels: format.channels(),
                    pixels: image.into_raw(),
                }
            }
            PixelFormat::Rgba => {
                let image = image.to_rgba8();
                DecodedImage {
                    width: image.width(),
                    height: image.height(),
                    channels: format.channels(),
                    pixels: image.into_raw(),
                }
            }
        };
        Ok(decoded)
    }
}

/// A texture a material wants decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureRequest {
    pub file_name: String,
    pub slot: TextureSlot,
    pub format: PixelFormat,
}

impl TextureRequest {
    pub fn new(file_name: impl Into<String>, slot: TextureSlot, format: PixelFormat) -> Self {
        Self {
            file_name: file_name.into(),
            slot,
            format,
        }
    }
}

/// A decoded texture, keyed process-wide by its file name.
#[derive(Clone, PartialEq, Eq)]
pub struct Texture {
    pub file_name: String,
    /// The slot the texture was first requested for.
    pub slot: TextureSlot,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub pixels: Vec<u8>,
}

impl Texture {
    pub fn byte_length(&self) -> u64 {
        self.pixels.len() as u64
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("file_name", &self.file_name)
            .field("slot", &self.slot)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .finish()
    }
}

/// Reads `request.file_name` from the input directory and decodes it.
pub fn load_texture(
    decoder: &dyn ImageDecoder,
    input_dir: &Path,
    request: &TextureRequest,
) -> anyhow::Result<Texture> {
    let path = input_dir.join(&request.file_name);
    let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {:?}", path))?;
    let image = decoder
        .decode(&bytes, request.format)
        .with_context(|| format!("Failed to decode {:?}", path))?;
    Ok(Texture {
        file_name: request.file_name.clone(),
        slot: request.slot,
        width: image.width,
        height: image.height,
        channels: image.channels,
        pixels: image.pixels,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn encode_png(image: &image::RgbaImage) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    #[test]
    fn decodes_to_the_requested_channel_count() {
        let image = image::RgbaImage::from_raw(2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let png = encode_png(&image);
        let decoder = RasterDecoder::new();

        let rgba = decoder.decode(&png, PixelFormat::Rgba).unwrap();
        assert_eq!((rgba.width, rgba.height, rgba.channels), (2, 1, 4));
        assert_eq!(rgba.pixels, vec![1, 2, 3, 4, 5, 6, 7, 8]);

        let rgb = decoder.decode(&png, PixelFormat::Rgb).unwrap();
        assert_eq!(rgb.channels, 3);
        assert_eq!(rgb.pixels, vec![1, 2, 3, 5, 6, 7]);
    }

    #[test]
    fn load_texture_reads_from_the_input_directory() {
        let dir = tempfile::tempdir().unwrap();
        let image = image::RgbaImage::from_raw(1, 1, vec![9, 8, 7, 255]).unwrap();
        std::fs::write(dir.path().join("wood.png"), encode_png(&image)).unwrap();

        let request = TextureRequest::new("wood.png", TextureSlot::Diffuse, PixelFormat::Rgb);
        let texture = load_texture(&RasterDecoder::new(), dir.path(), &request).unwrap();
        assert_eq!(texture.file_name, "wood.png");
        assert_eq!(texture.slot, TextureSlot::Diffuse);
        assert_eq!(texture.byte_length(), 3);

        let missing = TextureRequest::new("missing.png", TextureSlot::Diffuse, PixelFormat::Rgb);
        assert!(load_texture(&RasterDecoder::new(), dir.path(), &missing).is_err());
    }

    #[test]
    fn garbage_is_not_an_image() {
        assert!(RasterDecoder::new()
            .decode(b"definitely not a png", PixelFormat::Rgb)
            .is_err());
    }
}
