use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("could not encode image: {0}")]
    Encode(String),
}

/// Turns downloaded bytes into the canonical on-disk format.
pub trait AssetCodec: Send + Sync {
    fn transcode(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Extension of the canonical format, without the dot.
    fn extension(&self) -> &str;
}

/// Stores bytes untouched under a fixed extension.
#[derive(Debug, Clone)]
pub struct PassthroughCodec {
    extension: String,
}

impl PassthroughCodec {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }
}

impl AssetCodec for PassthroughCodec {
    fn transcode(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(raw.to_vec())
    }

    fn extension(&self) -> &str {
        &self.extension
    }
}

/// Decodes WebP/PNG/GIF/JPEG and re-encodes as RGB JPEG.
#[derive(Debug, Clone, Copy)]
pub struct JpegCodec {
    quality: u8,
}

impl JpegCodec {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self::new(90)
    }
}

impl AssetCodec for JpegCodec {
    fn transcode(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError> {
        let decoded =
            image::load_from_memory(raw).map_err(|err| CodecError::Decode(err.to_string()))?;
        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());

        let mut out = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, self.quality))
            .map_err(|err| CodecError::Encode(err.to_string()))?;
        Ok(out)
    }

    fn extension(&self) -> &str {
        "jpg"
    }
}
