use std::fmt;
use std::sync::Arc;

use base64::Engine;
use imagesize::ImageType;

use crate::error::LoadFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }
}

/// A decoded-enough, drawable image: encoded bytes whose format and pixel
/// size have been recognized. Cloning is cheap.
#[derive(Clone, PartialEq, Eq)]
pub struct LogoImage {
    bytes: Arc<[u8]>,
    format: ImageFormat,
    width: u32,
    height: u32,
}

impl LogoImage {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Result<Self, LoadFailure> {
        let bytes: Arc<[u8]> = bytes.into();

        let format = match imagesize::image_type(&bytes) {
            Ok(ImageType::Png) => ImageFormat::Png,
            Ok(ImageType::Jpeg) => ImageFormat::Jpeg,
            Ok(ImageType::Gif) => ImageFormat::Gif,
            Ok(ImageType::Webp) => ImageFormat::Webp,
            Ok(other) => {
                return Err(LoadFailure::UnsupportedImage(format!(
                    "format {:?} cannot be embedded",
                    other
                )));
            }
            Err(e) => return Err(LoadFailure::UnsupportedImage(e.to_string())),
        };

        let size = imagesize::blob_size(&bytes)
            .map_err(|e| LoadFailure::UnsupportedImage(e.to_string()))?;
        if size.width == 0 || size.height == 0 {
            return Err(LoadFailure::UnsupportedImage(
                "image has zero width or height".to_string(),
            ));
        }

        Ok(Self {
            bytes,
            format,
            width: u32::try_from(size.width).unwrap_or(u32::MAX),
            height: u32::try_from(size.height).unwrap_or(u32::MAX),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Self-contained `data:` URI suitable for embedding in the scene.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

impl fmt::Debug for LogoImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogoImage")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}
