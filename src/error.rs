//! Error types for the manga-mask crate.

/// Errors that can occur while building masks, removing backgrounds or compositing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A parameter or input record is unusable (negative tolerance, zero scale, ...).
    ///
    /// Rejected at the boundary of the component that received it; nothing is
    /// partially applied.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The image exceeds the configured pixel ceiling.
    #[error("image too large ({width}x{height}), limit is {max_pixels} pixels")]
    ImageTooLarge {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Configured maximum pixel count.
        max_pixels: u64,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Detector output could not be parsed.
    #[error("invalid detections: {0}")]
    Detections(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInput(reason.into())
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let io_err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io_err.to_string().contains("gone"));

        let unsupported = Error::UnsupportedFormat("tiff".to_string());
        assert!(unsupported.to_string().contains("tiff"));

        let too_large = Error::ImageTooLarge {
            width: 10_000,
            height: 20_000,
            max_pixels: 1_000,
        };
        let msg = too_large.to_string();
        assert!(msg.contains("10000x20000"));
        assert!(msg.contains("1000 pixels"));

        let malformed = Error::malformed("scale must be positive");
        assert!(malformed.to_string().starts_with("malformed input"));
    }
}
