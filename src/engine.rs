//! Pipelines tying the masking components together.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::boxes::{self, Detection, DetectionSet};
use crate::color_key::ColorKey;
use crate::compositor::{self, PlacedRect, Placement};
use crate::error::{Error, Result};
use crate::fill;
use crate::mask::Mask;

/// Default brightness threshold for edge flood-fill background removal.
pub const DEFAULT_THRESHOLD: u8 = 240;

/// Default color-key tolerance.
pub const DEFAULT_TOLERANCE: f64 = 30.0;

/// Resource limits applied before any processing starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Largest accepted `width * height`.
    pub max_pixels: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_pixels: 8192 * 8192,
        }
    }
}

impl Limits {
    /// Check image dimensions against the limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] for a zero dimension and
    /// [`Error::ImageTooLarge`] above the pixel ceiling.
    pub fn check(&self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::malformed(format!("image is empty ({width}x{height})")));
        }
        if u64::from(width) * u64::from(height) > self.max_pixels {
            return Err(Error::ImageTooLarge {
                width,
                height,
                max_pixels: self.max_pixels,
            });
        }
        Ok(())
    }
}

/// How to make a character's background transparent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundRemoval {
    /// Clear bright pixels connected to the image border (line art on paper).
    EdgeFlood {
        /// Minimum value of every RGB channel for a pixel to count as background.
        threshold: u8,
    },
    /// Clear every pixel near a picked color, wherever it is (photos).
    ColorKey(ColorKey),
    /// Use the character's own alpha as-is (already masked in an edit session).
    Keep,
}

impl Default for BackgroundRemoval {
    fn default() -> Self {
        Self::EdgeFlood {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Options for inserting a character into a background.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsertOptions {
    /// Requested position and scale.
    pub placement: Placement,
    /// Background removal applied to the resized character.
    pub removal: BackgroundRemoval,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            placement: Placement {
                x: 0,
                y: 0,
                scale: 1.0,
            },
            removal: BackgroundRemoval::default(),
        }
    }
}

/// Output of the sketch-mask pipeline.
#[derive(Debug, Clone)]
pub struct SketchMask {
    /// Expanded, filtered detections that went into the mask.
    pub detections: Vec<Detection>,
    /// Regions to repaint.
    pub mask: Mask,
}

/// Output of the insert pipeline.
#[derive(Debug, Clone)]
pub struct InsertResult {
    /// The composited image, same size as the background.
    pub image: RgbaImage,
    /// Where the character landed.
    pub placed: PlacedRect,
}

/// Stateless entry point for the masking pipelines.
///
/// Holds only configuration; every call takes its rasters by reference and
/// returns new ones.
#[derive(Debug, Clone, Default)]
pub struct MaskEngine {
    limits: Limits,
}

impl MaskEngine {
    /// Create an engine with the given limits.
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    /// The configured limits.
    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Turn detector output into an inpainting mask for a `width x height` image.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are empty or exceed the limits.
    pub fn sketch_mask(&self, width: u32, height: u32, set: &DetectionSet) -> Result<SketchMask> {
        self.limits.check(width, height)?;
        let detections = boxes::aggregate(set, width, height);
        let rects: Vec<_> = detections.iter().map(|d| d.bbox).collect();
        let mask = Mask::from_boxes(width, height, &rects);
        log::info!(
            "sketch mask {width}x{height}: {} detections, {} pixels to repaint",
            detections.len(),
            mask.removed_count()
        );
        Ok(SketchMask { detections, mask })
    }

    /// Make the background of `character` transparent.
    ///
    /// # Errors
    ///
    /// Returns an error if the image is empty or exceeds the limits.
    pub fn remove_background(
        &self,
        character: &RgbaImage,
        removal: &BackgroundRemoval,
    ) -> Result<RgbaImage> {
        self.limits.check(character.width(), character.height())?;
        Ok(match removal {
            BackgroundRemoval::EdgeFlood { threshold } => {
                log::debug!("removing background by edge flood fill, threshold {threshold}");
                fill::remove_bright_background(character, *threshold)
            }
            BackgroundRemoval::ColorKey(key) => {
                log::debug!(
                    "removing background by color key {:?}, tolerance {}",
                    key.target().0,
                    key.tolerance()
                );
                key.remove(character)
            }
            BackgroundRemoval::Keep => character.clone(),
        })
    }

    /// Apply an externally painted mask image to `character`.
    ///
    /// The mask is resized to the character's size (nearest neighbour, so it
    /// stays binary) and converted to luminance; dark pixels (< 128) become
    /// transparent.
    ///
    /// # Errors
    ///
    /// Returns an error if the character is empty or exceeds the limits.
    pub fn apply_mask(&self, character: &RgbaImage, mask_image: &DynamicImage) -> Result<RgbaImage> {
        let (w, h) = character.dimensions();
        self.limits.check(w, h)?;
        let luma = mask_image.to_luma8();
        let luma = if luma.dimensions() == (w, h) {
            luma
        } else {
            imageops::resize(&luma, w, h, FilterType::Nearest)
        };
        Mask::from_luma(&luma).apply_to(character)
    }

    /// Insert `character` into `background`.
    ///
    /// The character is resized first, background removal runs on the resized
    /// raster, then it is clamped into place and alpha-composited. Neither
    /// input is modified.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid placement or images exceeding the limits.
    pub fn insert(
        &self,
        background: &RgbaImage,
        character: &RgbaImage,
        opts: &InsertOptions,
    ) -> Result<InsertResult> {
        self.limits.check(background.width(), background.height())?;
        self.limits.check(character.width(), character.height())?;

        let placement = &opts.placement;
        let (fw, fh) = placement.scaled_size(character.width(), character.height())?;
        self.limits.check(fw, fh)?;
        log::debug!(
            "character {}x{} scaled by {} to {fw}x{fh}",
            character.width(),
            character.height(),
            placement.scale
        );

        let resized = compositor::resize(character, fw, fh);
        let keyed = self.remove_background(&resized, &opts.removal)?;

        let (x, y) = placement.clamp_origin(background.width(), background.height(), fw, fh);
        log::info!(
            "compositing at ({x}, {y}), requested ({}, {})",
            placement.x,
            placement.y
        );

        Ok(InsertResult {
            image: compositor::composite(background, &keyed, x, y),
            placed: PlacedRect {
                x,
                y,
                width: fw,
                height: fh,
            },
        })
    }
}

/// Load an image file as RGBA.
///
/// # Errors
///
/// Returns [`Error::Image`] if the file cannot be read or decoded.
pub fn load_rgba(path: &Path) -> Result<RgbaImage> {
    Ok(image::open(path)?.to_rgba8())
}

/// Load detector output from a JSON file.
///
/// # Errors
///
/// Returns [`Error::Io`] or [`Error::Detections`] on read or parse failure.
pub fn load_detections(path: &Path) -> Result<DetectionSet> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Save an RGBA image, choosing the encoder from the extension.
///
/// PNG, WebP and BMP keep the alpha channel; JPEG is flattened to RGB.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &RgbaImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    match format {
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
            let file = std::fs::File::create(path)?;
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 100);
            encoder.encode_image(&rgb)?;
        }
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => {
            img.save_with_format(path, format)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}

/// Generate an output path next to `input`.
///
/// Example: `"photo.jpg"` with suffix `"mask"` becomes `"photo_mask.png"`.
/// Outputs are always PNG so transparency survives.
#[must_use]
pub fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_{suffix}.png"))
}
