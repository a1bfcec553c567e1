//! Interactive mask editing.
//!
//! An [`EditSession`] owns a character image and the mask being painted over
//! it. Magic-wand clicks and brush strokes accumulate in the mask until the
//! caller either [`reset`](EditSession::reset)s it or
//! [`apply`](EditSession::apply)s it, which consumes the session and hands the
//! masked character downstream. Edits take `&mut self`, so a session cannot be
//! edited from two places at once.

use image::RgbaImage;

use crate::brush::{Brush, BrushStroke};
use crate::engine::Limits;
use crate::error::Result;
use crate::fill;
use crate::mask::Mask;

/// An in-progress mask over a character image.
#[derive(Debug)]
pub struct EditSession {
    image: RgbaImage,
    mask: Mask,
    stroke: Option<BrushStroke>,
}

impl EditSession {
    /// Start editing `image` with every pixel kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageTooLarge`](crate::Error::ImageTooLarge) if the image exceeds `limits`.
    pub fn begin(image: RgbaImage, limits: &Limits) -> Result<Self> {
        limits.check(image.width(), image.height())?;
        let mask = Mask::new(image.width(), image.height());
        log::debug!("edit session started on {}x{}", image.width(), image.height());
        Ok(Self {
            image,
            mask,
            stroke: None,
        })
    }

    /// The source image (never modified by edits).
    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// The current mask.
    #[must_use]
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    /// Remove the connected region around `(x, y)` whose colors are within
    /// `tolerance` of the clicked pixel.
    ///
    /// Colors are read from the source image, so earlier removals do not
    /// affect which pixels match. Returns the number of newly removed pixels;
    /// a click outside the image removes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`](crate::Error::MalformedInput) if `tolerance` is negative or not finite.
    pub fn magic_wand(&mut self, x: u32, y: u32, tolerance: f64) -> Result<usize> {
        let mut added = 0;
        for (px, py) in fill::magic_wand(&self.image, x, y, tolerance)? {
            if !self.mask.is_removed(px, py) {
                self.mask.set(px, py, true);
                added += 1;
            }
        }
        log::debug!("magic wand at ({x}, {y}) tolerance {tolerance} removed {added} pixels");
        Ok(added)
    }

    /// Press the brush down at `point` (image pixels).
    ///
    /// Any unfinished stroke is ended first.
    pub fn begin_stroke(&mut self, point: (f64, f64), brush: Brush) {
        self.stroke = Some(BrushStroke::begin(brush, &mut self.mask, point));
    }

    /// Drag the brush to `point`. Ignored when no stroke is in progress.
    pub fn continue_stroke(&mut self, point: (f64, f64)) {
        if let Some(stroke) = self.stroke.as_mut() {
            stroke.extend(&mut self.mask, point);
        }
    }

    /// Release the brush.
    pub fn end_stroke(&mut self) {
        if let Some(stroke) = self.stroke.take() {
            stroke.end();
        }
    }

    /// Whether a brush stroke is in progress.
    #[must_use]
    pub fn is_stroking(&self) -> bool {
        self.stroke.is_some()
    }

    /// Discard every edit: all pixels kept again.
    pub fn reset(&mut self) {
        self.stroke = None;
        self.mask.clear();
    }

    /// Red overlay of the removed pixels, for display over the image.
    #[must_use]
    pub fn preview(&self) -> RgbaImage {
        self.mask.overlay_preview()
    }

    /// Commit the edits: the character with removed pixels made transparent,
    /// and the mask that produced it.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the mask always matches the image size.
    pub fn apply(self) -> Result<(RgbaImage, Mask)> {
        let masked = self.mask.apply_to(&self.image)?;
        log::debug!(
            "edit session applied, {} pixels removed",
            self.mask.removed_count()
        );
        Ok((masked, self.mask))
    }
}
