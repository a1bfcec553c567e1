//! Binary per-pixel masks.
//!
//! A [`Mask`] stores one boolean per pixel: `true` means the pixel is
//! *removed* (repainted by the inpainter, or made transparent on a character),
//! `false` means it is kept. The two external encodings used by consumers are
//! produced by conversion functions rather than stored:
//!
//! - **Inpaint encoding** ([`Mask::to_inpaint_image`]): opaque black
//!   everywhere, opaque white over the regions to repaint.
//! - **Keep encoding** ([`Mask::to_keep_image`]): RGB 255 where the pixel is
//!   kept and RGB 0 where it is removed, alpha always 255.

use image::{GrayImage, Rgba, RgbaImage};

use crate::boxes::BoundingBox;
use crate::error::{Error, Result};

/// Padding added on every side of a box when rasterizing detection masks.
pub const BOX_PADDING: f64 = 10.0;

/// Luminance below which an external grayscale mask marks a pixel as removed.
pub const LUMA_REMOVE_BELOW: u8 = 128;

/// Color painted over removed pixels by [`Mask::overlay_preview`].
const PREVIEW_COLOR: Rgba<u8> = Rgba([255, 0, 0, 150]);

/// A binary keep/remove classification for every pixel of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    removed: Vec<bool>,
}

impl Mask {
    /// Create a mask that keeps every pixel.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            removed: vec![false; width as usize * height as usize],
        }
    }

    /// Mask width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Mask height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)` of the mask.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Whether the pixel at `(x, y)` is removed. Out-of-bounds reads as kept.
    #[must_use]
    pub fn is_removed(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.removed[self.index(x, y)]
    }

    /// Mark a pixel removed (`true`) or kept (`false`). Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: u32, y: u32, removed: bool) {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.removed[idx] = removed;
        }
    }

    /// Mark every pixel kept.
    pub fn clear(&mut self) {
        self.removed.fill(false);
    }

    /// Number of removed pixels.
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.removed.iter().filter(|&&r| r).count()
    }

    /// Whether no pixel is removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.removed.contains(&true)
    }

    /// Merge `other` into `self` (union of removed pixels).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the dimensions differ.
    pub fn union_with(&mut self, other: &Mask) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(Error::malformed(format!(
                "mask size {}x{} does not match {}x{}",
                other.width, other.height, self.width, self.height
            )));
        }
        for (dst, &src) in self.removed.iter_mut().zip(&other.removed) {
            *dst |= src;
        }
        Ok(())
    }

    /// Rasterize detection boxes into a mask.
    ///
    /// Each box is padded by [`BOX_PADDING`] and reclamped to the canvas:
    /// `x = max(0, xmin - 10)`, `w = min(width - x, (xmax - xmin) + 20)`, and
    /// likewise vertically. A pixel is removed when its cell intersects any
    /// padded rectangle, so overlapping boxes union and the result does not
    /// depend on box order.
    #[must_use]
    pub fn from_boxes(width: u32, height: u32, boxes: &[BoundingBox]) -> Self {
        let mut mask = Self::new(width, height);
        let canvas_w = f64::from(width);
        let canvas_h = f64::from(height);

        for b in boxes {
            let x = (b.xmin - BOX_PADDING).max(0.0);
            let y = (b.ymin - BOX_PADDING).max(0.0);
            let w = (canvas_w - x).min(b.width() + BOX_PADDING * 2.0);
            let h = (canvas_h - y).min(b.height() + BOX_PADDING * 2.0);
            if !(w > 0.0 && h > 0.0) {
                continue;
            }

            let x0 = clamp_to_axis(x.floor(), width);
            let y0 = clamp_to_axis(y.floor(), height);
            let x1 = clamp_to_axis((x + w).ceil(), width);
            let y1 = clamp_to_axis((y + h).ceil(), height);

            for py in y0..y1 {
                let row = py as usize * width as usize;
                mask.removed[row + x0 as usize..row + x1 as usize].fill(true);
            }
        }

        mask
    }

    /// Build a mask from an external grayscale image: luminance below 128 is removed.
    #[must_use]
    pub fn from_luma(image: &GrayImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            removed: image
                .pixels()
                .map(|p| p[0] < LUMA_REMOVE_BELOW)
                .collect(),
        }
    }

    /// Build a mask from an RGBA image's alpha channel: alpha 0 is removed.
    #[must_use]
    pub fn from_alpha(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            removed: image.pixels().map(|p| p[3] == 0).collect(),
        }
    }

    /// Inpaint encoding: black background, white where removed.
    #[must_use]
    pub fn to_inpaint_image(&self) -> RgbaImage {
        self.render(Rgba([255, 255, 255, 255]), Rgba([0, 0, 0, 255]))
    }

    /// Keep encoding: black where removed, white where kept, fully opaque.
    #[must_use]
    pub fn to_keep_image(&self) -> RgbaImage {
        self.render(Rgba([0, 0, 0, 255]), Rgba([255, 255, 255, 255]))
    }

    /// Translucent red over removed pixels, transparent elsewhere.
    #[must_use]
    pub fn overlay_preview(&self) -> RgbaImage {
        self.render(PREVIEW_COLOR, Rgba([0, 0, 0, 0]))
    }

    fn render(&self, removed: Rgba<u8>, kept: Rgba<u8>) -> RgbaImage {
        let mut out = RgbaImage::new(self.width, self.height);
        for (px, &r) in out.pixels_mut().zip(&self.removed) {
            *px = if r { removed } else { kept };
        }
        out
    }

    /// Copy `image` with alpha set to 0 wherever the mask is removed.
    ///
    /// RGB is preserved everywhere and kept pixels retain their original alpha.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the image and mask sizes differ.
    pub fn apply_to(&self, image: &RgbaImage) -> Result<RgbaImage> {
        if image.dimensions() != self.dimensions() {
            return Err(Error::malformed(format!(
                "mask size {}x{} does not match image size {}x{}",
                self.width,
                self.height,
                image.width(),
                image.height()
            )));
        }
        let mut out = image.clone();
        for (px, &r) in out.pixels_mut().zip(&self.removed) {
            if r {
                px[3] = 0;
            }
        }
        Ok(out)
    }
}

/// Convert a floored/ceiled coordinate to a pixel index clamped to `[0, limit]`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_to_axis(v: f64, limit: u32) -> u32 {
    v.clamp(0.0, f64::from(limit)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> BoundingBox {
        BoundingBox {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    #[test]
    fn new_mask_keeps_everything() {
        let mask = Mask::new(8, 4);
        assert!(mask.is_empty());
        assert_eq!(mask.removed_count(), 0);
        assert_eq!(mask.dimensions(), (8, 4));
    }

    #[test]
    fn out_of_bounds_access_is_ignored() {
        let mut mask = Mask::new(4, 4);
        mask.set(10, 10, true);
        assert!(mask.is_empty());
        assert!(!mask.is_removed(10, 10));
    }

    #[test]
    fn box_is_padded_by_ten_pixels() {
        let mask = Mask::from_boxes(100, 100, &[bbox(40.0, 40.0, 50.0, 50.0)]);
        // x = 30, w = 30 -> columns 30..60
        assert!(mask.is_removed(30, 30));
        assert!(mask.is_removed(59, 59));
        assert!(!mask.is_removed(29, 45));
        assert!(!mask.is_removed(60, 45));
        assert_eq!(mask.removed_count(), 30 * 30);
    }

    #[test]
    fn box_near_origin_keeps_width_formula() {
        // x clamps to 0 but the width stays (xmax - xmin) + 20.
        let mask = Mask::from_boxes(100, 100, &[bbox(5.0, 50.0, 15.0, 60.0)]);
        assert!(mask.is_removed(0, 50));
        assert!(mask.is_removed(29, 50));
        assert!(!mask.is_removed(30, 50));
    }

    #[test]
    fn box_at_far_edge_is_clamped_to_canvas() {
        let mask = Mask::from_boxes(50, 50, &[bbox(45.0, 45.0, 50.0, 50.0)]);
        assert!(mask.is_removed(49, 49));
        assert!(mask.is_removed(35, 35));
        assert!(!mask.is_removed(34, 35));
    }

    #[test]
    fn overlapping_boxes_union() {
        let a = bbox(10.0, 10.0, 30.0, 30.0);
        let b = bbox(20.0, 20.0, 40.0, 40.0);
        let both = Mask::from_boxes(64, 64, &[a, b]);
        let mut merged = Mask::from_boxes(64, 64, &[a]);
        merged.union_with(&Mask::from_boxes(64, 64, &[b])).unwrap();
        assert_eq!(both, merged);
    }

    #[test]
    fn union_rejects_mismatched_sizes() {
        let mut a = Mask::new(4, 4);
        assert!(matches!(
            a.union_with(&Mask::new(5, 4)),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn encodings_are_inverse_colors() {
        let mut mask = Mask::new(2, 1);
        mask.set(0, 0, true);

        let inpaint = mask.to_inpaint_image();
        assert_eq!(inpaint.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(inpaint.get_pixel(1, 0), &Rgba([0, 0, 0, 255]));

        let keep = mask.to_keep_image();
        assert_eq!(keep.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(keep.get_pixel(1, 0), &Rgba([255, 255, 255, 255]));

        let preview = mask.overlay_preview();
        assert_eq!(preview.get_pixel(0, 0), &PREVIEW_COLOR);
        assert_eq!(preview.get_pixel(1, 0)[3], 0);
    }

    #[test]
    fn keep_image_reads_back_through_luma() {
        let mut mask = Mask::new(3, 3);
        mask.set(1, 1, true);
        mask.set(2, 0, true);
        let gray = image::DynamicImage::ImageRgba8(mask.to_keep_image()).to_luma8();
        assert_eq!(Mask::from_luma(&gray), mask);
    }

    #[test]
    fn apply_to_zeroes_alpha_and_preserves_rgb() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 200]));
        let mut mask = Mask::new(2, 2);
        mask.set(1, 0, true);

        let out = mask.apply_to(&image).unwrap();
        assert_eq!(out.get_pixel(1, 0), &Rgba([10, 20, 30, 0]));
        assert_eq!(out.get_pixel(0, 0), &Rgba([10, 20, 30, 200]));
        assert_eq!(Mask::from_alpha(&out), mask);
    }

    #[test]
    fn apply_to_rejects_size_mismatch() {
        let image = RgbaImage::new(3, 3);
        assert!(Mask::new(2, 2).apply_to(&image).is_err());
    }
}
