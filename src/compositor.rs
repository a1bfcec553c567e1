//! Foreground placement and source-over compositing.
//!
//! Placement math: a foreground of native size `(w, h)` at `scale` is resized
//! to `(round(w * scale), round(h * scale))`, then its top-left corner is
//! clamped to `[0, bg - fg]` on each axis. When the foreground is larger than
//! the background the lower bound wins: the corner sits at 0 and the overflow
//! past the right/bottom edge is cropped during blending.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::engine::Limits;
use crate::error::{Error, Result};

/// Longest side of the character preview in the editor, in display pixels.
pub const PREVIEW_MAX_SIZE: f64 = 150.0;

/// Requested position and size of a foreground within a background.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Requested left edge, in background pixels.
    pub x: i32,
    /// Requested top edge, in background pixels.
    pub y: i32,
    /// Scale applied to the foreground's native size.
    pub scale: f64,
}

/// Where a foreground actually landed after scaling and clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Scaled foreground width (may extend past the background).
    pub width: u32,
    /// Scaled foreground height (may extend past the background).
    pub height: u32,
}

impl Placement {
    /// Create a placement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] unless `scale` is finite and positive.
    pub fn new(x: i32, y: i32, scale: f64) -> Result<Self> {
        let placement = Self { x, y, scale };
        placement.validate()?;
        Ok(placement)
    }

    fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(Error::malformed(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        Ok(())
    }

    /// Convert the editor's preview state into image space.
    ///
    /// The editor shows the character with its longest side capped at
    /// [`PREVIEW_MAX_SIZE`] display pixels, multiplied by `user_scale`, on a
    /// background drawn at `display_scale` (displayed width / native width).
    /// `(preview_x, preview_y)` is the preview's top-left in display pixels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if any scale or the character size is
    /// not positive, or the resulting scale is not finite.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_preview(
        preview_x: f64,
        preview_y: f64,
        user_scale: f64,
        display_scale: f64,
        native_width: u32,
        native_height: u32,
    ) -> Result<Self> {
        if !(display_scale.is_finite() && display_scale > 0.0) {
            return Err(Error::malformed(format!(
                "display scale must be positive, got {display_scale}"
            )));
        }
        if native_width == 0 || native_height == 0 {
            return Err(Error::malformed("character image is empty"));
        }

        let aspect = f64::from(native_width) / f64::from(native_height);
        let preview_width = if aspect > 1.0 {
            PREVIEW_MAX_SIZE
        } else {
            PREVIEW_MAX_SIZE * aspect
        };
        let actual_width = preview_width * user_scale / display_scale;
        let scale = actual_width / f64::from(native_width);

        let x = (preview_x / display_scale).round();
        let y = (preview_y / display_scale).round();
        Self::new(
            x.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32,
            y.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32,
            scale,
        )
    }

    /// Scaled foreground size: `(round(w * scale), round(h * scale))`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the scale is invalid or either
    /// scaled dimension rounds to zero or overflows `u32`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn scaled_size(&self, width: u32, height: u32) -> Result<(u32, u32)> {
        self.validate()?;
        let sw = (f64::from(width) * self.scale).round();
        let sh = (f64::from(height) * self.scale).round();
        if sw < 1.0 || sh < 1.0 {
            return Err(Error::malformed(format!(
                "foreground {width}x{height} at scale {} is empty",
                self.scale
            )));
        }
        if sw > f64::from(u32::MAX) || sh > f64::from(u32::MAX) {
            return Err(Error::malformed(format!(
                "foreground {width}x{height} at scale {} is too large",
                self.scale
            )));
        }
        Ok((sw as u32, sh as u32))
    }

    /// Clamp the requested corner for a `fg_w x fg_h` foreground on a `bg_w x bg_h` background.
    #[must_use]
    pub fn clamp_origin(&self, bg_w: u32, bg_h: u32, fg_w: u32, fg_h: u32) -> (u32, u32) {
        (
            clamp_axis(self.x, bg_w, fg_w),
            clamp_axis(self.y, bg_h, fg_h),
        )
    }
}

/// `max(0, min(v, bg - fg))`: the floor takes priority over the ceiling.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_axis(v: i32, bg: u32, fg: u32) -> u32 {
    let ceiling = i64::from(bg) - i64::from(fg);
    i64::from(v).min(ceiling).max(0) as u32
}

/// Resize `image` to `width x height` with Lanczos3; same-size requests are a copy.
#[must_use]
pub fn resize(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Lanczos3)
}

/// Source-over blend of one foreground pixel onto one background pixel.
///
/// Straight (non-premultiplied) alpha. With `w = bg_a * (255 - a)` each
/// channel is `(fg * a * 255 + bg * w) / (a * 255 + w)`, rounded, and the
/// output alpha is `a + (w + 127) / 255`. Over an opaque background this is
/// `(fg * a + bg * (255 - a) + 127) / 255`. Alpha 255 returns the foreground
/// exactly and alpha 0 returns the background exactly.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn blend_over(fg: Rgba<u8>, bg: Rgba<u8>) -> Rgba<u8> {
    let a = u32::from(fg[3]);
    match a {
        0 => bg,
        255 => fg,
        _ => {
            let w = u32::from(bg[3]) * (255 - a);
            // a > 0 here, so the weight sum is never zero.
            let den = a * 255 + w;
            let mix = |f: u8, b: u8| {
                ((u32::from(f) * a * 255 + u32::from(b) * w + den / 2) / den) as u8
            };
            let out_a = a + (w + 127) / 255;
            Rgba([
                mix(fg[0], bg[0]),
                mix(fg[1], bg[1]),
                mix(fg[2], bg[2]),
                out_a.min(255) as u8,
            ])
        }
    }
}

/// Composite an already-sized foreground onto a copy of `background` at `(x, y)`.
///
/// Foreground pixels past the background edge are cropped; background pixels
/// outside the placed rectangle are copied unchanged.
#[must_use]
pub fn composite(background: &RgbaImage, foreground: &RgbaImage, x: u32, y: u32) -> RgbaImage {
    let mut out = background.clone();
    let (bg_w, bg_h) = background.dimensions();
    let visible_w = foreground.width().min(bg_w.saturating_sub(x));
    let visible_h = foreground.height().min(bg_h.saturating_sub(y));

    for dy in 0..visible_h {
        for dx in 0..visible_w {
            let fg = *foreground.get_pixel(dx, dy);
            let dst = out.get_pixel_mut(x + dx, y + dy);
            *dst = blend_over(fg, *dst);
        }
    }

    out
}

/// Resize `foreground` by `placement.scale`, clamp it into `background` and composite.
///
/// Use this for foregrounds whose alpha already encodes transparency. When
/// transparency is computed from the resized raster, resize with
/// [`Placement::scaled_size`] and [`resize`] first and call [`composite`].
///
/// Both inputs and the scaled foreground are checked against `limits`
/// before anything is allocated.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] for an invalid scale or an empty scaled
/// foreground, and [`Error::ImageTooLarge`] when an input or the scaled
/// foreground exceeds `limits`.
pub fn place(
    background: &RgbaImage,
    foreground: &RgbaImage,
    placement: &Placement,
    limits: &Limits,
) -> Result<(RgbaImage, PlacedRect)> {
    limits.check(background.width(), background.height())?;
    limits.check(foreground.width(), foreground.height())?;
    let (fw, fh) = placement.scaled_size(foreground.width(), foreground.height())?;
    limits.check(fw, fh)?;

    let scaled = resize(foreground, fw, fh);
    let (x, y) = placement.clamp_origin(background.width(), background.height(), fw, fh);
    let rect = PlacedRect {
        x,
        y,
        width: fw,
        height: fh,
    };
    Ok((composite(background, &scaled, x, y), rect))
}
