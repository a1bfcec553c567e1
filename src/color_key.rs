//! Color-distance background removal.
//!
//! Every pixel is classified on its own: no connectivity, so disconnected
//! regions that merely share the keyed color are all removed.

use image::{Rgb, RgbaImage};

use crate::error::{Error, Result};
use crate::mask::Mask;

/// Largest possible Euclidean distance between two RGB colors (`sqrt(3) * 255`).
pub const MAX_COLOR_DISTANCE: f64 = 441.672_955_930_064;

/// Euclidean distance between two RGB triples.
#[must_use]
pub fn color_distance(a: [u8; 3], b: [u8; 3]) -> f64 {
    let dr = f64::from(a[0]) - f64::from(b[0]);
    let dg = f64::from(a[1]) - f64::from(b[1]);
    let db = f64::from(a[2]) - f64::from(b[2]);
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Tolerances are distances: finite and non-negative. Zero means exact match.
pub(crate) fn check_tolerance(tolerance: f64) -> Result<()> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(Error::malformed(format!(
            "tolerance must be a non-negative number, got {tolerance}"
        )));
    }
    Ok(())
}

/// Removes pixels whose color lies within `tolerance` of a target color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorKey {
    target: Rgb<u8>,
    tolerance: f64,
}

impl ColorKey {
    /// Create a color key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if `tolerance` is negative or not finite.
    pub fn new(target: Rgb<u8>, tolerance: f64) -> Result<Self> {
        check_tolerance(tolerance)?;
        Ok(Self { target, tolerance })
    }

    /// The keyed color.
    #[must_use]
    pub fn target(&self) -> Rgb<u8> {
        self.target
    }

    /// Maximum distance still counted as a match.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Whether an RGB triple matches the key.
    #[must_use]
    pub fn matches(&self, rgb: [u8; 3]) -> bool {
        color_distance(rgb, self.target.0) <= self.tolerance
    }

    /// Copy `image` with alpha 0 on every matching pixel; other pixels are untouched.
    #[must_use]
    pub fn remove(&self, image: &RgbaImage) -> RgbaImage {
        let mut out = image.clone();
        let clear = |px: &mut [u8]| {
            if self.matches([px[0], px[1], px[2]]) {
                px[3] = 0;
            }
        };

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            out.par_chunks_mut(4).for_each(clear);
        }

        #[cfg(not(feature = "parallel"))]
        {
            out.chunks_mut(4).for_each(clear);
        }

        out
    }

    /// Classify every pixel of `image` into a mask (matching pixels removed).
    #[must_use]
    pub fn classify(&self, image: &RgbaImage) -> Mask {
        let mut mask = Mask::new(image.width(), image.height());
        for (x, y, p) in image.enumerate_pixels() {
            if self.matches([p[0], p[1], p[2]]) {
                mask.set(x, y, true);
            }
        }
        mask
    }
}

/// Parse `#rrggbb` or `rrggbb` into an RGB color.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] if the string is not six hex digits.
pub fn parse_hex_color(s: &str) -> Result<Rgb<u8>> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::malformed(format!("invalid color {s:?}, expected #rrggbb")));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| Error::malformed(format!("invalid color {s:?}, expected #rrggbb")))
    };
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn distance_of_black_and_white_is_max() {
        let d = color_distance([0, 0, 0], [255, 255, 255]);
        assert!((d - MAX_COLOR_DISTANCE).abs() < 1e-9);
        assert!(color_distance([12, 34, 56], [12, 34, 56]).abs() < f64::EPSILON);
    }

    #[test]
    fn negative_or_nan_tolerance_is_rejected() {
        assert!(ColorKey::new(Rgb([0, 0, 0]), -1.0).is_err());
        assert!(ColorKey::new(Rgb([0, 0, 0]), f64::NAN).is_err());
        assert!(ColorKey::new(Rgb([0, 0, 0]), 0.0).is_ok());
    }

    #[test]
    fn tolerance_boundary_is_inclusive() {
        // distance([0,0,0], [3,4,0]) == 5
        let key = ColorKey::new(Rgb([0, 0, 0]), 5.0).unwrap();
        assert!(key.matches([3, 4, 0]));
        assert!(!key.matches([3, 4, 1]));
    }

    #[test]
    fn remove_preserves_non_matching_pixels_exactly() {
        let mut img = RgbaImage::from_pixel(4, 1, Rgba([0, 200, 0, 255]));
        img.put_pixel(1, 0, Rgba([90, 90, 90, 77]));
        let key = ColorKey::new(Rgb([0, 200, 0]), 30.0).unwrap();

        let out = key.remove(&img);
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 200, 0, 0]));
        assert_eq!(out.get_pixel(1, 0), &Rgba([90, 90, 90, 77]));
        assert_eq!(img.get_pixel(0, 0)[3], 255, "input must not be mutated");
    }

    #[test]
    fn classify_agrees_with_remove() {
        let img = RgbaImage::from_fn(6, 6, |x, y| Rgba([(x * 40) as u8, (y * 40) as u8, 0, 255]));
        let key = ColorKey::new(Rgb([80, 80, 0]), 60.0).unwrap();
        assert_eq!(key.classify(&img), Mask::from_alpha(&key.remove(&img)));
    }

    #[test]
    fn parse_hex_color_accepts_hash_prefix() {
        assert_eq!(parse_hex_color("#ff8000").unwrap(), Rgb([255, 128, 0]));
        assert_eq!(parse_hex_color("00FF00").unwrap(), Rgb([0, 255, 0]));
        assert!(parse_hex_color("#fff").is_err());
        assert!(parse_hex_color("zzzzzz").is_err());
    }
}
