//! 4-connected flood fill over RGBA rasters.
//!
//! [`FloodFill`] is a breadth-first traversal driven as an iterator: each call
//! to `next` yields one matched pixel, so a caller can stop a fill on a huge
//! image between steps and keep what it has. A pixel is marked visited before
//! it is enqueued, which bounds the queue to one entry per pixel.

use std::collections::VecDeque;

use image::{Rgba, RgbaImage};

use crate::color_key::{check_tolerance, color_distance};
use crate::error::Result;

/// Breadth-first flood fill yielding the coordinates of every pixel reachable
/// from the seeds through 4-connected neighbours that satisfy `predicate`.
pub struct FloodFill<'a, P> {
    image: &'a RgbaImage,
    predicate: P,
    visited: Vec<bool>,
    queue: VecDeque<(u32, u32)>,
}

impl<'a, P> FloodFill<'a, P>
where
    P: Fn(&Rgba<u8>) -> bool,
{
    /// Create an unseeded fill. Add seeds with [`FloodFill::seed`].
    pub fn new(image: &'a RgbaImage, predicate: P) -> Self {
        let len = image.width() as usize * image.height() as usize;
        Self {
            image,
            predicate,
            visited: vec![false; len],
            queue: VecDeque::new(),
        }
    }

    /// Create a fill seeded from every border pixel of `image`.
    pub fn edge_seeded(image: &'a RgbaImage, predicate: P) -> Self {
        let (w, h) = image.dimensions();
        let mut fill = Self::new(image, predicate);
        if w == 0 || h == 0 {
            return fill;
        }
        for x in 0..w {
            fill.seed(x, 0);
            fill.seed(x, h - 1);
        }
        for y in 0..h {
            fill.seed(0, y);
            fill.seed(w - 1, y);
        }
        fill
    }

    /// Add a seed. Out-of-bounds, already visited or non-matching seeds are skipped.
    ///
    /// Returns whether the seed was enqueued.
    pub fn seed(&mut self, x: u32, y: u32) -> bool {
        self.try_visit(x, y)
    }

    fn try_visit(&mut self, x: u32, y: u32) -> bool {
        let (w, h) = self.image.dimensions();
        if x >= w || y >= h {
            return false;
        }
        let idx = y as usize * w as usize + x as usize;
        if self.visited[idx] {
            return false;
        }
        self.visited[idx] = true;
        if !(self.predicate)(self.image.get_pixel(x, y)) {
            return false;
        }
        self.queue.push_back((x, y));
        true
    }

    /// Number of pixels waiting to be expanded.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl<P> Iterator for FloodFill<'_, P>
where
    P: Fn(&Rgba<u8>) -> bool,
{
    type Item = (u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let (x, y) = self.queue.pop_front()?;
        if let Some(left) = x.checked_sub(1) {
            self.try_visit(left, y);
        }
        self.try_visit(x + 1, y);
        if let Some(up) = y.checked_sub(1) {
            self.try_visit(x, up);
        }
        self.try_visit(x, y + 1);
        Some((x, y))
    }
}

/// Predicate: every RGB channel is at least `threshold` (near-white test).
pub fn is_bright(threshold: u8) -> impl Fn(&Rgba<u8>) -> bool {
    move |p: &Rgba<u8>| p[0] >= threshold && p[1] >= threshold && p[2] >= threshold
}

/// Make every border-connected bright pixel transparent.
///
/// Bright pixels enclosed by darker content (a white button on a shirt) are
/// kept; only those reachable from the image border through bright pixels
/// lose their alpha. RGB is never modified.
#[must_use]
pub fn remove_bright_background(image: &RgbaImage, threshold: u8) -> RgbaImage {
    let positions: Vec<(u32, u32)> = FloodFill::edge_seeded(image, is_bright(threshold)).collect();
    log::debug!(
        "edge flood fill removed {} pixels at threshold {threshold}",
        positions.len()
    );
    let mut out = image.clone();
    for (x, y) in positions {
        out.get_pixel_mut(x, y)[3] = 0;
    }
    out
}

/// Magic wand: the 4-connected component around `(x, y)` whose colors lie
/// within `tolerance` (Euclidean RGB distance) of the clicked pixel.
///
/// An out-of-bounds click yields nothing.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`](crate::Error::MalformedInput) if
/// `tolerance` is negative or not finite.
pub fn magic_wand(
    image: &RgbaImage,
    x: u32,
    y: u32,
    tolerance: f64,
) -> Result<FloodFill<'_, impl Fn(&Rgba<u8>) -> bool>> {
    check_tolerance(tolerance)?;
    let reference = if x < image.width() && y < image.height() {
        let p = image.get_pixel(x, y);
        Some([p[0], p[1], p[2]])
    } else {
        None
    };
    let predicate = move |p: &Rgba<u8>| {
        reference.is_some_and(|r| color_distance([p[0], p[1], p[2]], r) <= tolerance)
    };
    let mut fill = FloodFill::new(image, predicate);
    fill.seed(x, y);
    Ok(fill)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn checkerboard(size: u32) -> RgbaImage {
        RgbaImage::from_fn(size, size, |x, y| if (x + y) % 2 == 0 { WHITE } else { BLACK })
    }

    #[test]
    fn all_white_image_is_fully_removed() {
        let img = RgbaImage::from_pixel(100, 100, WHITE);
        let out = remove_bright_background(&img, 240);
        assert!(out.pixels().all(|p| p[3] == 0));
        assert!(out.pixels().all(|p| p[0] == 255 && p[1] == 255 && p[2] == 255));
    }

    #[test]
    fn interior_black_block_is_preserved() {
        let mut img = RgbaImage::from_pixel(100, 100, WHITE);
        for y in 45..55 {
            for x in 45..55 {
                img.put_pixel(x, y, BLACK);
            }
        }
        let out = remove_bright_background(&img, 240);
        let opaque = out.pixels().filter(|p| p[3] == 255).count();
        let cleared = out.pixels().filter(|p| p[3] == 0).count();
        assert_eq!(opaque, 100);
        assert_eq!(cleared, 9_900);
        assert_eq!(out.get_pixel(50, 50)[3], 255);
    }

    #[test]
    fn enclosed_white_region_is_not_removed() {
        // White frame, black ring, white island in the middle.
        let img = RgbaImage::from_fn(20, 20, |x, y| {
            let ring = (4..16).contains(&x) && (4..16).contains(&y);
            let island = (7..13).contains(&x) && (7..13).contains(&y);
            if island || !ring {
                WHITE
            } else {
                BLACK
            }
        });
        let out = remove_bright_background(&img, 240);
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(out.get_pixel(10, 10)[3], 255);
        assert_eq!(out.get_pixel(5, 5)[3], 255);
    }

    #[test]
    fn threshold_requires_every_channel() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([255, 255, 200, 255]));
        let out = remove_bright_background(&img, 240);
        assert!(out.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn magic_wand_on_checkerboard_selects_only_clicked_cell() {
        let img = checkerboard(8);
        let selected: Vec<_> = magic_wand(&img, 3, 3, 0.0).unwrap().collect();
        // Same-colored cells touch only diagonally.
        assert_eq!(selected, vec![(3, 3)]);
    }

    #[test]
    fn magic_wand_large_tolerance_spans_both_colors() {
        let img = checkerboard(8);
        assert_eq!(magic_wand(&img, 0, 0, 500.0).unwrap().count(), 64);
    }

    #[test]
    fn magic_wand_out_of_bounds_yields_nothing() {
        let img = checkerboard(4);
        assert_eq!(magic_wand(&img, 4, 0, 10.0).unwrap().count(), 0);
        assert_eq!(magic_wand(&img, 0, 99, 10.0).unwrap().count(), 0);
    }

    #[test]
    fn magic_wand_rejects_invalid_tolerance() {
        let img = checkerboard(4);
        assert!(magic_wand(&img, 0, 0, -1.0).is_err());
        assert!(magic_wand(&img, 0, 0, f64::NAN).is_err());
        assert!(magic_wand(&img, 0, 0, f64::INFINITY).is_err());
        assert!(magic_wand(&img, 0, 0, 0.0).is_ok());
    }

    #[test]
    fn each_pixel_is_yielded_once() {
        let img = RgbaImage::from_pixel(30, 30, WHITE);
        let mut seen: Vec<_> = FloodFill::edge_seeded(&img, is_bright(0)).collect();
        let total = seen.len();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(total, 900);
        assert_eq!(seen.len(), 900);
    }

    #[test]
    fn queue_is_bounded_by_pixel_count() {
        let img = RgbaImage::from_pixel(64, 64, WHITE);
        let mut fill = FloodFill::new(&img, is_bright(0));
        fill.seed(32, 32);
        let mut max_pending = 0;
        while fill.next().is_some() {
            max_pending = max_pending.max(fill.pending());
        }
        assert!(max_pending <= 64 * 64);
    }

    #[test]
    fn fill_can_be_stopped_early() {
        let img = RgbaImage::from_pixel(50, 50, WHITE);
        let first: Vec<_> = magic_wand(&img, 0, 0, 0.0).unwrap().take(10).collect();
        assert_eq!(first.len(), 10);
        assert_eq!(first[0], (0, 0));
    }

    #[test]
    fn empty_image_fill_is_empty() {
        let img = RgbaImage::new(0, 0);
        assert_eq!(FloodFill::edge_seeded(&img, is_bright(0)).count(), 0);
    }
}
