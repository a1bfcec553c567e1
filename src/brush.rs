//! Circular brush strokes into a [`Mask`].

use crate::error::{Error, Result};
use crate::mask::Mask;

/// What a brush writes into the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushMode {
    /// Mark pixels removed.
    Erase,
    /// Mark pixels kept.
    Restore,
}

/// A round brush of fixed radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    radius: f64,
    mode: BrushMode,
}

impl Brush {
    /// Create a brush.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] unless `radius` is finite and positive.
    pub fn new(radius: f64, mode: BrushMode) -> Result<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(Error::malformed(format!(
                "brush radius must be positive, got {radius}"
            )));
        }
        Ok(Self { radius, mode })
    }

    /// Brush radius in image pixels.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Erase or restore.
    #[must_use]
    pub fn mode(&self) -> BrushMode {
        self.mode
    }

    /// Paint a filled circle centred on `(cx, cy)`.
    ///
    /// Pixels within `radius` of the centre are written; the circle is
    /// clipped to the mask. A non-finite centre writes nothing.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn stamp(&self, mask: &mut Mask, cx: f64, cy: f64) {
        if !(cx.is_finite() && cy.is_finite()) {
            return;
        }
        let removed = self.mode == BrushMode::Erase;
        let r = self.radius;
        let x0 = (cx - r).ceil().max(0.0);
        let y0 = (cy - r).ceil().max(0.0);
        let x1 = (cx + r).floor().min(f64::from(mask.width()) - 1.0);
        let y1 = (cy + r).floor().min(f64::from(mask.height()) - 1.0);
        if x0 > x1 || y0 > y1 {
            return;
        }

        let r2 = r * r;
        for py in (y0 as u32)..=(y1 as u32) {
            let dy = f64::from(py) - cy;
            for px in (x0 as u32)..=(x1 as u32) {
                let dx = f64::from(px) - cx;
                if dx * dx + dy * dy <= r2 {
                    mask.set(px, py, removed);
                }
            }
        }
    }
}

fn is_finite_point((x, y): (f64, f64)) -> bool {
    x.is_finite() && y.is_finite()
}

/// Number of interpolation steps between two samples `distance` apart.
///
/// Spacing is half the radius, so consecutive circles always overlap.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn interpolation_steps(distance: f64, radius: f64) -> u32 {
    ((distance / (radius / 2.0)).ceil() as u32).max(1)
}

/// One drag gesture: stamps every sample and fills the gaps between them.
#[derive(Debug, Clone)]
pub struct BrushStroke {
    brush: Brush,
    last: Option<(f64, f64)>,
}

impl BrushStroke {
    /// Start a stroke at `point`, stamping it.
    pub fn begin(brush: Brush, mask: &mut Mask, point: (f64, f64)) -> Self {
        brush.stamp(mask, point.0, point.1);
        Self {
            brush,
            last: is_finite_point(point).then_some(point),
        }
    }

    /// The brush this stroke paints with.
    #[must_use]
    pub fn brush(&self) -> Brush {
        self.brush
    }

    /// Continue the stroke to `point`.
    ///
    /// Stamps `point`, then stamps evenly spaced circles along the segment from
    /// the previous sample, rounded to the nearest pixel. Only the part of the
    /// segment within `radius` of the mask is walked, so far-off samples cost
    /// no more than on-canvas ones. Non-finite samples are ignored.
    pub fn extend(&mut self, mask: &mut Mask, point: (f64, f64)) {
        if !is_finite_point(point) {
            return;
        }
        let (x, y) = point;
        self.brush.stamp(mask, x, y);

        if let Some(last) = self.last {
            if let Some(((ax, ay), (bx, by))) = self.visible_segment(mask, last, point) {
                let dx = bx - ax;
                let dy = by - ay;
                let steps = interpolation_steps(dx.hypot(dy), self.brush.radius);
                for i in 0..=steps {
                    let t = f64::from(i) / f64::from(steps);
                    self.brush
                        .stamp(mask, (ax + dx * t).round(), (ay + dy * t).round());
                }
            }
        }

        self.last = Some(point);
    }

    /// Clip `from -> to` to the mask grown by the brush radius (Liang-Barsky).
    fn visible_segment(
        &self,
        mask: &Mask,
        from: (f64, f64),
        to: (f64, f64),
    ) -> Option<((f64, f64), (f64, f64))> {
        let r = self.brush.radius;
        let (xmin, ymin) = (-r, -r);
        let xmax = f64::from(mask.width()) - 1.0 + r;
        let ymax = f64::from(mask.height()) - 1.0 + r;
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);

        let mut t0 = 0.0_f64;
        let mut t1 = 1.0_f64;
        for (p, q) in [
            (-dx, from.0 - xmin),
            (dx, xmax - from.0),
            (-dy, from.1 - ymin),
            (dy, ymax - from.1),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
            } else {
                let t = q / p;
                if p < 0.0 {
                    t0 = t0.max(t);
                } else {
                    t1 = t1.min(t);
                }
            }
        }
        if t0 > t1 {
            return None;
        }
        Some((
            (from.0 + dx * t0, from.1 + dy * t0),
            (from.0 + dx * t1, from.1 + dy * t1),
        ))
    }

    /// Finish the stroke (pointer released).
    pub fn end(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_must_be_positive() {
        assert!(Brush::new(0.0, BrushMode::Erase).is_err());
        assert!(Brush::new(-3.0, BrushMode::Erase).is_err());
        assert!(Brush::new(f64::INFINITY, BrushMode::Erase).is_err());
        assert!(Brush::new(0.5, BrushMode::Erase).is_ok());
    }

    #[test]
    fn stamp_draws_a_disc() {
        let mut mask = Mask::new(21, 21);
        Brush::new(3.0, BrushMode::Erase)
            .unwrap()
            .stamp(&mut mask, 10.0, 10.0);
        assert!(mask.is_removed(10, 10));
        assert!(mask.is_removed(13, 10));
        assert!(mask.is_removed(10, 7));
        assert!(!mask.is_removed(13, 13));
        assert!(!mask.is_removed(14, 10));
        // Lattice points within radius 3: 29.
        assert_eq!(mask.removed_count(), 29);
    }

    #[test]
    fn stamp_is_clipped_at_edges() {
        let mut mask = Mask::new(5, 5);
        let brush = Brush::new(2.0, BrushMode::Erase).unwrap();
        brush.stamp(&mut mask, 0.0, 0.0);
        brush.stamp(&mut mask, -50.0, 80.0);
        assert!(mask.is_removed(0, 0));
        assert!(mask.is_removed(2, 0));
        assert!(!mask.is_removed(2, 2));
    }

    #[test]
    fn restore_undoes_erase() {
        let mut mask = Mask::new(10, 10);
        Brush::new(4.0, BrushMode::Erase)
            .unwrap()
            .stamp(&mut mask, 5.0, 5.0);
        Brush::new(4.0, BrushMode::Restore)
            .unwrap()
            .stamp(&mut mask, 5.0, 5.0);
        assert!(mask.is_empty());
    }

    #[test]
    fn interpolation_steps_follow_half_radius_spacing() {
        assert_eq!(interpolation_steps(0.0, 10.0), 1);
        assert_eq!(interpolation_steps(5.0, 10.0), 1);
        assert_eq!(interpolation_steps(5.1, 10.0), 2);
        assert_eq!(interpolation_steps(100.0, 10.0), 20);
    }

    #[test]
    fn fast_stroke_leaves_no_gaps() {
        let mut mask = Mask::new(200, 20);
        let brush = Brush::new(2.0, BrushMode::Erase).unwrap();
        let mut stroke = BrushStroke::begin(brush, &mut mask, (5.0, 10.0));
        stroke.extend(&mut mask, (190.0, 10.0));
        stroke.end();
        for x in 5..=190 {
            assert!(mask.is_removed(x, 10), "gap at x={x}");
        }
    }

    #[test]
    fn far_off_sample_only_walks_the_visible_part() {
        let mut mask = Mask::new(10, 10);
        let brush = Brush::new(1.0, BrushMode::Erase).unwrap();
        let mut stroke = BrushStroke::begin(brush, &mut mask, (5.0, 5.0));
        stroke.extend(&mut mask, (1.0e12, 5.0));
        stroke.end();
        for x in 5..10 {
            assert!(mask.is_removed(x, 5), "gap at x={x}");
        }
        assert!(!mask.is_removed(3, 5));
        assert!(!mask.is_removed(7, 8));
    }

    #[test]
    fn segment_crossing_the_mask_from_outside_is_drawn() {
        let mut mask = Mask::new(20, 5);
        let brush = Brush::new(1.0, BrushMode::Erase).unwrap();
        let mut stroke = BrushStroke::begin(brush, &mut mask, (-1.0e9, 2.0));
        assert!(mask.is_empty());
        stroke.extend(&mut mask, (1.0e9, 2.0));
        for x in 0..20 {
            assert!(mask.is_removed(x, 2), "gap at x={x}");
        }
    }

    #[test]
    fn non_finite_samples_are_ignored() {
        let mut mask = Mask::new(10, 10);
        let brush = Brush::new(2.0, BrushMode::Erase).unwrap();
        let mut stroke = BrushStroke::begin(brush, &mut mask, (f64::NAN, 5.0));
        stroke.extend(&mut mask, (f64::INFINITY, 5.0));
        assert!(mask.is_empty());
        stroke.extend(&mut mask, (2.0, 2.0));
        stroke.extend(&mut mask, (7.0, 2.0));
        assert!(mask.is_removed(5, 2));
    }

    #[test]
    fn separate_strokes_do_not_connect() {
        let mut mask = Mask::new(100, 10);
        let brush = Brush::new(2.0, BrushMode::Erase).unwrap();
        BrushStroke::begin(brush, &mut mask, (10.0, 5.0)).end();
        BrushStroke::begin(brush, &mut mask, (90.0, 5.0)).end();
        assert!(!mask.is_removed(50, 5));
    }
}
