//! Aggregation of detector output into pixel-space boxes.
//!
//! The detector reports four independent lists: text spans, document-text
//! blocks and logos in absolute pixel corners, and localized objects in
//! normalized `[0, 1]` corners. [`aggregate`] flattens them into one list of
//! [`Detection`]s, expanding each box by a per-category margin before clamping
//! it to the image, and dropping objects that are not signage-like.

use serde::{Deserialize, Serialize};

/// Expansion margin for text and document-text boxes.
pub const TEXT_MARGIN: f64 = 12.0;
/// Expansion margin for logo boxes.
pub const LOGO_MARGIN: f64 = 25.0;
/// Expansion margin for object boxes.
pub const OBJECT_MARGIN: f64 = 20.0;

/// Annotations with fewer vertices than this cannot describe a box.
const MIN_VERTICES: usize = 2;

/// Object labels worth masking. Matched as case-insensitive substrings.
pub const RELEVANT_OBJECT_TERMS: &[&str] = &[
    "sign", "signage", "signboard", "billboard", "hoarding", "advertisement", "advertising",
    "ad", "poster", "banner", "flex", "flexboard", "display", "board", "placard", "notice",
    "notification", "screen", "monitor", "tv", "television", "store", "shop", "storefront",
    "retail", "outlet", "mall", "market", "awning", "canopy", "canopies", "shade", "marquee",
    "fascia", "facade", "neon", "led", "electronic", "digital", "backlit", "lightbox",
    "nameplate", "plaque", "menu", "price", "pricelist", "rate", "tag", "label", "sticker",
    "decal", "vinyl", "graphic", "flag", "pennant", "streamer", "text", "letter", "word",
    "writing", "number", "numeral", "logo", "brand", "trademark", "symbol", "icon", "emblem",
    "company", "corporate", "business", "commercial", "window", "door", "entrance", "entry",
    "booth", "kiosk", "stand", "stall", "cart", "vendor", "pole", "post", "pillar", "column",
    "frame", "panel", "wall", "surface", "paint", "mural", "graffiti", "street art",
    "wall art", "product", "merchandise", "goods", "offer", "sale", "discount", "promo",
    "deal", "open", "closed", "hours", "timing", "schedule", "phone", "telephone", "contact",
    "address", "location", "arrow", "direction", "pointing", "parking", "toilet", "restroom",
    "exit", "warning", "caution", "danger", "safety", "emergency", "information", "info",
    "help", "guide", "map",
];

/// Axis-aligned box in absolute pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub xmin: f64,
    /// Top edge.
    pub ymin: f64,
    /// Right edge.
    pub xmax: f64,
    /// Bottom edge.
    pub ymax: f64,
}

impl BoundingBox {
    /// Box width (`xmax - xmin`).
    #[must_use]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Box height (`ymax - ymin`).
    #[must_use]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Bounding box of a vertex list, or `None` for degenerate input.
    fn enclosing(points: impl Iterator<Item = (f64, f64)>) -> Option<Self> {
        let mut count = 0usize;
        let mut b = Self {
            xmin: f64::INFINITY,
            ymin: f64::INFINITY,
            xmax: f64::NEG_INFINITY,
            ymax: f64::NEG_INFINITY,
        };
        for (x, y) in points {
            if !x.is_finite() || !y.is_finite() {
                return None;
            }
            b.xmin = b.xmin.min(x);
            b.ymin = b.ymin.min(y);
            b.xmax = b.xmax.max(x);
            b.ymax = b.ymax.max(y);
            count += 1;
        }
        (count >= MIN_VERTICES).then_some(b)
    }

    /// Grow by `margin` on every side, then clamp to `[0, width] x [0, height]`.
    #[must_use]
    pub fn expand_clamped(&self, margin: f64, width: u32, height: u32) -> Self {
        Self {
            xmin: (self.xmin - margin).max(0.0),
            ymin: (self.ymin - margin).max(0.0),
            xmax: (self.xmax + margin).min(f64::from(width)),
            ymax: (self.ymax + margin).min(f64::from(height)),
        }
    }

    fn has_area(&self) -> bool {
        self.width() > 0.0 && self.height() > 0.0
    }
}

/// A labeled, scored box ready for mask rasterization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Category or object name.
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub score: f64,
    /// Expanded and clamped box.
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

/// A polygon vertex as reported by the detector. Missing coordinates mean 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Horizontal coordinate.
    #[serde(default)]
    pub x: Option<f64>,
    /// Vertical coordinate.
    #[serde(default)]
    pub y: Option<f64>,
}

impl Vertex {
    fn coords(self) -> (f64, f64) {
        (self.x.unwrap_or(0.0), self.y.unwrap_or(0.0))
    }
}

/// Text span, document-text block or logo, in absolute pixel coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Polygon corners.
    #[serde(default)]
    pub vertices: Vec<Vertex>,
    /// Upstream confidence, if any.
    #[serde(default)]
    pub score: Option<f64>,
}

/// Localized object, in normalized `[0, 1]` coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectAnnotation {
    /// Object class name.
    pub name: String,
    /// Polygon corners, normalized to the image size.
    #[serde(default)]
    pub normalized_vertices: Vec<Vertex>,
    /// Upstream confidence, if any.
    #[serde(default)]
    pub score: Option<f64>,
}

/// Everything the detector returned for one image.
///
/// `text` holds individual text spans only; the detector's whole-image
/// summary annotation must not be included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSet {
    /// Individual text spans.
    #[serde(default)]
    pub text: Vec<Annotation>,
    /// Document-text blocks.
    #[serde(default)]
    pub document_text: Vec<Annotation>,
    /// Logos and brands.
    #[serde(default)]
    pub logos: Vec<Annotation>,
    /// Localized objects.
    #[serde(default)]
    pub objects: Vec<ObjectAnnotation>,
}

/// Whether an object label matches the relevance vocabulary.
#[must_use]
pub fn is_relevant_object(label: &str) -> bool {
    let label = label.to_lowercase();
    RELEVANT_OBJECT_TERMS.iter().any(|term| label.contains(term))
}

/// Absent or zero scores default to 1.0.
fn score_or_one(score: Option<f64>) -> f64 {
    match score {
        Some(s) if s != 0.0 && !s.is_nan() => s,
        _ => 1.0,
    }
}

fn push_detection(
    out: &mut Vec<Detection>,
    label: &str,
    score: f64,
    raw: Option<BoundingBox>,
    margin: f64,
    width: u32,
    height: u32,
) {
    let Some(raw) = raw else {
        log::debug!("skipping {label} annotation with degenerate geometry");
        return;
    };
    let bbox = raw.expand_clamped(margin, width, height);
    if !bbox.has_area() {
        log::debug!("skipping {label} annotation with zero area after clamping");
        return;
    }
    out.push(Detection {
        label: label.to_string(),
        score,
        bbox,
    });
}

/// Flatten a [`DetectionSet`] into expanded, clamped boxes for a `width x height` image.
///
/// Output order is text spans, document text, logos, then relevant objects.
/// Degenerate annotations are skipped.
#[must_use]
pub fn aggregate(set: &DetectionSet, width: u32, height: u32) -> Vec<Detection> {
    let mut out = Vec::new();
    let (w, h) = (f64::from(width), f64::from(height));

    for a in &set.text {
        let raw = BoundingBox::enclosing(a.vertices.iter().map(|v| v.coords()));
        let score = a.score.unwrap_or(1.0);
        push_detection(&mut out, "text", score, raw, TEXT_MARGIN, width, height);
    }

    for a in &set.document_text {
        let raw = BoundingBox::enclosing(a.vertices.iter().map(|v| v.coords()));
        let score = score_or_one(a.score);
        push_detection(&mut out, "document_text", score, raw, TEXT_MARGIN, width, height);
    }

    for a in &set.logos {
        let raw = BoundingBox::enclosing(a.vertices.iter().map(|v| v.coords()));
        let score = score_or_one(a.score);
        push_detection(&mut out, "logo", score, raw, LOGO_MARGIN, width, height);
    }

    for o in &set.objects {
        if !is_relevant_object(&o.name) {
            log::debug!("dropping irrelevant object {:?}", o.name);
            continue;
        }
        let raw = BoundingBox::enclosing(o.normalized_vertices.iter().map(|v| {
            let (x, y) = v.coords();
            (x * w, y * h)
        }));
        let score = score_or_one(o.score);
        push_detection(&mut out, &o.name, score, raw, OBJECT_MARGIN, width, height);
    }

    log::debug!("aggregated {} detections", out.len());
    out
}
