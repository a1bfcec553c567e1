//! Raster masking and compositing for turning photos into manga panels and
//! inserting characters into them.
//!
//! The crate is a pure pixel-in/pixel-out engine with two pipelines:
//!
//! - **Sketch masks**: detector output (text, document text, logos, objects)
//!   is aggregated into expanded boxes and rasterized into a mask that tells
//!   an inpainter which regions to repaint.
//! - **Character insertion**: a character's background is removed by edge
//!   flood fill, by color key, or by a mask painted interactively in an
//!   [`EditSession`], then the character is scaled, clamped into place and
//!   alpha-composited onto a background.
//!
//! # Quick Start
//!
//! ```no_run
//! use manga_mask::{InsertOptions, MaskEngine, Placement};
//!
//! let engine = MaskEngine::default();
//! let panel = image::open("panel.png").unwrap().to_rgba8();
//! let character = image::open("hero.png").unwrap().to_rgba8();
//! let opts = InsertOptions {
//!     placement: Placement::new(120, 80, 0.5).unwrap(),
//!     ..InsertOptions::default()
//! };
//! let result = engine.insert(&panel, &character, &opts).unwrap();
//! result.image.save("panel_with_hero.png").unwrap();
//! ```
//!
//! # Interactive editing
//!
//! ```no_run
//! use manga_mask::{Brush, BrushMode, EditSession, Limits};
//!
//! let character = image::open("hero.png").unwrap().to_rgba8();
//! let mut session = EditSession::begin(character, &Limits::default()).unwrap();
//! session.magic_wand(0, 0, 30.0).unwrap();
//! session.begin_stroke((40.0, 40.0), Brush::new(10.0, BrushMode::Restore).unwrap());
//! session.continue_stroke((60.0, 45.0));
//! session.end_stroke();
//! let (masked, _mask) = session.apply().unwrap();
//! masked.save("hero_cutout.png").unwrap();
//! ```

#![deny(missing_docs)]

pub mod boxes;
pub mod brush;
pub mod color_key;
pub mod compositor;
mod engine;
pub mod error;
pub mod fill;
pub mod mask;
pub mod session;

pub use boxes::{BoundingBox, Detection, DetectionSet};
pub use brush::{Brush, BrushMode, BrushStroke};
pub use color_key::ColorKey;
pub use compositor::{PlacedRect, Placement};
pub use engine::{
    default_output_path, is_supported_image, load_detections, load_rgba, save_image,
    BackgroundRemoval, InsertOptions, InsertResult, Limits, MaskEngine, SketchMask,
    DEFAULT_THRESHOLD, DEFAULT_TOLERANCE,
};
pub use error::{Error, Result};
pub use fill::FloodFill;
pub use mask::Mask;
pub use session::EditSession;
