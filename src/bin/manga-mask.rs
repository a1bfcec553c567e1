use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;

use manga_mask::color_key::parse_hex_color;
use manga_mask::{
    default_output_path, is_supported_image, load_detections, load_rgba, save_image,
    BackgroundRemoval, ColorKey, InsertOptions, Limits, MaskEngine, Placement, Result,
    DEFAULT_THRESHOLD, DEFAULT_TOLERANCE,
};

#[derive(Parser)]
#[command(
    name = "manga-mask",
    about = "Build inpainting masks, remove character backgrounds and composite characters",
    version,
    after_help = "Examples:\n  \
                  manga-mask mask photo.jpg --detections detections.json\n  \
                  manga-mask remove-bg hero.png --color '#00ff00' --tolerance 40\n  \
                  manga-mask insert panel.png hero.png --x 120 --y 80 --scale 0.5"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Reject images larger than this many pixels
    #[arg(long, global = true, default_value_t = Limits::default().max_pixels)]
    max_pixels: u64,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Rasterize detector output into an inpainting mask (white = repaint)
    Mask {
        /// Image the detections were computed on
        image: PathBuf,

        /// Detector output as JSON
        #[arg(short, long)]
        detections: PathBuf,

        /// Output mask (default: {name}_mask.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the aggregated boxes as JSON
        #[arg(long)]
        detections_out: Option<PathBuf>,
    },

    /// Make a character's background transparent
    RemoveBg {
        /// Character image
        character: PathBuf,

        #[command(flatten)]
        removal: RemovalArgs,

        /// Output image (default: {name}_cutout.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply a painted mask (black = remove) to a character
    ApplyMask {
        /// Character image
        character: PathBuf,

        /// Mask image, resized to the character if needed
        mask: PathBuf,

        /// Output image (default: {name}_cutout.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Composite a character onto a background
    Insert {
        /// Background (manga panel)
        background: PathBuf,

        /// Character image
        character: PathBuf,

        /// Left edge in background pixels
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        x: i32,

        /// Top edge in background pixels
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        y: i32,

        /// Scale applied to the character
        #[arg(long, default_value_t = 1.0)]
        scale: f64,

        #[command(flatten)]
        removal: RemovalArgs,

        /// Use the character's alpha as-is (already cut out)
        #[arg(long, conflicts_with_all = ["threshold", "color"])]
        keep_alpha: bool,

        /// Output image (default: {name}_inserted.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RemovalArgs {
    /// Brightness threshold for edge flood fill (0-255)
    #[arg(short, long, conflicts_with = "color")]
    threshold: Option<u8>,

    /// Remove every pixel near this color (#rrggbb) instead of flood filling
    #[arg(short, long)]
    color: Option<String>,

    /// Color distance tolerance (0-441)
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: f64,
}

impl RemovalArgs {
    fn to_removal(&self) -> Result<BackgroundRemoval> {
        match &self.color {
            Some(color) => Ok(BackgroundRemoval::ColorKey(ColorKey::new(
                parse_hex_color(color)?,
                self.tolerance,
            )?)),
            None => Ok(BackgroundRemoval::EdgeFlood {
                threshold: self.threshold.unwrap_or(DEFAULT_THRESHOLD),
            }),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        LevelFilter::Error
    } else if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let engine = MaskEngine::new(Limits {
        max_pixels: cli.max_pixels,
    });

    let (input, result) = match &cli.command {
        Command::Mask {
            image,
            detections,
            output,
            detections_out,
        } => (
            image.clone(),
            run_mask(
                &engine,
                image,
                detections,
                output.as_deref(),
                detections_out.as_deref(),
            ),
        ),
        Command::RemoveBg {
            character,
            removal,
            output,
        } => (
            character.clone(),
            run_remove_bg(&engine, character, removal, output.as_deref()),
        ),
        Command::ApplyMask {
            character,
            mask,
            output,
        } => (
            character.clone(),
            run_apply_mask(&engine, character, mask, output.as_deref()),
        ),
        Command::Insert {
            background,
            character,
            x,
            y,
            scale,
            removal,
            keep_alpha,
            output,
        } => (
            character.clone(),
            run_insert(
                &engine,
                background,
                character,
                (*x, *y, *scale),
                removal,
                *keep_alpha,
                output.as_deref(),
            ),
        ),
    };

    match result {
        Ok(message) => {
            if !cli.quiet {
                eprintln!("[OK] {}: {message}", display_name(&input));
            }
        }
        Err(e) => {
            eprintln!("[FAIL] {}: {e}", display_name(&input));
            process::exit(1);
        }
    }
}

fn check_input(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input path does not exist: {}", path.display()),
        )
        .into());
    }
    if !is_supported_image(path) {
        log::warn!("{} has an unusual extension, trying anyway", path.display());
    }
    Ok(())
}

fn run_mask(
    engine: &MaskEngine,
    image: &Path,
    detections: &Path,
    output: Option<&Path>,
    detections_out: Option<&Path>,
) -> Result<String> {
    check_input(image)?;
    let (width, height) = image::image_dimensions(image)?;
    let set = load_detections(detections)?;
    let sketch = engine.sketch_mask(width, height, &set)?;

    let out = output.map_or_else(|| default_output_path(image, "mask"), Path::to_path_buf);
    save_image(&sketch.mask.to_inpaint_image(), &out)?;

    if let Some(path) = detections_out {
        let json = serde_json::to_string_pretty(&sketch.detections)?;
        std::fs::write(path, json)?;
    }

    Ok(format!(
        "{} regions -> {}",
        sketch.detections.len(),
        out.display()
    ))
}

fn run_remove_bg(
    engine: &MaskEngine,
    character: &Path,
    removal: &RemovalArgs,
    output: Option<&Path>,
) -> Result<String> {
    check_input(character)?;
    let img = load_rgba(character)?;
    let cutout = engine.remove_background(&img, &removal.to_removal()?)?;
    let cleared = cutout.pixels().filter(|p| p[3] == 0).count();

    let out = output.map_or_else(|| default_output_path(character, "cutout"), Path::to_path_buf);
    save_image(&cutout, &out)?;
    Ok(format!("{cleared} pixels cleared -> {}", out.display()))
}

fn run_apply_mask(
    engine: &MaskEngine,
    character: &Path,
    mask: &Path,
    output: Option<&Path>,
) -> Result<String> {
    check_input(character)?;
    check_input(mask)?;
    let img = load_rgba(character)?;
    let mask_img = image::open(mask)?;
    let cutout = engine.apply_mask(&img, &mask_img)?;

    let out = output.map_or_else(|| default_output_path(character, "cutout"), Path::to_path_buf);
    save_image(&cutout, &out)?;
    Ok(format!("mask applied -> {}", out.display()))
}

fn run_insert(
    engine: &MaskEngine,
    background: &Path,
    character: &Path,
    (x, y, scale): (i32, i32, f64),
    removal: &RemovalArgs,
    keep_alpha: bool,
    output: Option<&Path>,
) -> Result<String> {
    check_input(background)?;
    check_input(character)?;
    let bg = load_rgba(background)?;
    let ch = load_rgba(character)?;

    let opts = InsertOptions {
        placement: Placement::new(x, y, scale)?,
        removal: if keep_alpha {
            BackgroundRemoval::Keep
        } else {
            removal.to_removal()?
        },
    };
    let result = engine.insert(&bg, &ch, &opts)?;

    let out = output.map_or_else(|| default_output_path(background, "inserted"), Path::to_path_buf);
    save_image(&result.image, &out)?;
    let r = result.placed;
    Ok(format!(
        "placed {}x{} at ({}, {}) -> {}",
        r.width,
        r.height,
        r.x,
        r.y,
        out.display()
    ))
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}
