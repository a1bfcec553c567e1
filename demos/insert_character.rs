//! Cut a character out of its white backdrop and insert it into a panel.
//!
//! Usage:
//! ```sh
//! cargo run --example insert_character -- panel.png hero.png output.png [x y scale]
//! ```

use std::env;
use std::process;

use manga_mask::{load_rgba, save_image, InsertOptions, MaskEngine, Placement};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <background> <character> <output> [x y scale]", args[0]);
        process::exit(1);
    }

    let arg = |i: usize, default: &str| args.get(i).cloned().unwrap_or_else(|| default.to_string());
    let x: i32 = arg(4, "0").parse().expect("x must be an integer");
    let y: i32 = arg(5, "0").parse().expect("y must be an integer");
    let scale: f64 = arg(6, "1.0").parse().expect("scale must be a number");

    let background = load_rgba(args[1].as_ref()).expect("failed to load background");
    let character = load_rgba(args[2].as_ref()).expect("failed to load character");

    let engine = MaskEngine::default();
    let opts = InsertOptions {
        placement: Placement::new(x, y, scale).expect("invalid placement"),
        ..InsertOptions::default()
    };

    match engine.insert(&background, &character, &opts) {
        Ok(result) => {
            if let Err(e) = save_image(&result.image, args[3].as_ref()) {
                eprintln!("Error: {e}");
                process::exit(1);
            }
            let r = result.placed;
            println!(
                "Done: placed {}x{} at ({}, {}) -> {}",
                r.width, r.height, r.x, r.y, args[3]
            );
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
