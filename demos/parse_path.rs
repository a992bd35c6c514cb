//! This example parses scene description paths and evaluates a sample spline.
//!
//! Each argument is parsed with the global interner and printed element by
//! element. A small curve spline is then sampled through a cached evaluator.
//!
//! # Usage:
//! ```bash
//! RUST_LOG=debug cargo run --example parse_path '/World/Geom.points' '/A{lod=high}B.rel[/C].attr'
//! ```

use std::env;

use anyhow::{Context as _, Result};
use openusd_foundation::{
    sdf::{parse_path, Element},
    ts::{Evaluator, InterpMode, Knot, Side, Spline},
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        anyhow::bail!("Missing path, use: cargo run --example parse_path {{PATH}}...");
    }

    for text in &args {
        println!("-- {}", text);

        let path = match parse_path(text) {
            Ok(path) => path,
            Err(err) => {
                println!("\t{}", err);
                println!();
                continue;
            }
        };

        println!("Anchor: {:?}", path.anchor());
        println!("Canonical: {}", path);

        for (index, element) in path.elements().iter().enumerate() {
            match element {
                Element::Target(nested) | Element::Mapper(nested) => {
                    println!("#{}:\t{} -> {}", index, element.kind(), nested)
                }
                _ => println!("#{}:\t{} {}", index, element.kind(), element),
            }
        }
        println!();
    }

    let mut spline = Spline::<f64>::new();
    spline.set_knot(
        Knot::new(0.0, 0.0)
            .with_interp(InterpMode::Curve)
            .with_post_tangent(1.0, 0.0),
    )?;
    spline.set_knot(Knot::new(4.0, 10.0).with_pre_tangent(1.0, 0.0))?;

    let evaluator = Evaluator::new(&spline);
    let (start, end) = spline.time_range().context("Sample spline has no knots")?;

    println!("-- Spline ({} cached segments)", evaluator.cached_segments());
    let mut time = start - 1.0;
    while time <= end + 1.0 {
        println!("{:>5.2}\t{:.4}", time, evaluator.eval(time, Side::Right));
        time += 0.5;
    }

    Ok(())
}
