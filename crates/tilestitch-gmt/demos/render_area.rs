//! Example: Render a GMT collection over a longitude/latitude box.
//!
//! Usage: cargo run --example render_area -- <collection> <west> <south> <east> <north> <width> <height> <out.tif> [config.yaml]
//!
//! Set `RUST_LOG=debug` for details of every fetch.

use std::env;
use std::path::Path;
use std::time::Instant;
use tilestitch_gmt::{GmtConfig, GmtSource};
use tilestitch_raster::{Bounds, GeoTiffOptions, GridSpec, LayerOptions, RasterBuffer, SampleType};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 9 {
        eprintln!(
            "Usage: {} <collection> <west> <south> <east> <north> <width> <height> <out.tif> [config.yaml]",
            args[0]
        );
        eprintln!("Example: {} earth_relief 5 45 7 47 720 720 alps.tif", args[0]);
        std::process::exit(1);
    }

    let collection = &args[1];
    let edges: Vec<f64> = args[2..6]
        .iter()
        .map(|s| s.parse().expect("Invalid coordinate"))
        .collect();
    let width: u32 = args[6].parse().expect("Invalid width");
    let height: u32 = args[7].parse().expect("Invalid height");
    let output = &args[8];

    let config = match args.get(9) {
        Some(path) => GmtConfig::load(path).expect("Failed to load configuration"),
        None => GmtConfig::default(),
    };

    let start = Instant::now();
    let source = GmtSource::open(&config).expect("Failed to open GMT server");
    println!(
        "Loaded catalog of {} in {:.2}s",
        source.root(),
        start.elapsed().as_secs_f64()
    );

    let grid = GridSpec::geographic(Bounds::new(edges[0], edges[1], edges[2], edges[3]), width, height);
    let mut dst = RasterBuffer::new(grid, 1, SampleType::I16);

    let render_start = Instant::now();
    match source.render(&mut dst, None, None, collection, &LayerOptions::default()) {
        Ok(report) => {
            println!(
                "Composed {} files at {:.1} arcsec in {:.2}s",
                report.files.len(),
                report.resolution_arcsec,
                render_start.elapsed().as_secs_f64()
            );
            if !report.remainder.is_empty() {
                println!("Uncovered area: {:.3} square degrees", report.remainder.area());
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    dst.save_geotiff(Path::new(output), &GeoTiffOptions::default())
        .expect("Failed to write output");

    let stats = source.fetcher().download_stats();
    println!(
        "Downloaded {} files ({:.2} MB), wrote {}",
        stats.files_downloaded,
        stats.bytes_downloaded as f64 / 1_000_000.0,
        output
    );
}
