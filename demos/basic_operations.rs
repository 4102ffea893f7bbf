use surf_rs::core::FMatrix;
use surf_rs::error::Result;
use surf_rs::features2d::{detect_and_describe, HessianPyramidConfig, PipelineConfig};

fn main() -> Result<()> {
    println!("surf-rs Basic Pipeline Example");
    println!("===============================\n");

    println!("Building a 128x128 synthetic image with one bright blob...");
    let mut image = FMatrix::zeros(128, 128);
    for y in 50..78 {
        for x in 50..78 {
            image.set(y, x, 220.0);
        }
    }
    println!("  Size: {}x{}\n", image.cols(), image.rows());

    println!("Running the detect-and-describe pipeline...");
    let config = PipelineConfig {
        pyramid: HessianPyramidConfig {
            number_of_levels: 6,
            ..HessianPyramidConfig::default()
        },
        ..PipelineConfig::default()
    };
    let points = detect_and_describe(&image, &config)?;

    println!("  Found {} interest point(s)\n", points.len());
    for (i, p) in points.iter().enumerate() {
        println!(
            "  [{i}] x={:.2} y={:.2} radius={:.2} angle={:.2} rad, descriptor length={}",
            p.location.x,
            p.location.y,
            p.location.radius,
            p.location.angle,
            p.descriptor.len()
        );
    }

    println!("\nPipeline completed successfully!");
    Ok(())
}
