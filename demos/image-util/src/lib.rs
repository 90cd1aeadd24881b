use image::{Rgb, RgbImage};
use ndarray::Array2;
use std::path::Path;

/// Blue at `lo`, through white, to red at `hi`.
fn ramp(t: f64, (lo, hi): (f64, f64)) -> Rgb<u8> {
    let s = ((t - lo) / (hi - lo)).max(0.0).min(1.0);

    let (r, g, b) = if s < 0.5 {
        let k = s * 2.0;
        (k, k, 1.0)
    } else {
        let k = (1.0 - s) * 2.0;
        (1.0, k, k)
    };

    Rgb([(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8])
}

/// Save `field` as `dir/{prefix}_{index:06}.png`, x to the right and y down.
pub fn save_heatmap(
    dir: &Path,
    prefix: &str,
    index: usize,
    field: &Array2<f64>,
    range: (f64, f64),
) -> anyhow::Result<()> {
    let shape = field.dim();

    let mut img = RgbImage::new(shape.0 as u32, shape.1 as u32);

    for ((i, j), &t) in field.indexed_iter() {
        img.put_pixel(i as u32, j as u32, ramp(t, range));
    }

    img.save(dir.join(format!("{}_{:06}.png", prefix, index)))?;

    Ok(())
}
