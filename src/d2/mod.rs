use cgmath::Vector2;
use ndarray::{Array, Array2};
use std::ops::Range;
use tracing::debug;

use crate::{Error, Result};

mod stencil;

pub use stencil::{evolve, evolve_par, Solver};

const BACKGROUND: f64 = 65.0;
const FIRST_COLUMN: f64 = 85.0;
const LAST_COLUMN: f64 = 5.0;
const FIRST_ROW: f64 = 20.0;
const LAST_ROW: f64 = 70.0;
const COLD_SPOT: f64 = 5.0;

fn check_size(w: usize, h: usize) -> Result<()> {
    if w == 0 || h == 0 {
        return Err(Error::invalid(
            "size",
            format!("grid must be at least 1x1, got {}x{}", w, h),
        ));
    }
    Ok(())
}

fn check_spacing(spacing: Vector2<f64>) -> Result<()> {
    // `!(x > 0.0)` also rejects NaN
    if !(spacing.x > 0.0) || !(spacing.y > 0.0) {
        return Err(Error::invalid(
            "spacing",
            format!("both components must be positive, got ({}, {})", spacing.x, spacing.y),
        ));
    }
    Ok(())
}

fn check_diffusion(diffusion: f64) -> Result<()> {
    if !(diffusion > 0.0) {
        return Err(Error::invalid(
            "diffusion",
            format!("must be positive, got {}", diffusion),
        ));
    }
    Ok(())
}

/// Clip the half-open signed range `start..end` to `0..len`.
fn clip(start: isize, end: isize, len: usize) -> Range<usize> {
    let end = (end.max(0) as usize).min(len);
    let start = (start.max(0) as usize).min(end);
    start..end
}

/// Create the default `w` x `h` field.
///
/// The field is filled with 65.0, the border lines are fixed at 85.0 (first
/// column), 5.0 (last column), 20.0 (first row) and 70.0 (last row), and a
/// cold disc of 5.0 with radius `w / 6` is stamped around the centre. The disc
/// is applied last, so on narrow grids it may overwrite border cells.
pub fn default_field((w, h): (usize, usize)) -> Result<Array2<f64>> {
    check_size(w, h)?;

    let mut field = Array::from_elem((w, h), BACKGROUND);

    // Rows go last so the corners carry the row values.
    field.column_mut(0).fill(FIRST_COLUMN);
    field.column_mut(h - 1).fill(LAST_COLUMN);
    field.row_mut(0).fill(FIRST_ROW);
    field.row_mut(w - 1).fill(LAST_ROW);

    let radius = (w / 6) as isize;
    let cx = (w / 2) as isize;
    let cy = (h / 2) as isize;

    for i in clip(cx - radius, cx + radius, w) {
        let dx = i as isize - cx + 1;
        for j in clip(cy - radius, cy + radius, h) {
            let dy = j as isize - cy + 1;
            if dx * dx + dy * dy < radius * radius {
                field[[i, j]] = COLD_SPOT;
            }
        }
    }

    Ok(field)
}

/// Largest stable time step of the explicit scheme for grid `spacing` and
/// `diffusion` constant.
///
/// `dt = dx^2 * dy^2 / (2 * diffusion * (dx^2 + dy^2))`
pub fn estimate_dt(spacing: Vector2<f64>, diffusion: f64) -> Result<f64> {
    check_spacing(spacing)?;
    check_diffusion(diffusion)?;

    let dx2 = spacing.x.powi(2);
    let dy2 = spacing.y.powi(2);
    let dt = (dx2 * dy2) / (2.0 * diffusion * (dx2 + dy2));

    debug!(dt, diffusion, "estimated stable time step");
    Ok(dt)
}
