use cgmath::Vector2;
use ndarray::{s, Array2, Zip};
use tracing::{debug, trace};

use super::{check_diffusion, check_size, check_spacing};
use crate::{Error, Result};

/// Selects one of the two interchangeable evolvers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Solver {
    /// [`evolve`], plain indexed loops on one thread.
    Sequential,
    /// [`evolve_par`], each pass split across the rayon pool.
    Parallel,
}

impl Solver {
    pub fn evolve(
        self,
        field: &Array2<f64>,
        spacing: Vector2<f64>,
        diffusion: f64,
        dt: f64,
        iterations: usize,
    ) -> Result<Array2<f64>> {
        match self {
            Solver::Sequential => evolve(field, spacing, diffusion, dt, iterations),
            Solver::Parallel => evolve_par(field, spacing, diffusion, dt, iterations),
        }
    }
}

/// Coefficients of the 5-point FTCS update.
#[derive(Clone, Copy, Debug)]
struct Stencil {
    a_dt: f64,
    dx2: f64,
    dy2: f64,
}

impl Stencil {
    fn new(
        field: &Array2<f64>,
        spacing: Vector2<f64>,
        diffusion: f64,
        dt: f64,
        iterations: usize,
    ) -> Result<Self> {
        if iterations == 0 {
            return Err(Error::invalid("iterations", "must be at least 1"));
        }
        let (w, h) = field.dim();
        check_size(w, h)?;
        check_spacing(spacing)?;
        check_diffusion(diffusion)?;

        debug!(w, h, iterations, dt, diffusion, "evolving field");

        Ok(Stencil {
            a_dt: diffusion * dt,
            dx2: spacing.x.powi(2),
            dy2: spacing.y.powi(2),
        })
    }

    /// Next value of a cell from its previous value and its four neighbours.
    /// `left`/`right` lie along x, `up`/`down` along y.
    #[inline]
    fn apply(&self, mid: f64, left: f64, right: f64, up: f64, down: f64) -> f64 {
        mid + self.a_dt * ((right - 2.0 * mid + left) / self.dx2 + (down - 2.0 * mid + up) / self.dy2)
    }
}

/// Two same-shape grids. Each pass reads the current one and writes the other,
/// then the roles flip. Border cells are never written, so the copies made at
/// seeding keep them correct in both.
struct DoubleBuffer {
    front: Array2<f64>,
    back: Array2<f64>,
    // Even number of passes so far: `front` is current.
    front_current: bool,
}

impl DoubleBuffer {
    fn new(field: &Array2<f64>) -> Self {
        DoubleBuffer {
            front: field.clone(),
            back: field.clone(),
            front_current: true,
        }
    }

    /// `(current, next)`
    fn split(&mut self) -> (&Array2<f64>, &mut Array2<f64>) {
        if self.front_current {
            (&self.front, &mut self.back)
        } else {
            (&self.back, &mut self.front)
        }
    }

    fn swap(&mut self) {
        self.front_current = !self.front_current;
    }

    fn into_current(self) -> Array2<f64> {
        if self.front_current {
            self.front
        } else {
            self.back
        }
    }
}

/// Evolve the heat equation over `field` for `iterations` explicit steps.
///
/// Reference implementation: a sequential loop over interior cells. Border
/// cells keep their values. The input is left untouched and the state after
/// the last step is returned.
///
/// # Errors
///
/// [`Error::InvalidArgument`] when `iterations` is zero, `diffusion` or either
/// `spacing` component is not positive, or `field` is empty. Nothing is
/// computed in that case.
///
/// A `dt` above [`estimate_dt`](super::estimate_dt) is not rejected; the
/// result then diverges.
pub fn evolve(
    field: &Array2<f64>,
    spacing: Vector2<f64>,
    diffusion: f64,
    dt: f64,
    iterations: usize,
) -> Result<Array2<f64>> {
    let stencil = Stencil::new(field, spacing, diffusion, dt, iterations)?;
    let (w, h) = field.dim();

    let mut buffers = DoubleBuffer::new(field);

    for pass in 0..iterations {
        let (curr, next) = buffers.split();

        for i in 1..w - 1 {
            for j in 1..h - 1 {
                next[[i, j]] = stencil.apply(
                    curr[[i, j]],
                    curr[[i - 1, j]],
                    curr[[i + 1, j]],
                    curr[[i, j - 1]],
                    curr[[i, j + 1]],
                );
            }
        }

        buffers.swap();
        trace!(pass, "pass done");
    }

    Ok(buffers.into_current())
}

/// Same contract as [`evolve`], with every pass distributed over the rayon
/// thread pool. Cells of one pass only read the previous state, so the
/// results match [`evolve`] exactly.
pub fn evolve_par(
    field: &Array2<f64>,
    spacing: Vector2<f64>,
    diffusion: f64,
    dt: f64,
    iterations: usize,
) -> Result<Array2<f64>> {
    let stencil = Stencil::new(field, spacing, diffusion, dt, iterations)?;
    let (w, h) = field.dim();

    // No interior to update.
    if w < 3 || h < 3 {
        return Ok(field.clone());
    }

    let mut buffers = DoubleBuffer::new(field);

    for pass in 0..iterations {
        let (curr, next) = buffers.split();

        Zip::from(next.slice_mut(s![1..-1, 1..-1]))
            .and(curr.windows((3, 3)))
            .par_for_each(|n, win| {
                *n = stencil.apply(
                    win[(1, 1)],
                    win[(0, 1)],
                    win[(2, 1)],
                    win[(1, 0)],
                    win[(1, 2)],
                );
            });

        buffers.swap();
        trace!(pass, "pass done");
    }

    Ok(buffers.into_current())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::d2::{default_field, estimate_dt};
    use approx::assert_abs_diff_eq;
    use cgmath::vec2;
    use ndarray::{array, Array};

    const SOLVERS: [Solver; 2] = [Solver::Sequential, Solver::Parallel];

    fn assert_interior(field: &Array2<f64>, expected: [[f64; 3]; 3]) {
        for i in 0..3 {
            for j in 0..3 {
                assert_abs_diff_eq!(field[[i + 1, j + 1]], expected[i][j], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_double_buffer_parity() {
        let mut buffers = DoubleBuffer::new(&Array::zeros((2, 2)));

        for pass in 1..=5 {
            let (_, next) = buffers.split();
            next.fill(pass as f64);
            buffers.swap();
            assert_eq!(buffers.front_current, pass % 2 == 0);
        }

        let (curr, _) = buffers.split();
        assert_eq!(curr[[0, 0]], 5.0);
        assert_eq!(buffers.into_current()[[1, 1]], 5.0);
    }

    #[test]
    fn test_single_step_5x5() {
        let field = default_field((5, 5)).unwrap();

        for &solver in &SOLVERS {
            let next = solver.evolve(&field, vec2(1.0, 1.0), 0.5, 0.125, 1).unwrap();
            assert_interior(
                &next,
                [
                    [63.4375, 62.1875, 58.4375],
                    [66.25, 65.0, 61.25],
                    [66.5625, 65.3125, 61.5625],
                ],
            );
        }
    }

    #[test]
    fn test_even_and_odd_steps_5x5() {
        let field = default_field((5, 5)).unwrap();
        let dt = estimate_dt(vec2(1.0, 1.0), 0.5).unwrap();

        for &solver in &SOLVERS {
            let one = solver.evolve(&field, vec2(1.0, 1.0), 0.5, dt, 1).unwrap();
            assert_interior(
                &one,
                [
                    [58.75, 53.75, 38.75],
                    [70.0, 65.0, 50.0],
                    [71.25, 66.25, 51.25],
                ],
            );

            let two = solver.evolve(&field, vec2(1.0, 1.0), 0.5, dt, 2).unwrap();
            assert_interior(
                &two,
                [
                    [57.1875, 45.625, 32.1875],
                    [70.0, 60.0, 40.0],
                    [72.8125, 64.375, 47.8125],
                ],
            );

            let three = solver.evolve(&field, vec2(1.0, 1.0), 0.5, dt, 3).unwrap();
            assert_interior(
                &three,
                [
                    [55.15625, 42.34375, 27.65625],
                    [68.75, 55.0, 36.25],
                    [72.34375, 62.65625, 44.84375],
                ],
            );
        }
    }

    #[test]
    fn test_composition() {
        let field = default_field((24, 18)).unwrap();
        let spacing = vec2(0.5, 0.25);
        let dt = estimate_dt(spacing, 0.7).unwrap();

        for &solver in &SOLVERS {
            let once = solver.evolve(&field, spacing, 0.7, dt, 1).unwrap();
            let twice = solver.evolve(&once, spacing, 0.7, dt, 1).unwrap();
            assert_eq!(twice, solver.evolve(&field, spacing, 0.7, dt, 2).unwrap());

            let five = solver.evolve(&twice, spacing, 0.7, dt, 3).unwrap();
            assert_eq!(five, solver.evolve(&field, spacing, 0.7, dt, 5).unwrap());
        }
    }

    #[test]
    fn test_borders_fixed() {
        let field = default_field((20, 13)).unwrap();
        let next = evolve(&field, vec2(1.0, 1.0), 0.5, 0.5, 7).unwrap();
        let (w, h) = field.dim();

        assert_eq!(next.row(0), field.row(0));
        assert_eq!(next.row(w - 1), field.row(w - 1));
        assert_eq!(next.column(0), field.column(0));
        assert_eq!(next.column(h - 1), field.column(h - 1));
        assert_ne!(next, field);
    }

    #[test]
    fn test_anisotropic_spacing() {
        let field = array![
            [0.0, 0.0, 0.0],
            [2.0, 1.0, 4.0],
            [0.0, 0.0, 0.0],
        ];
        // x neighbours 0, 0; y neighbours 2, 4
        // 1 + 0.1 * ((0 - 2 + 0) / 1 + (4 - 2 + 2) / 4)
        for &solver in &SOLVERS {
            let next = solver.evolve(&field, vec2(1.0, 2.0), 1.0, 0.1, 1).unwrap();
            assert_abs_diff_eq!(next[[1, 1]], 0.9, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_no_interior() {
        let narrow = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];

        for &solver in &SOLVERS {
            assert_eq!(solver.evolve(&narrow, vec2(1.0, 1.0), 0.5, 0.5, 3).unwrap(), narrow);
            let single = array![[7.0]];
            assert_eq!(solver.evolve(&single, vec2(1.0, 1.0), 0.5, 0.5, 1).unwrap(), single);
        }
    }

    #[test]
    fn test_invalid_arguments() {
        let field = default_field((5, 5)).unwrap();
        let spacing = vec2(1.0, 1.0);

        for &solver in &SOLVERS {
            match solver.evolve(&field, spacing, 0.5, 0.5, 0) {
                Err(Error::InvalidArgument { name, .. }) => assert_eq!(name, "iterations"),
                other => panic!("unexpected {:?}", other),
            }
            assert!(solver.evolve(&field, spacing, 0.0, 0.5, 1).is_err());
            assert!(solver.evolve(&field, spacing, -1.0, 0.5, 1).is_err());
            assert!(solver.evolve(&field, vec2(0.0, 1.0), 0.5, 0.5, 1).is_err());
            assert!(solver.evolve(&field, vec2(1.0, -2.0), 0.5, 0.5, 1).is_err());
            assert!(solver.evolve(&Array::zeros((0, 4)), spacing, 0.5, 0.5, 1).is_err());
        }
    }
}
