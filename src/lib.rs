//! Explicit finite-difference solver for the 2D heat equation.
//!
//! [`d2::default_field`] builds the initial temperature grid,
//! [`d2::estimate_dt`] picks the largest stable time step and
//! [`d2::evolve`] / [`d2::evolve_par`] step the field forward.

pub mod d2;
mod error;

pub use error::{Error, Result};
