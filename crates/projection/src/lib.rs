//! Coordinate reference system transformations.
//!
//! Implements the map projection used by the analysis grids from scratch
//! without external dependencies.

pub mod error;
pub mod lambert;

pub use error::{ProjectionError, Result};
pub use lambert::{Ellipsoid, LambertConformal};
