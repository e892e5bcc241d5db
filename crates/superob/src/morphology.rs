//! Morphological filters on 2-D grids.

use ndarray::Array2;

/// Maximum over a `size` × `size` window.
///
/// The window spans offsets `-size/2 ..= size - 1 - size/2` around each cell.
/// Windows are clipped at the grid edge, which gives the same result as
/// reflecting the boundary.
pub fn maximum_filter(a: &Array2<f32>, size: usize) -> Array2<f32> {
    if size <= 1 {
        return a.clone();
    }
    let (ny, nx) = a.dim();
    let lo = size / 2;
    let hi = size - 1 - lo;

    // Separable: rows first, then columns.
    let mut rows = Array2::from_elem((ny, nx), f32::NEG_INFINITY);
    for j in 0..ny {
        for i in 0..nx {
            let start = i.saturating_sub(lo);
            let end = (i + hi).min(nx - 1);
            let mut m = f32::NEG_INFINITY;
            for ii in start..=end {
                m = m.max(a[[j, ii]]);
            }
            rows[[j, i]] = m;
        }
    }

    let mut out = Array2::from_elem((ny, nx), f32::NEG_INFINITY);
    for j in 0..ny {
        let start = j.saturating_sub(lo);
        let end = (j + hi).min(ny - 1);
        for i in 0..nx {
            let mut m = f32::NEG_INFINITY;
            for jj in start..=end {
                m = m.max(rows[[jj, i]]);
            }
            out[[j, i]] = m;
        }
    }
    out
}
