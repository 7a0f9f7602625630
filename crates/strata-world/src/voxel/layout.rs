//! Flat-array layout of a chunk's fields.
//!
//! Density lives on the `(N+1)^3` voxel corners so neighbouring chunks share their boundary plane;
//! material lives on the `N^3` cells. Both are x-fastest, then y, then z.

#[inline]
pub fn density_len(n: usize) -> usize {
    (n + 1) * (n + 1) * (n + 1)
}

#[inline]
pub fn material_len(n: usize) -> usize {
    n * n * n
}

#[inline]
pub fn density_index(x: usize, y: usize, z: usize, n: usize) -> usize {
    let s = n + 1;
    x + y * s + z * s * s
}

#[inline]
pub fn material_index(x: usize, y: usize, z: usize, n: usize) -> usize {
    x + y * n + z * n * n
}

/// `Some(local)` when signed local coordinates address a density corner (inclusive of `n`).
#[inline]
pub fn corner_in_bounds(x: i32, y: i32, z: i32, n: usize) -> Option<(usize, usize, usize)> {
    let n = n as i32;
    if (0..=n).contains(&x) && (0..=n).contains(&y) && (0..=n).contains(&z) {
        Some((x as usize, y as usize, z as usize))
    } else {
        None
    }
}

/// `Some(local)` when signed local coordinates address a material cell.
#[inline]
pub fn cell_in_bounds(x: i32, y: i32, z: i32, n: usize) -> Option<(usize, usize, usize)> {
    let n = n as i32;
    if (0..n).contains(&x) && (0..n).contains(&y) && (0..n).contains(&z) {
        Some((x as usize, y as usize, z as usize))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_index_fills_array() {
        for n in [8usize, 16, 32] {
            assert_eq!(density_index(n, n, n, n) + 1, density_len(n));
            assert_eq!(material_index(n - 1, n - 1, n - 1, n) + 1, material_len(n));
        }
    }

    #[test]
    fn bounds_are_inclusive_for_corners_only() {
        assert!(corner_in_bounds(8, 8, 8, 8).is_some());
        assert!(cell_in_bounds(8, 0, 0, 8).is_none());
        assert!(cell_in_bounds(7, 7, 7, 8).is_some());
        assert!(corner_in_bounds(-1, 0, 0, 8).is_none());
    }
}
