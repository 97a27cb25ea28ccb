//! Binary morphology with square structuring elements.
//!
//! A `size x size` square element is anchored at `size / 2`. Pixels beyond
//! the image border are ignored, so erosion does not eat in from the edges
//! and dilation does not grow in from them. A square element is separable,
//! so each pass runs as a row sweep followed by a column sweep.

use ndarray::{Array2, ArrayView2, Axis};

#[derive(Clone, Copy)]
enum Op {
    Erode,
    Dilate,
}

fn sweep(mask: ArrayView2<bool>, size: usize, axis: Axis, op: Op) -> Array2<bool> {
    let (rows, cols) = mask.dim();
    let anchor = size / 2;
    let len = if axis == Axis(1) { cols } else { rows };

    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let pos = if axis == Axis(1) { c } else { r };
        let start = pos.saturating_sub(anchor);
        let end = (pos + size - anchor).min(len);
        let mut window = (start..end).map(|i| {
            if axis == Axis(1) {
                mask[[r, i]]
            } else {
                mask[[i, c]]
            }
        });
        match op {
            Op::Erode => window.all(|v| v),
            Op::Dilate => window.any(|v| v),
        }
    })
}

fn apply(mask: ArrayView2<bool>, size: usize, iterations: usize, op: Op) -> Array2<bool> {
    let mut out = mask.to_owned();
    if size <= 1 {
        return out;
    }
    for _ in 0..iterations {
        let rows = sweep(out.view(), size, Axis(1), op);
        out = sweep(rows.view(), size, Axis(0), op);
    }
    out
}

/// Erode `iterations` times with a `size x size` square.
pub fn erode(mask: ArrayView2<bool>, size: usize, iterations: usize) -> Array2<bool> {
    apply(mask, size, iterations, Op::Erode)
}

/// Dilate `iterations` times with a `size x size` square.
pub fn dilate(mask: ArrayView2<bool>, size: usize, iterations: usize) -> Array2<bool> {
    apply(mask, size, iterations, Op::Dilate)
}

/// Erosion followed by dilation; removes specks smaller than the element.
pub fn open(mask: ArrayView2<bool>, size: usize) -> Array2<bool> {
    dilate(erode(mask, size, 1).view(), size, 1)
}

/// Dilation followed by erosion; bridges gaps narrower than the element.
pub fn close(mask: ArrayView2<bool>, size: usize) -> Array2<bool> {
    erode(dilate(mask, size, 1).view(), size, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_mask(size: usize, x0: usize, y0: usize, side: usize) -> Array2<bool> {
        Array2::from_shape_fn((size, size), |(r, c)| {
            r >= y0 && r < y0 + side && c >= x0 && c < x0 + side
        })
    }

    fn count(mask: &Array2<bool>) -> usize {
        mask.iter().filter(|&&v| v).count()
    }

    #[test]
    fn erode_shrinks_and_dilate_grows_by_anchor() {
        let mask = square_mask(20, 5, 5, 6);
        assert_eq!(count(&erode(mask.view(), 3, 1)), 16);
        assert_eq!(count(&dilate(mask.view(), 3, 1)), 64);
        assert_eq!(count(&dilate(mask.view(), 3, 2)), 100);
    }

    #[test]
    fn open_removes_specks_but_keeps_blocks() {
        let mut mask = square_mask(30, 10, 10, 8);
        mask[[2, 2]] = true;
        mask[[25, 3]] = true;

        let opened = open(mask.view(), 5);
        assert!(!opened[[2, 2]]);
        assert!(!opened[[25, 3]]);
        assert_eq!(opened, square_mask(30, 10, 10, 8));
    }

    #[test]
    fn close_bridges_narrow_gap() {
        let mut mask = square_mask(30, 5, 10, 6);
        for r in 10..16 {
            for c in 13..19 {
                mask[[r, c]] = true;
            }
        }
        // columns 11 and 12 are empty between the two blocks
        assert!(!mask[[12, 11]]);
        let closed = close(mask.view(), 5);
        assert!(closed[[12, 11]]);
        assert!(closed[[12, 12]]);
    }

    #[test]
    fn border_pixels_survive_erosion() {
        let mask = Array2::from_elem((6, 6), true);
        assert_eq!(erode(mask.view(), 5, 1), mask);
    }

    #[test]
    fn unit_kernel_is_identity() {
        let mask = square_mask(10, 2, 2, 3);
        assert_eq!(erode(mask.view(), 1, 3), mask);
        assert_eq!(dilate(mask.view(), 0, 3), mask);
    }
}
