//! Differencing, thresholding and connected-component labelling.

use ndarray::{Array2, ArrayView2, ArrayView3, Zip};

/// Per-pixel absolute difference of two intensity images of equal shape.
///
/// # Panics
///
/// Panics if the shapes differ; callers check geometry first.
pub fn abs_diff(a: ArrayView2<u8>, b: ArrayView2<u8>) -> Array2<u8> {
    Zip::from(a).and(b).map_collect(|&x, &y| x.abs_diff(y))
}

/// Binary mask of pixels strictly above `threshold`.
pub fn apply_threshold(image: ArrayView2<u8>, threshold: u8) -> Array2<bool> {
    image.mapv(|v| v > threshold)
}

/// Binary mask of pixels whose three channels all fall within the inclusive
/// `[lower, upper]` bounds.
pub fn in_range(image: ArrayView3<u8>, lower: [u8; 3], upper: [u8; 3]) -> Array2<bool> {
    let (rows, cols, _) = image.dim();
    Array2::from_shape_fn((rows, cols), |(y, x)| {
        (0..3).all(|c| {
            let v = image[[y, x, c]];
            v >= lower[c] && v <= upper[c]
        })
    })
}

/// Label 8-connected foreground components with a flood fill.
///
/// Returns the label image (0 is background, components are `1..=count`)
/// and the number of components.
pub fn connected_components(mask: ArrayView2<bool>) -> (Array2<u32>, u32) {
    let (rows, cols) = mask.dim();
    let mut labels = Array2::zeros((rows, cols));
    let mut label_counter = 0;

    let neighbors: [(isize, isize); 8] = [
        (-1, -1),
        (-1, 0),
        (-1, 1),
        (0, -1),
        (0, 1),
        (1, -1),
        (1, 0),
        (1, 1),
    ];

    let mut stack = Vec::new();
    for i in 0..rows {
        for j in 0..cols {
            if !mask[[i, j]] || labels[[i, j]] != 0 {
                continue;
            }

            label_counter += 1;
            labels[[i, j]] = label_counter;
            stack.push((i, j));

            while let Some((r, c)) = stack.pop() {
                for (dr, dc) in neighbors {
                    let nr = r as isize + dr;
                    let nc = c as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    if mask[[nr, nc]] && labels[[nr, nc]] == 0 {
                        labels[[nr, nc]] = label_counter;
                        stack.push((nr, nc));
                    }
                }
            }
        }
    }

    (labels, label_counter)
}

/// Fill background pockets enclosed by foreground.
///
/// Background pixels reachable from the image border through 4-connected
/// background stay background; everything else becomes foreground. The
/// result is the area enclosed by each region's outer contour, which is what
/// region areas and moments are measured on.
pub fn fill_holes(mask: ArrayView2<bool>) -> Array2<bool> {
    let (rows, cols) = mask.dim();
    let mut outside = Array2::from_elem((rows, cols), false);
    let mut stack = Vec::new();

    let seed = |r: usize, c: usize, outside: &mut Array2<bool>, stack: &mut Vec<(usize, usize)>| {
        if !mask[[r, c]] && !outside[[r, c]] {
            outside[[r, c]] = true;
            stack.push((r, c));
        }
    };

    for c in 0..cols {
        seed(0, c, &mut outside, &mut stack);
        if rows > 1 {
            seed(rows - 1, c, &mut outside, &mut stack);
        }
    }
    for r in 0..rows {
        seed(r, 0, &mut outside, &mut stack);
        if cols > 1 {
            seed(r, cols - 1, &mut outside, &mut stack);
        }
    }

    while let Some((r, c)) = stack.pop() {
        let candidates = [
            (r.wrapping_sub(1), c),
            (r + 1, c),
            (r, c.wrapping_sub(1)),
            (r, c + 1),
        ];
        for (nr, nc) in candidates {
            if nr < rows && nc < cols && !mask[[nr, nc]] && !outside[[nr, nc]] {
                outside[[nr, nc]] = true;
                stack.push((nr, nc));
            }
        }
    }

    outside.mapv(|o| !o)
}
