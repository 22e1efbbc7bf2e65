use imgtools_image::{Image, ImageError};

use crate::{filter::spatial_gradient, parallel, utils::check_same_size};

// quantized gradient direction, as the neighbor offset to compare against
fn direction_offset(gx: f32, gy: f32) -> (isize, isize) {
    let mut angle = gy.atan2(gx).to_degrees();
    if angle < 0.0 {
        angle += 180.0;
    }
    match angle {
        a if !(22.5..157.5).contains(&a) => (1, 0),
        a if a < 67.5 => (1, 1),
        a if a < 112.5 => (0, 1),
        _ => (-1, 1),
    }
}

/// Detect edges with the Canny algorithm.
///
/// The gradient is computed with a 3x3 Sobel operator, thinned by non-maximum
/// suppression and classified with a double threshold. Weak edges survive only
/// when connected (8-neighborhood) to a strong edge.
///
/// # Arguments
///
/// * `src` - The grayscale source image.
/// * `dst` - The edge map, 255 on edges and 0 elsewhere.
/// * `low_threshold` - Gradient magnitude above which a pixel is a weak edge.
/// * `high_threshold` - Gradient magnitude above which a pixel is a strong edge.
/// * `l2_gradient` - Use the euclidean magnitude instead of `|gx| + |gy|`.
///
/// # Errors
///
/// Fails when `low_threshold > high_threshold` or the sizes differ.
///
/// # Example
///
/// ```
/// use imgtools_image::Image;
/// use imgtools_imgproc::edges::canny;
///
/// let flat = Image::<u8, 1>::from_size_val([8, 8].into(), 42).unwrap();
/// let mut edges = Image::<u8, 1>::from_size_val(flat.size(), 0).unwrap();
///
/// canny(&flat, &mut edges, 50.0, 150.0, false).unwrap();
/// assert!(edges.as_slice().iter().all(|&v| v == 0));
/// ```
pub fn canny(
    src: &Image<u8, 1>,
    dst: &mut Image<u8, 1>,
    low_threshold: f32,
    high_threshold: f32,
    l2_gradient: bool,
) -> Result<(), ImageError> {
    if low_threshold > high_threshold {
        return Err(ImageError::invalid_parameter(
            "low_threshold",
            format!("{low_threshold} is greater than the high threshold {high_threshold}"),
        ));
    }
    check_same_size(src, dst)?;

    let (rows, cols) = (src.rows(), src.cols());
    let mut gx = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    let mut gy = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    spatial_gradient(src, &mut gx, &mut gy, 3)?;

    let mut magnitude = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    parallel::par_iter_rows_val_two(&gx, &gy, &mut magnitude, |&x, &y, m| {
        *m = if l2_gradient {
            (x * x + y * y).sqrt()
        } else {
            x.abs() + y.abs()
        };
    });

    // non-maximum suppression: 0 none, 1 weak, 2 strong
    let mag = magnitude.as_slice();
    let (gx, gy) = (gx.as_slice(), gy.as_slice());
    let at = |x: isize, y: isize| -> f32 {
        if x < 0 || y < 0 || x >= cols as isize || y >= rows as isize {
            0.0
        } else {
            mag[y as usize * cols + x as usize]
        }
    };

    let mut classes = Image::<u8, 1>::from_size_val(src.size(), 0)?;
    parallel::par_iter_rows_indexed(&mut classes, |y, row| {
        for (x, class) in row.iter_mut().enumerate() {
            let idx = y * cols + x;
            let m = mag[idx];
            if m <= low_threshold {
                continue;
            }
            let (ox, oy) = direction_offset(gx[idx], gy[idx]);
            let (xi, yi) = (x as isize, y as isize);
            if m > at(xi - ox, yi - oy) && m >= at(xi + ox, yi + oy) {
                *class = if m > high_threshold { 2 } else { 1 };
            }
        }
    });

    // hysteresis from every strong pixel
    let classes = classes.as_slice();
    let out = dst.as_slice_mut();
    out.fill(0);
    let mut stack = classes
        .iter()
        .enumerate()
        .filter(|&(_, &c)| c == 2)
        .map(|(i, _)| i)
        .collect::<Vec<_>>();
    for &i in &stack {
        out[i] = 255;
    }

    while let Some(i) = stack.pop() {
        let (x, y) = ((i % cols) as isize, (i / cols) as isize);
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= cols as isize || ny >= rows as isize {
                    continue;
                }
                let n = ny as usize * cols + nx as usize;
                if classes[n] == 1 && out[n] == 0 {
                    out[n] = 255;
                    stack.push(n);
                }
            }
        }
    }

    Ok(())
}
