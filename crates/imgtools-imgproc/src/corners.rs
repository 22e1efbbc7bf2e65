use imgtools_image::{Image, ImageDtype, ImageError};

use crate::{
    filter::{gaussian_blur, spatial_gradient},
    parallel,
    utils::check_same_size,
};

/// A detected corner point with its response.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Corner {
    /// The x-coordinate of the corner in the image.
    pub x: usize,
    /// The y-coordinate of the corner in the image.
    pub y: usize,
    /// The Harris response at the corner.
    pub response: f32,
}

/// Parameters of [`detect_corners`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CornerConfig {
    /// Maximum number of corners returned, 0 for no limit.
    pub max_corners: usize,
    /// Fraction of the strongest response a corner must exceed, in `(0, 1]`.
    pub quality_level: f32,
    /// Minimum euclidean distance between returned corners.
    pub min_distance: f32,
    /// Harris detector free parameter.
    pub k: f32,
}

impl Default for CornerConfig {
    fn default() -> Self {
        Self {
            max_corners: 100,
            quality_level: 0.01,
            min_distance: 10.0,
            k: 0.04,
        }
    }
}

/// Compute the Harris corner response.
///
/// The structure tensor is built from 3x3 Sobel derivatives and weighted with a
/// 7x7 gaussian window (sigma 1). The response `det - k * trace^2` is clamped at
/// zero, so edges and flat areas read 0.
///
/// # Arguments
///
/// * `src` - The grayscale source image.
/// * `dst` - The response image.
/// * `k` - Harris detector free parameter, typically 0.04 to 0.06.
pub fn harris_response<T: ImageDtype>(
    src: &Image<T, 1>,
    dst: &mut Image<f32, 1>,
    k: f32,
) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    let size = src.size();
    let mut dx = Image::<f32, 1>::from_size_val(size, 0.0)?;
    let mut dy = Image::<f32, 1>::from_size_val(size, 0.0)?;
    spatial_gradient(src, &mut dx, &mut dy, 3)?;

    // tensor products, normalized by the sobel gain
    let mut dx2 = Image::<f32, 1>::from_size_val(size, 0.0)?;
    let mut dy2 = Image::<f32, 1>::from_size_val(size, 0.0)?;
    let mut dxy = Image::<f32, 1>::from_size_val(size, 0.0)?;
    parallel::par_iter_rows_val_two(&dx, &dx, &mut dx2, |&a, &b, o| *o = a * b / 64.0);
    parallel::par_iter_rows_val_two(&dy, &dy, &mut dy2, |&a, &b, o| *o = a * b / 64.0);
    parallel::par_iter_rows_val_two(&dx, &dy, &mut dxy, |&a, &b, o| *o = a * b / 64.0);

    let mut dx2_blurred = Image::<f32, 1>::from_size_val(size, 0.0)?;
    let mut dy2_blurred = Image::<f32, 1>::from_size_val(size, 0.0)?;
    let mut dxy_blurred = Image::<f32, 1>::from_size_val(size, 0.0)?;
    gaussian_blur(&dx2, &mut dx2_blurred, (7, 7), (1.0, 1.0))?;
    gaussian_blur(&dy2, &mut dy2_blurred, (7, 7), (1.0, 1.0))?;
    gaussian_blur(&dxy, &mut dxy_blurred, (7, 7), (1.0, 1.0))?;

    let (xx, yy, xy) = (
        dx2_blurred.as_slice(),
        dy2_blurred.as_slice(),
        dxy_blurred.as_slice(),
    );
    let cols = src.cols();

    parallel::par_iter_rows_indexed(dst, |row, dst_row| {
        for (col, out) in dst_row.iter_mut().enumerate() {
            let i = row * cols + col;
            let det = xx[i] * yy[i] - xy[i] * xy[i];
            let trace = xx[i] + yy[i];
            *out = f32::max(0.0, det - k * trace * trace);
        }
    });

    Ok(())
}

/// Detect the strongest Harris corners of an image.
///
/// Candidates are 3x3 local maxima of the response above `quality_level` times the
/// strongest response. They are accepted from the strongest down, skipping any
/// closer than `min_distance` to an accepted corner.
///
/// # Returns
///
/// The corners sorted by decreasing response.
pub fn detect_corners<T: ImageDtype>(
    src: &Image<T, 1>,
    config: &CornerConfig,
) -> Result<Vec<Corner>, ImageError> {
    let quality = config.quality_level;
    if quality.is_nan() || quality <= 0.0 || quality > 1.0 {
        return Err(ImageError::invalid_parameter(
            "quality_level",
            format!("must be in (0, 1], got {quality}"),
        ));
    }
    if config.min_distance < 0.0 {
        return Err(ImageError::invalid_parameter(
            "min_distance",
            format!("must be non negative, got {}", config.min_distance),
        ));
    }

    let mut response = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    harris_response(src, &mut response, config.k)?;

    let (rows, cols) = (src.rows(), src.cols());
    let data = response.as_slice();
    let max_response = data.iter().copied().fold(0.0f32, f32::max);
    let threshold = quality * max_response;

    let is_local_max = |x: usize, y: usize, v: f32| {
        for ny in y.saturating_sub(1)..(y + 2).min(rows) {
            for nx in x.saturating_sub(1)..(x + 2).min(cols) {
                if data[ny * cols + nx] > v {
                    return false;
                }
            }
        }
        true
    };

    let mut candidates = Vec::new();
    for y in 0..rows {
        for x in 0..cols {
            let v = data[y * cols + x];
            if v > 0.0 && v >= threshold && is_local_max(x, y, v) {
                candidates.push(Corner { x, y, response: v });
            }
        }
    }
    candidates.sort_by(|a, b| b.response.total_cmp(&a.response));

    let min_dist2 = config.min_distance * config.min_distance;
    let mut corners: Vec<Corner> = Vec::new();
    for c in candidates {
        if config.max_corners > 0 && corners.len() == config.max_corners {
            break;
        }
        let far_enough = corners.iter().all(|a| {
            let (dx, dy) = (a.x as f32 - c.x as f32, a.y as f32 - c.y as f32);
            dx * dx + dy * dy >= min_dist2
        });
        if far_enough {
            corners.push(c);
        }
    }

    log::debug!(
        "detected {} corners above response {threshold}",
        corners.len()
    );

    Ok(corners)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_image() -> Result<Image<u8, 1>, ImageError> {
        let mut img = Image::<u8, 1>::from_size_val([20, 20].into(), 0)?;
        for y in 6..=13 {
            for x in 6..=13 {
                img.set_pixel(x, y, 0, 255)?;
            }
        }
        Ok(img)
    }

    #[test]
    fn test_harris_response_flat() -> Result<(), ImageError> {
        let flat = Image::<f32, 1>::from_size_val([8, 8].into(), 3.0)?;
        let mut dst = Image::<f32, 1>::from_size_val(flat.size(), 1.0)?;
        harris_response(&flat, &mut dst, 0.04)?;
        assert!(dst.as_slice().iter().all(|&v| v == 0.0));
        Ok(())
    }

    #[test]
    fn test_harris_response_square() -> Result<(), ImageError> {
        let img = square_image()?;
        let mut dst = Image::<f32, 1>::from_size_val(img.size(), 0.0)?;
        harris_response(&img, &mut dst, 0.04)?;

        // corners respond, the middle of an edge does not
        let corner = *dst.get_pixel(6, 6, 0)?;
        assert!(corner > 0.0);
        assert_eq!(*dst.get_pixel(10, 6, 0)?, 0.0);
        assert!(*dst.get_pixel(10, 10, 0)? < 0.01 * corner);
        Ok(())
    }

    #[test]
    fn test_detect_corners() -> Result<(), ImageError> {
        let img = square_image()?;
        let config = CornerConfig {
            min_distance: 5.0,
            ..Default::default()
        };
        let corners = detect_corners(&img, &config)?;
        assert_eq!(corners.len(), 4);

        for (cx, cy) in [(6, 6), (13, 6), (6, 13), (13, 13)] {
            assert!(
                corners
                    .iter()
                    .any(|c| c.x.abs_diff(cx) <= 2 && c.y.abs_diff(cy) <= 2),
                "no corner near ({cx}, {cy})"
            );
        }
        assert!(corners.windows(2).all(|w| w[0].response >= w[1].response));

        let limited = detect_corners(
            &img,
            &CornerConfig {
                max_corners: 2,
                ..config
            },
        )?;
        assert_eq!(limited.len(), 2);

        assert!(detect_corners(
            &img,
            &CornerConfig {
                quality_level: 0.0,
                ..config
            }
        )
        .is_err());
        Ok(())
    }
}
