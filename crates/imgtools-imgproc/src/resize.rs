use crate::interpolation::{interpolate_pixel, InterpolationMode};
use crate::parallel;
use imgtools_image::{Image, ImageDtype, ImageError, ImageSize};

// source coordinate of the center of every output pixel
fn center_positions(src_len: usize, dst_len: usize) -> Vec<f32> {
    let scale = src_len as f32 / dst_len as f32;
    (0..dst_len)
        .map(|i| (i as f32 + 0.5) * scale - 0.5)
        .collect()
}

// source pixel whose area contains the top left corner of every output pixel
fn nearest_positions(src_len: usize, dst_len: usize) -> Vec<f32> {
    let scale = src_len as f32 / dst_len as f32;
    let last = src_len.saturating_sub(1) as f32;
    (0..dst_len)
        .map(|i| (i as f32 * scale).floor().min(last))
        .collect()
}

// (source index, weight) pairs per output pixel along one axis. Shrinking
// weights every source pixel by its overlap with the output pixel, growing
// falls back to linear weights around the pixel center.
fn area_taps(src_len: usize, dst_len: usize) -> Vec<Vec<(usize, f32)>> {
    let scale = src_len as f32 / dst_len as f32;
    let last = src_len - 1;

    (0..dst_len)
        .map(|i| {
            if scale <= 1.0 {
                let pos = ((i as f32 + 0.5) * scale - 0.5).clamp(0.0, last as f32);
                let j0 = pos.floor() as usize;
                let j1 = (j0 + 1).min(last);
                let frac = pos - j0 as f32;
                return vec![(j0, 1.0 - frac), (j1, frac)];
            }

            let start = i as f32 * scale;
            let end = (i as f32 + 1.0) * scale;
            let first = start.floor() as usize;
            let stop = (end.ceil() as usize).min(src_len);
            (first..stop)
                .filter_map(|j| {
                    let overlap = end.min(j as f32 + 1.0) - start.max(j as f32);
                    (overlap > 0.0).then_some((j, overlap / scale))
                })
                .collect()
        })
        .collect()
}

fn resize_area<T: ImageDtype, const C: usize>(src: &Image<T, C>, dst: &mut Image<T, C>) {
    let taps_x = area_taps(src.width(), dst.width());
    let taps_y = area_taps(src.height(), dst.height());
    let (cols, data) = (src.cols(), src.as_slice());

    parallel::par_iter_rows_indexed(dst, |y, dst_row| {
        for (dst_pixel, tx) in dst_row.chunks_exact_mut(C).zip(taps_x.iter()) {
            for (k, pixel) in dst_pixel.iter_mut().enumerate() {
                let mut acc = 0.0;
                for &(sy, wy) in &taps_y[y] {
                    for &(sx, wx) in tx {
                        acc += wy * wx * data[(sy * cols + sx) * C + k].to_f32();
                    }
                }
                *pixel = T::from_f32(acc);
            }
        }
    });
}

/// Resize an image to a new size.
///
/// The function resizes an image to the size of `dst` using the specified interpolation mode.
/// It supports any number of channels and data types.
///
/// Output pixel centers map onto source pixel centers, so `i` samples the source at
/// `(i + 0.5) * src / dst - 0.5`. [`InterpolationMode::Area`] averages every source
/// pixel covered by an output pixel and is the right choice when shrinking.
///
/// # Arguments
///
/// * `src` - The input image container.
/// * `dst` - The output image container.
/// * `interpolation` - The interpolation mode to use.
///
/// # Example
///
/// ```
/// use imgtools_image::{Image, ImageSize};
/// use imgtools_imgproc::resize::resize_native;
/// use imgtools_imgproc::interpolation::InterpolationMode;
///
/// let image = Image::<_, 3>::new(
///     ImageSize {
///         width: 4,
///         height: 5,
///     },
///     vec![0f32; 4 * 5 * 3],
/// )
/// .unwrap();
///
/// let new_size = ImageSize {
///     width: 2,
///     height: 3,
/// };
///
/// let mut image_resized = Image::<_, 3>::from_size_val(new_size, 0.0).unwrap();
///
/// resize_native(
///     &image,
///     &mut image_resized,
///     InterpolationMode::Nearest,
/// )
/// .unwrap();
///
/// assert_eq!(image_resized.num_channels(), 3);
/// assert_eq!(image_resized.size().width, 2);
/// assert_eq!(image_resized.size().height, 3);
/// ```
pub fn resize_native<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    interpolation: InterpolationMode,
) -> Result<(), ImageError> {
    crate::utils::check_not_empty(src)?;
    if dst.is_empty() {
        return Ok(());
    }

    let (xs, ys) = match interpolation {
        InterpolationMode::Area => {
            resize_area(src, dst);
            return Ok(());
        }
        InterpolationMode::Bilinear => (
            center_positions(src.width(), dst.width()),
            center_positions(src.height(), dst.height()),
        ),
        InterpolationMode::Nearest => (
            nearest_positions(src.width(), dst.width()),
            nearest_positions(src.height(), dst.height()),
        ),
    };

    parallel::par_iter_rows_indexed(dst, |y, dst_row| {
        let v = ys[y];
        for (dst_pixel, &u) in dst_row.chunks_exact_mut(C).zip(xs.iter()) {
            for (k, pixel) in dst_pixel.iter_mut().enumerate() {
                *pixel = T::from_f32(interpolate_pixel(src, u, v, k, interpolation));
            }
        }
    });

    Ok(())
}

/// Compute an aspect preserving target size.
///
/// When `width` is given the height follows from it, otherwise `height`
/// drives the width. With neither the size is returned unchanged.
///
/// # Example
///
/// ```
/// use imgtools_image::ImageSize;
/// use imgtools_imgproc::resize::aspect_size;
///
/// let size = ImageSize { width: 400, height: 300 };
/// assert_eq!(aspect_size(size, Some(200), None), ImageSize { width: 200, height: 150 });
/// assert_eq!(aspect_size(size, None, Some(600)), ImageSize { width: 800, height: 600 });
/// ```
pub fn aspect_size(size: ImageSize, width: Option<usize>, height: Option<usize>) -> ImageSize {
    match (width, height) {
        (Some(width), _) if size.width > 0 => ImageSize {
            width,
            height: size.height * width / size.width,
        },
        (None, Some(height)) if size.height > 0 => ImageSize {
            width: size.width * height / size.height,
            height,
        },
        _ => size,
    }
}

/// Scale both dimensions of a size by `factor`, truncating to whole pixels.
///
/// # Errors
///
/// The factor must be positive and finite.
pub fn scale_size(size: ImageSize, factor: f32) -> Result<ImageSize, ImageError> {
    if !(factor > 0.0 && factor.is_finite()) {
        return Err(ImageError::invalid_parameter(
            "factor",
            format!("must be positive and finite, got {factor}"),
        ));
    }

    Ok(ImageSize {
        width: (size.width as f32 * factor) as usize,
        height: (size.height as f32 * factor) as usize,
    })
}

#[cfg(test)]
mod tests {
    use imgtools_image::{Image, ImageError, ImageSize};

    #[test]
    fn resize_smoke_ch3() -> Result<(), ImageError> {
        let image = Image::<_, 3>::new(
            ImageSize {
                width: 4,
                height: 5,
            },
            vec![0f32; 4 * 5 * 3],
        )?;

        let new_size = ImageSize {
            width: 2,
            height: 3,
        };

        let mut image_resized = Image::<_, 3>::from_size_val(new_size, 0.0)?;

        super::resize_native(
            &image,
            &mut image_resized,
            super::InterpolationMode::Bilinear,
        )?;

        assert_eq!(image_resized.num_channels(), 3);
        assert_eq!(image_resized.size().width, 2);
        assert_eq!(image_resized.size().height, 3);
        Ok(())
    }

    #[test]
    fn resize_upscale_bilinear() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::new([2, 1].into(), vec![0, 100])?;
        let mut resized = Image::<u8, 1>::from_size_val([5, 2].into(), 0)?;

        super::resize_native(&image, &mut resized, super::InterpolationMode::Bilinear)?;

        assert_eq!(resized.as_slice(), &[0, 10, 50, 90, 100, 0, 10, 50, 90, 100]);

        let mut resized = Image::<u8, 1>::from_size_val([4, 1].into(), 0)?;
        super::resize_native(&image, &mut resized, super::InterpolationMode::Bilinear)?;
        assert_eq!(resized.as_slice(), &[0, 25, 75, 100]);
        Ok(())
    }

    #[test]
    fn resize_downscale_nearest() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::new([4, 1].into(), vec![1, 2, 3, 4])?;
        let mut resized = Image::<u8, 1>::from_size_val([2, 1].into(), 0)?;

        super::resize_native(&image, &mut resized, super::InterpolationMode::Nearest)?;

        assert_eq!(resized.as_slice(), &[1, 3]);
        Ok(())
    }

    #[test]
    fn resize_downscale_bilinear_centers() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::new([4, 1].into(), vec![0, 100, 200, 255])?;
        let mut resized = Image::<u8, 1>::from_size_val([2, 1].into(), 0)?;

        super::resize_native(&image, &mut resized, super::InterpolationMode::Bilinear)?;

        assert_eq!(resized.as_slice(), &[50, 228]);
        Ok(())
    }

    #[test]
    fn resize_downscale_area() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::new([4, 1].into(), vec![0, 100, 200, 255])?;
        let mut resized = Image::<u8, 1>::from_size_val([2, 1].into(), 0)?;
        super::resize_native(&image, &mut resized, super::InterpolationMode::Area)?;
        // pairs of pixels are averaged
        assert_eq!(resized.as_slice(), &[50, 228]);

        #[rustfmt::skip]
        let image = Image::<f32, 1>::new(
            [4, 4].into(),
            vec![
                0.0, 2.0, 10.0, 10.0,
                4.0, 6.0, 10.0, 30.0,
                1.0, 1.0, 0.0, 0.0,
                1.0, 1.0, 0.0, 8.0,
            ],
        )?;
        let mut resized = Image::<f32, 1>::from_size_val([2, 2].into(), 0.0)?;
        super::resize_native(&image, &mut resized, super::InterpolationMode::Area)?;
        assert_eq!(resized.as_slice(), &[3.0, 15.0, 1.0, 2.0]);

        // fractional coverage: 3 -> 2 weights the middle pixel by half
        let image = Image::<f32, 1>::new([3, 1].into(), vec![0.0, 30.0, 60.0])?;
        let mut resized = Image::<f32, 1>::from_size_val([2, 1].into(), 0.0)?;
        super::resize_native(&image, &mut resized, super::InterpolationMode::Area)?;
        approx::assert_relative_eq!(resized.as_slice()[0], 10.0, epsilon = 1e-4);
        approx::assert_relative_eq!(resized.as_slice()[1], 50.0, epsilon = 1e-4);
        Ok(())
    }

    #[test]
    fn target_sizes() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 300,
            height: 200,
        };
        assert_eq!(super::aspect_size(size, None, None), size);
        assert_eq!(
            super::aspect_size(size, Some(150), Some(999)),
            ImageSize {
                width: 150,
                height: 100
            }
        );
        assert_eq!(
            super::scale_size(size, 0.5)?,
            ImageSize {
                width: 150,
                height: 100
            }
        );
        assert!(super::scale_size(size, 0.0).is_err());
        Ok(())
    }
}
