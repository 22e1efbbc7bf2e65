use imgtools_image::{Image, ImageDtype, ImageError};

use crate::{
    border::BorderMode,
    parallel,
    utils::{check_odd_kernel, check_same_size},
};

/// Convolve an image with a dense 2D kernel using reflect-101 borders.
///
/// The kernel is applied as a correlation, i.e. not flipped.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel` - Row major kernel weights.
/// * `kernel_size` - The size of the kernel (width, height), both odd.
///
/// # Example
///
/// ```
/// use imgtools_image::Image;
/// use imgtools_imgproc::filter::{filter2d, kernels};
///
/// let image = Image::<u8, 1>::from_size_val([4, 4].into(), 10).unwrap();
/// let mut dst = Image::<u8, 1>::from_size_val(image.size(), 0).unwrap();
///
/// filter2d(&image, &mut dst, &kernels::sharpen_kernel(), (3, 3)).unwrap();
/// assert_eq!(dst.as_slice(), image.as_slice());
/// ```
pub fn filter2d<T, U, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<U, C>,
    kernel: &[f32],
    kernel_size: (usize, usize),
) -> Result<(), ImageError>
where
    T: ImageDtype,
    U: ImageDtype,
{
    let (kw, kh) = kernel_size;
    check_odd_kernel(kw)?;
    check_odd_kernel(kh)?;
    if kernel.len() != kw * kh {
        return Err(ImageError::invalid_parameter(
            "kernel",
            format!("expected {} weights for a {kw}x{kh} kernel, got {}", kw * kh, kernel.len()),
        ));
    }
    check_same_size(src, dst)?;

    let (rows, cols) = (src.rows(), src.cols());
    let (hw, hh) = ((kw / 2) as isize, (kh / 2) as isize);
    let border = BorderMode::Reflect101;
    let data = src.as_slice();

    // reflected column index for every (column, tap)
    let cols_map: Vec<usize> = (0..cols)
        .flat_map(|x| (0..kw).map(move |k| (x as isize, k as isize - hw)))
        .map(|(x, off)| border.map_index(x + off, cols).unwrap_or(0))
        .collect();

    parallel::par_iter_rows_indexed(dst, |y, dst_row| {
        let mut acc = vec![0.0f32; cols * C];
        for ky in 0..kh {
            let sy = border
                .map_index(y as isize + ky as isize - hh, rows)
                .unwrap_or(0);
            let src_row = &data[sy * cols * C..(sy + 1) * cols * C];
            let weights = &kernel[ky * kw..(ky + 1) * kw];

            for (x, out) in acc.chunks_exact_mut(C).enumerate() {
                for (&w, &sx) in weights.iter().zip(&cols_map[x * kw..(x + 1) * kw]) {
                    for (ch, o) in out.iter_mut().enumerate() {
                        *o += src_row[sx * C + ch].to_f32() * w;
                    }
                }
            }
        }
        for (d, a) in dst_row.iter_mut().zip(acc) {
            *d = U::from_f32(a);
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::filter2d;
    use crate::filter::kernels;
    use imgtools_image::{Image, ImageError};

    #[test]
    fn filter2d_laplacian_impulse() -> Result<(), ImageError> {
        let mut img = Image::<f32, 1>::from_size_val([5, 5].into(), 0.0)?;
        img.set_pixel(2, 2, 0, 1.0)?;
        let mut dst = Image::<f32, 1>::from_size_val(img.size(), 0.0)?;

        filter2d(&img, &mut dst, &kernels::laplacian_kernel(), (3, 3))?;

        #[rustfmt::skip]
        assert_eq!(
            dst.as_slice(),
            &[
                0.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 1.0, 0.0, 0.0,
                0.0, 1.0, -4.0, 1.0, 0.0,
                0.0, 0.0, 1.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0,
            ]
        );
        Ok(())
    }

    #[test]
    fn filter2d_is_correlation() -> Result<(), ImageError> {
        let img = Image::<f32, 1>::new([3, 1].into(), vec![0.0, 1.0, 0.0])?;
        let mut dst = Image::<f32, 1>::from_size_val(img.size(), 0.0)?;

        // weights are read left to right without flipping
        filter2d(&img, &mut dst, &[1.0, 2.0, 3.0], (3, 1))?;
        assert_eq!(dst.as_slice(), &[4.0, 2.0, 4.0]);
        Ok(())
    }

    #[test]
    fn filter2d_wrong_kernel() -> Result<(), ImageError> {
        let img = Image::<u8, 1>::from_size_val([3, 3].into(), 0)?;
        let mut dst = img.clone();
        assert!(filter2d(&img, &mut dst, &[1.0; 8], (3, 3)).is_err());
        assert_eq!(
            filter2d(&img, &mut dst, &[1.0; 6], (3, 2)),
            Err(ImageError::InvalidKernelSize(2))
        );
        Ok(())
    }
}
