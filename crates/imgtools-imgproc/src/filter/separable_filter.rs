use imgtools_image::{Image, ImageDtype, ImageError};
use rayon::prelude::*;

use crate::{
    border::BorderMode,
    utils::{check_odd_kernel, check_same_size},
};

// source index for every (output position, tap) pair, None for skipped taps
fn tap_table(len: usize, kernel_len: usize, border: BorderMode) -> Vec<Option<usize>> {
    let half = (kernel_len / 2) as isize;
    (0..len)
        .flat_map(|i| (0..kernel_len).map(move |k| (i as isize, k as isize - half)))
        .map(|(i, off)| border.map_index(i + off, len))
        .collect()
}

/// A separable 2D filter that applies horizontal and vertical 1D convolutions sequentially.
///
/// This struct caches the kernel data and the border-resolved source offsets.
struct SeparableFilter<'a> {
    kernel_x: &'a [f32],
    kernel_y: &'a [f32],
    border: BorderMode,
}

impl SeparableFilter<'_> {
    /// Performs horizontal filtering followed by vertical filtering using a temporary buffer.
    fn apply<T, U, const C: usize>(&self, src: &Image<T, C>, dst: &mut Image<U, C>)
    where
        T: ImageDtype,
        U: ImageDtype,
    {
        let (rows, cols) = (src.rows(), src.cols());
        if cols == 0 || rows == 0 {
            return;
        }

        let (kx, ky) = (self.kernel_x.len(), self.kernel_y.len());
        let taps_x = tap_table(cols, kx, self.border);
        let taps_y = tap_table(rows, ky, self.border);

        let src_data = src.as_slice();
        let mut temp = vec![0.0f32; src_data.len()];

        // horizontal
        temp.par_chunks_exact_mut(cols * C)
            .zip(src_data.par_chunks_exact(cols * C))
            .for_each(|(temp_row, src_row)| {
                for (c, out) in temp_row.chunks_exact_mut(C).enumerate() {
                    let mut acc = [0.0f32; C];
                    for (&k, tap) in self.kernel_x.iter().zip(&taps_x[c * kx..(c + 1) * kx]) {
                        if let Some(x) = tap {
                            for (ch, a) in acc.iter_mut().enumerate() {
                                *a += src_row[x * C + ch].to_f32() * k;
                            }
                        }
                    }
                    out.copy_from_slice(&acc);
                }
            });

        // vertical
        dst.as_slice_mut()
            .par_chunks_exact_mut(cols * C)
            .enumerate()
            .for_each(|(r, dst_row)| {
                let mut acc = vec![0.0f32; cols * C];
                for (&k, tap) in self.kernel_y.iter().zip(&taps_y[r * ky..(r + 1) * ky]) {
                    if let Some(y) = tap {
                        let temp_row = &temp[y * cols * C..(y + 1) * cols * C];
                        for (a, &t) in acc.iter_mut().zip(temp_row) {
                            *a += t * k;
                        }
                    }
                }
                for (d, a) in dst_row.iter_mut().zip(acc) {
                    *d = U::from_f32(a);
                }
            });
    }
}

/// Apply a separable filter to an image with reflect-101 borders.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_x` - The horizontal kernel.
/// * `kernel_y` - The vertical kernel.
///
/// Integer destinations are rounded and saturated.
///
/// # Errors
///
/// Fails for kernels of even or zero length and for mismatching image sizes.
pub fn separable_filter<T, U, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<U, C>,
    kernel_x: &[f32],
    kernel_y: &[f32],
) -> Result<(), ImageError>
where
    T: ImageDtype,
    U: ImageDtype,
{
    separable_filter_with_border(src, dst, kernel_x, kernel_y, BorderMode::Reflect101)
}

/// Apply a separable filter to an image with the given border handling.
pub fn separable_filter_with_border<T, U, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<U, C>,
    kernel_x: &[f32],
    kernel_y: &[f32],
    border: BorderMode,
) -> Result<(), ImageError>
where
    T: ImageDtype,
    U: ImageDtype,
{
    check_odd_kernel(kernel_x.len())?;
    check_odd_kernel(kernel_y.len())?;
    check_same_size(src, dst)?;

    SeparableFilter {
        kernel_x,
        kernel_y,
        border,
    }
    .apply(src, dst);

    Ok(())
}
