use imgtools_image::{Image, ImageDtype, ImageError, ImageSize};
use rayon::{iter::ParallelIterator, slice::ParallelSliceMut};
use rustfft::{num_complex::Complex32, FftDirection, FftPlanner};

/// A centered 2D spectrum.
///
/// The zero frequency sits at `(rows / 2, cols / 2)`, the layout produced by
/// an `fftshift` of the raw transform. Coefficients are stored row major.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    size: ImageSize,
    data: Vec<Complex32>,
}

impl Spectrum {
    /// The size of the spectrum, equal to the size of the transformed image.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// The coefficients in row major order.
    pub fn as_slice(&self) -> &[Complex32] {
        &self.data
    }

    /// Mutable access to the coefficients.
    pub fn as_slice_mut(&mut self) -> &mut [Complex32] {
        &mut self.data
    }

    /// The coefficient at column `x` and row `y`.
    pub fn get(&self, x: usize, y: usize) -> Option<Complex32> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.data.get(y * self.size.width + x).copied()
    }

    /// Multiply every coefficient by the matching mask value.
    ///
    /// # Errors
    ///
    /// The mask must have the size of the spectrum.
    pub fn apply_mask(&mut self, mask: &Image<f32, 1>) -> Result<(), ImageError> {
        check_spectrum_size(self.size, mask.size())?;
        self.data
            .iter_mut()
            .zip(mask.as_slice())
            .for_each(|(coeff, &m)| *coeff *= m);
        Ok(())
    }
}

fn check_spectrum_size(expected: ImageSize, actual: ImageSize) -> Result<(), ImageError> {
    if expected != actual {
        return Err(ImageError::InvalidImageSize(
            actual.width,
            actual.height,
            expected.width,
            expected.height,
        ));
    }
    Ok(())
}

// in place 2d transform: rows first, then columns through a transposed buffer
fn fft2d(data: &mut [Complex32], rows: usize, cols: usize, direction: FftDirection) {
    let mut planner = FftPlanner::<f32>::new();

    let row_fft = planner.plan_fft(cols, direction);
    data.par_chunks_exact_mut(cols)
        .for_each(|row| row_fft.process(row));

    let mut transposed = vec![Complex32::default(); rows * cols];
    transpose(data, &mut transposed, rows, cols);

    let col_fft = planner.plan_fft(rows, direction);
    transposed
        .par_chunks_exact_mut(rows)
        .for_each(|col| col_fft.process(col));

    transpose(&transposed, data, cols, rows);
}

fn transpose(src: &[Complex32], dst: &mut [Complex32], rows: usize, cols: usize) {
    for y in 0..rows {
        for x in 0..cols {
            dst[x * rows + y] = src[y * cols + x];
        }
    }
}

/// Compute the centered 2D Fourier transform of a single channel image.
///
/// # Errors
///
/// Returns [`ImageError::EmptyImage`] for images without pixels.
///
/// # Example
///
/// ```
/// use imgtools_image::Image;
/// use imgtools_imgproc::frequency::compute_fft;
///
/// let image = Image::<f32, 1>::from_size_val([4, 4].into(), 1.0).unwrap();
/// let spectrum = compute_fft(&image).unwrap();
///
/// // all the energy of a flat image is in the centered DC term
/// assert_eq!(spectrum.get(2, 2).unwrap().re, 16.0);
/// ```
pub fn compute_fft<T: ImageDtype>(src: &Image<T, 1>) -> Result<Spectrum, ImageError> {
    crate::utils::check_not_empty(src)?;

    let (rows, cols) = (src.rows(), src.cols());
    let mut buffer = src
        .as_slice()
        .iter()
        .map(|v| Complex32::new(v.to_f32(), 0.0))
        .collect::<Vec<_>>();

    fft2d(&mut buffer, rows, cols, FftDirection::Forward);

    // fftshift
    let mut data = vec![Complex32::default(); rows * cols];
    for y in 0..rows {
        let sy = (y + rows / 2) % rows;
        for x in 0..cols {
            let sx = (x + cols / 2) % cols;
            data[sy * cols + sx] = buffer[y * cols + x];
        }
    }

    Ok(Spectrum {
        size: src.size(),
        data,
    })
}

/// Invert a centered spectrum back to the spatial domain.
///
/// Only the real part of the inverse transform is kept.
///
/// # Errors
///
/// The destination must have the size of the spectrum.
pub fn inverse_fft(spectrum: &Spectrum, dst: &mut Image<f32, 1>) -> Result<(), ImageError> {
    check_spectrum_size(spectrum.size, dst.size())?;

    let (rows, cols) = (spectrum.size.height, spectrum.size.width);
    if rows * cols == 0 {
        return Ok(());
    }

    // ifftshift
    let mut buffer = vec![Complex32::default(); rows * cols];
    for y in 0..rows {
        let sy = (y + rows / 2) % rows;
        for x in 0..cols {
            let sx = (x + cols / 2) % cols;
            buffer[y * cols + x] = spectrum.data[sy * cols + sx];
        }
    }

    fft2d(&mut buffer, rows, cols, FftDirection::Inverse);

    let norm = (rows * cols) as f32;
    dst.as_slice_mut()
        .iter_mut()
        .zip(buffer.iter())
        .for_each(|(out, coeff)| *out = coeff.re / norm);

    Ok(())
}

/// Log magnitude `ln(1 + |F|)` of a spectrum, suitable for display.
pub fn magnitude_spectrum(spectrum: &Spectrum, dst: &mut Image<f32, 1>) -> Result<(), ImageError> {
    check_spectrum_size(spectrum.size, dst.size())?;

    dst.as_slice_mut()
        .iter_mut()
        .zip(spectrum.data.iter())
        .for_each(|(out, coeff)| *out = coeff.norm().ln_1p());

    Ok(())
}

fn check_positive(name: &'static str, value: f32) -> Result<(), ImageError> {
    if value.is_nan() || value <= 0.0 {
        return Err(ImageError::invalid_parameter(
            name,
            format!("must be positive, got {value}"),
        ));
    }
    Ok(())
}

// evaluate `low_pass` over the distance to the spectrum center
fn radial_mask(
    size: ImageSize,
    high_pass: bool,
    low_pass: impl Fn(f32) -> f32,
) -> Result<Image<f32, 1>, ImageError> {
    let (cx, cy) = ((size.width / 2) as f32, (size.height / 2) as f32);

    let mut data = Vec::with_capacity(size.area());
    for y in 0..size.height {
        let dy = y as f32 - cy;
        for x in 0..size.width {
            let dx = x as f32 - cx;
            let value = low_pass((dx * dx + dy * dy).sqrt());
            data.push(if high_pass { 1.0 - value } else { value });
        }
    }

    Image::new(size, data)
}

/// Create an ideal frequency mask.
///
/// The low pass mask is 1 where the distance to the center is at most
/// `radius` and 0 elsewhere. The high pass mask is its complement.
///
/// # Errors
///
/// Returns [`ImageError::InvalidParameter`] when `radius` is not positive.
pub fn create_ideal_filter(
    size: ImageSize,
    radius: f32,
    high_pass: bool,
) -> Result<Image<f32, 1>, ImageError> {
    check_positive("radius", radius)?;
    radial_mask(size, high_pass, |d| if d <= radius { 1.0 } else { 0.0 })
}

/// Create a butterworth frequency mask `1 / (1 + (D / cutoff)^(2 * order))`.
///
/// # Errors
///
/// Returns [`ImageError::InvalidParameter`] for a non positive cutoff or a zero order.
pub fn create_butterworth_filter(
    size: ImageSize,
    cutoff: f32,
    order: u32,
    high_pass: bool,
) -> Result<Image<f32, 1>, ImageError> {
    check_positive("cutoff", cutoff)?;
    if order == 0 {
        return Err(ImageError::invalid_parameter(
            "order",
            "must be at least 1",
        ));
    }

    let exponent = 2.0 * order as f32;
    radial_mask(size, high_pass, |d| {
        1.0 / (1.0 + (d / cutoff).powf(exponent))
    })
}

/// Create a gaussian frequency mask `exp(-D^2 / (2 * sigma^2))`.
///
/// # Errors
///
/// Returns [`ImageError::InvalidParameter`] when `sigma` is not positive.
pub fn create_gaussian_filter(
    size: ImageSize,
    sigma: f32,
    high_pass: bool,
) -> Result<Image<f32, 1>, ImageError> {
    check_positive("sigma", sigma)?;
    let denom = 2.0 * sigma * sigma;
    radial_mask(size, high_pass, |d| (-(d * d) / denom).exp())
}

/// Filter an image in the frequency domain.
///
/// Every channel is transformed, multiplied by `mask` and transformed back.
///
/// # Arguments
///
/// * `src` - The input image.
/// * `mask` - A centered frequency mask with the size of the image.
/// * `dst` - The filtered image.
///
/// # Errors
///
/// The mask and the destination must have the size of `src`.
pub fn apply_fft_filter<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    mask: &Image<f32, 1>,
    dst: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    crate::utils::check_same_size(src, mask)?;
    crate::utils::check_same_size(src, dst)?;

    let mut filtered = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    for c in 0..C {
        let mut spectrum = compute_fft(&src.channel(c)?)?;
        spectrum.apply_mask(mask)?;
        inverse_fft(&spectrum, &mut filtered)?;

        dst.as_slice_mut()
            .chunks_exact_mut(C)
            .zip(filtered.as_slice())
            .for_each(|(pixel, &v)| pixel[c] = v);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fft_round_trip() -> Result<(), ImageError> {
        #[rustfmt::skip]
        let image = Image::<f32, 1>::new(
            [4, 3].into(),
            vec![
                1.0, 2.0, 3.0, 4.0,
                0.5, 9.0, 7.0, 2.0,
                8.0, 0.0, 1.0, 6.0,
            ],
        )?;

        let spectrum = compute_fft(&image)?;
        let mut restored = Image::<f32, 1>::from_size_val(image.size(), 0.0)?;
        inverse_fft(&spectrum, &mut restored)?;

        for (a, b) in restored.as_slice().iter().zip(image.as_slice()) {
            approx::assert_relative_eq!(a, b, epsilon = 1e-4);
        }
        Ok(())
    }

    #[test]
    fn fft_dc_is_centered() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::from_size_val([5, 4].into(), 2)?;
        let spectrum = compute_fft(&image)?;

        for y in 0..4 {
            for x in 0..5 {
                let coeff = spectrum.get(x, y).ok_or(ImageError::EmptyImage)?;
                let expected = if (x, y) == (2, 2) { 40.0 } else { 0.0 };
                approx::assert_relative_eq!(coeff.re, expected, epsilon = 1e-4);
                approx::assert_relative_eq!(coeff.im, 0.0, epsilon = 1e-4);
            }
        }

        let mut magnitude = Image::<f32, 1>::from_size_val(image.size(), 0.0)?;
        magnitude_spectrum(&spectrum, &mut magnitude)?;
        approx::assert_relative_eq!(*magnitude.get_pixel(2, 2, 0)?, 41f32.ln(), epsilon = 1e-4);
        approx::assert_relative_eq!(*magnitude.get_pixel(0, 0, 0)?, 0.0, epsilon = 1e-4);
        Ok(())
    }

    #[test]
    fn ideal_masks() -> Result<(), ImageError> {
        let low = create_ideal_filter([5, 5].into(), 1.0, false)?;
        #[rustfmt::skip]
        assert_eq!(
            low.as_slice(),
            &[
                0.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 1.0, 0.0, 0.0,
                0.0, 1.0, 1.0, 1.0, 0.0,
                0.0, 0.0, 1.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0,
            ]
        );

        let high = create_ideal_filter([5, 5].into(), 1.0, true)?;
        for (l, h) in low.as_slice().iter().zip(high.as_slice()) {
            assert_eq!(l + h, 1.0);
        }

        assert!(create_ideal_filter([5, 5].into(), 0.0, false).is_err());
        Ok(())
    }

    #[test]
    fn smooth_masks() -> Result<(), ImageError> {
        let butterworth = create_butterworth_filter([9, 9].into(), 2.0, 2, false)?;
        approx::assert_relative_eq!(*butterworth.get_pixel(4, 4, 0)?, 1.0);
        approx::assert_relative_eq!(*butterworth.get_pixel(6, 4, 0)?, 0.5, epsilon = 1e-6);

        let gaussian = create_gaussian_filter([9, 9].into(), 2.0, true)?;
        approx::assert_relative_eq!(*gaussian.get_pixel(4, 4, 0)?, 0.0);
        approx::assert_relative_eq!(
            *gaussian.get_pixel(4, 6, 0)?,
            1.0 - (-0.5f32).exp(),
            epsilon = 1e-6
        );

        assert!(create_butterworth_filter([9, 9].into(), 2.0, 0, false).is_err());
        assert!(create_gaussian_filter([9, 9].into(), -1.0, false).is_err());
        Ok(())
    }

    #[test]
    fn apply_dc_only_filter() -> Result<(), ImageError> {
        let image = Image::<u8, 2>::new(
            [4, 4].into(),
            (0..32).map(|v| (v % 2) as u8 * 10 + (v / 2) as u8).collect(),
        )?;
        let mask = create_ideal_filter(image.size(), 0.5, false)?;
        let mut dst = Image::<f32, 2>::from_size_val(image.size(), 0.0)?;

        apply_fft_filter(&image, &mask, &mut dst)?;

        // only the mean of each channel survives
        for pixel in dst.as_slice().chunks_exact(2) {
            approx::assert_relative_eq!(pixel[0], 7.5, epsilon = 1e-4);
            approx::assert_relative_eq!(pixel[1], 17.5, epsilon = 1e-4);
        }

        let small_mask = create_ideal_filter([3, 3].into(), 1.0, false)?;
        assert!(apply_fft_filter(&image, &small_mask, &mut dst).is_err());
        Ok(())
    }
}
