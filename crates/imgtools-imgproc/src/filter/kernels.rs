use imgtools_image::ImageError;

/// Create a box blur kernel.
///
/// # Arguments
///
/// * `kernel_size` - The size of the kernel.
///
/// # Returns
///
/// A vector of the kernel.
pub fn box_blur_kernel_1d(kernel_size: usize) -> Vec<f32> {
    vec![1.0 / kernel_size as f32; kernel_size]
}

/// Sigma derived from the kernel size when none is given:
///
/// sigma = 0.3 * ((kernel_size - 1) * 0.5 - 1) + 0.8
pub fn gaussian_sigma_from_size(kernel_size: usize) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Create a gaussian blur kernel.
///
/// # Arguments
///
/// * `kernel_size` - The size of the kernel.
/// * `sigma` - The sigma of the gaussian kernel. Values `<= 0` pick the fixed
///   binomial kernels for sizes 1, 3, 5 and 7, and otherwise derive sigma from the
///   size with [`gaussian_sigma_from_size`].
///
/// # Returns
///
/// A normalized vector of the kernel.
pub fn gaussian_kernel_1d(kernel_size: usize, sigma: f32) -> Vec<f32> {
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        if let Some(kernel) = small_gaussian_kernel(kernel_size) {
            return kernel;
        }
        let sigma = gaussian_sigma_from_size(kernel_size);
        log::debug!("gaussian kernel of size {kernel_size}: derived sigma {sigma}");
        sigma
    };

    let mean = (kernel_size as f32 - 1.0) / 2.0;
    let sigma_sq = sigma * sigma;

    let mut kernel = (0..kernel_size)
        .map(|i| {
            let x = i as f32 - mean;
            (-(x * x) / (2.0 * sigma_sq)).exp()
        })
        .collect::<Vec<_>>();

    // normalize the kernel
    let norm = kernel.iter().sum::<f32>();
    kernel.iter_mut().for_each(|k| *k /= norm);
    kernel
}

// binomial approximations used when no sigma is given
fn small_gaussian_kernel(kernel_size: usize) -> Option<Vec<f32>> {
    match kernel_size {
        1 => Some(vec![1.0]),
        3 => Some(vec![0.25, 0.5, 0.25]),
        5 => Some(vec![0.0625, 0.25, 0.375, 0.25, 0.0625]),
        7 => Some(vec![
            0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125,
        ]),
        _ => None,
    }
}

/// Create the separable parts of a sobel kernel.
///
/// # Arguments
///
/// * `kernel_size` - The size of the kernel, 3 or 5.
///
/// # Returns
///
/// The derivative and smoothing 1d kernels.
///
/// # Errors
///
/// Returns [`ImageError::InvalidKernelSize`] for other sizes.
pub fn sobel_kernel_1d(kernel_size: usize) -> Result<(Vec<f32>, Vec<f32>), ImageError> {
    match kernel_size {
        3 => Ok((vec![-1.0, 0.0, 1.0], vec![1.0, 2.0, 1.0])),
        5 => Ok((
            vec![-1.0, -2.0, 0.0, 2.0, 1.0],
            vec![1.0, 4.0, 6.0, 4.0, 1.0],
        )),
        _ => Err(ImageError::InvalidKernelSize(kernel_size)),
    }
}

/// 3x3 laplacian kernel, row major.
pub fn laplacian_kernel() -> [f32; 9] {
    [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0]
}

/// 3x3 sharpening kernel, row major.
pub fn sharpen_kernel() -> [f32; 9] {
    [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0]
}

/// 3x3 emboss kernel lighting from the bottom right, row major.
pub fn emboss_kernel() -> [f32; 9] {
    [-2.0, -1.0, 0.0, -1.0, 1.0, 1.0, 0.0, 1.0, 2.0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sobel_kernel_1d() -> Result<(), ImageError> {
        let kernel = sobel_kernel_1d(3)?;
        assert_eq!(kernel.0, vec![-1.0, 0.0, 1.0]);
        assert_eq!(kernel.1, vec![1.0, 2.0, 1.0]);

        let kernel = sobel_kernel_1d(5)?;
        assert_eq!(kernel.0, vec![-1.0, -2.0, 0.0, 2.0, 1.0]);
        assert_eq!(kernel.1, vec![1.0, 4.0, 6.0, 4.0, 1.0]);

        assert_eq!(sobel_kernel_1d(7), Err(ImageError::InvalidKernelSize(7)));
        Ok(())
    }

    #[test]
    fn test_gaussian_kernel_1d() {
        let kernel = gaussian_kernel_1d(5, 0.5);

        let expected = [
            0.00026386508,
            0.10645077,
            0.78657067,
            0.10645077,
            0.00026386508,
        ];

        for (k, e) in kernel.iter().zip(expected.iter()) {
            approx::assert_relative_eq!(k, e, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_gaussian_kernel_auto_sigma() {
        approx::assert_relative_eq!(gaussian_sigma_from_size(5), 1.1, epsilon = 1e-6);

        // sizes up to 7 use the fixed binomial kernels
        assert_eq!(gaussian_kernel_1d(3, 0.0), vec![0.25, 0.5, 0.25]);
        assert_eq!(
            gaussian_kernel_1d(5, 0.0),
            vec![0.0625, 0.25, 0.375, 0.25, 0.0625]
        );
        let kernel = gaussian_kernel_1d(7, -1.0);
        approx::assert_relative_eq!(kernel[3], 0.28125, epsilon = 1e-6);
        approx::assert_relative_eq!(kernel.iter().sum::<f32>(), 1.0, epsilon = 1e-6);

        // an explicit sigma still samples the gaussian
        approx::assert_relative_eq!(gaussian_kernel_1d(5, 1.1)[2], 0.36955, epsilon = 1e-4);

        let auto = gaussian_kernel_1d(9, 0.0);
        let explicit = gaussian_kernel_1d(9, gaussian_sigma_from_size(9));
        for (a, e) in auto.iter().zip(explicit.iter()) {
            approx::assert_relative_eq!(a, e, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_kernel_sums() {
        assert_eq!(laplacian_kernel().iter().sum::<f32>(), 0.0);
        assert_eq!(sharpen_kernel().iter().sum::<f32>(), 1.0);
        assert_eq!(emboss_kernel().iter().sum::<f32>(), 1.0);
        assert_eq!(box_blur_kernel_1d(4), vec![0.25; 4]);
    }
}
