use imgtools_image::{Image, ImageError};

/// Fail with [`ImageError::InvalidImageSize`] unless both images share a size.
pub(crate) fn check_same_size<T1, const C1: usize, T2, const C2: usize>(
    src: &Image<T1, C1>,
    dst: &Image<T2, C2>,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }
    Ok(())
}

/// Fail with [`ImageError::InvalidKernelSize`] unless the size is odd and non zero.
pub(crate) fn check_odd_kernel(kernel_size: usize) -> Result<(), ImageError> {
    if kernel_size == 0 || kernel_size % 2 == 0 {
        return Err(ImageError::InvalidKernelSize(kernel_size));
    }
    Ok(())
}

/// Fail with [`ImageError::EmptyImage`] for images without pixels.
pub(crate) fn check_not_empty<T, const C: usize>(src: &Image<T, C>) -> Result<(), ImageError> {
    if src.is_empty() {
        return Err(ImageError::EmptyImage);
    }
    Ok(())
}
