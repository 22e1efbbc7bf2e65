use imgtools_image::ImageError;

/// A morphological structuring element.
///
/// The kernel defines the neighborhood used by erosion and dilation. It stores a
/// binary mask where 1 marks the pixels taking part in the operation, anchored at
/// the kernel center.
///
/// # Example
///
/// ```rust
/// use imgtools_imgproc::morphology::Kernel;
///
/// // Create a 3x3 box kernel
/// let kernel = Kernel::rect(3, 3).unwrap();
/// assert_eq!(kernel.width(), 3);
/// assert_eq!(kernel.height(), 3);
/// assert_eq!(kernel.pad(), (1, 1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

fn check_kernel_dims(width: usize, height: usize) -> Result<(), ImageError> {
    if width == 0 {
        return Err(ImageError::InvalidKernelSize(width));
    }
    if height == 0 {
        return Err(ImageError::InvalidKernelSize(height));
    }
    Ok(())
}

impl Kernel {
    /// Create a kernel from a row major 0/1 mask.
    pub fn from_mask(data: Vec<u8>, width: usize, height: usize) -> Result<Self, ImageError> {
        check_kernel_dims(width, height)?;
        if data.len() != width * height {
            return Err(ImageError::InvalidChannelShape(data.len(), width * height));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// A rectangle where every element is set.
    pub fn rect(width: usize, height: usize) -> Result<Self, ImageError> {
        check_kernel_dims(width, height)?;
        Ok(Self {
            data: vec![1; width * height],
            width,
            height,
        })
    }

    /// A cross made of the center row and the center column.
    pub fn cross(width: usize, height: usize) -> Result<Self, ImageError> {
        check_kernel_dims(width, height)?;
        let (cx, cy) = (width / 2, height / 2);
        let data = (0..height)
            .flat_map(|r| (0..width).map(move |c| u8::from(r == cy || c == cx)))
            .collect();
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// An ellipse inscribed in the `width x height` box.
    ///
    /// Kernels one pixel thin degenerate to a rectangle.
    ///
    /// Each row spans `round(cx * sqrt(1 - dy^2 / ry^2))` pixels on both sides of the
    /// center column.
    pub fn ellipse(width: usize, height: usize) -> Result<Self, ImageError> {
        check_kernel_dims(width, height)?;
        if width == 1 || height == 1 {
            return Self::rect(width, height);
        }
        let (cx, cy) = ((width / 2) as f64, (height / 2) as isize);
        let inv_r2 = 1.0 / (cy * cy) as f64;

        let mut data = vec![0u8; width * height];
        for (r, row) in data.chunks_exact_mut(width).enumerate() {
            let dy = r as isize - cy;
            if dy.abs() > cy {
                continue;
            }
            let dx = (cx * (((cy * cy - dy * dy) as f64) * inv_r2).sqrt()).round() as isize;
            let j1 = (cx as isize - dx).max(0) as usize;
            let j2 = ((cx as isize + dx + 1) as usize).min(width);
            row[j1..j2].fill(1);
        }

        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Get a reference to the kernel data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the width of the kernel.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get the height of the kernel.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get the padding for the kernel (offset from center) as (rows, cols).
    pub fn pad(&self) -> (usize, usize) {
        (self.height / 2, self.width / 2)
    }

    /// Offsets `(dx, dy)` of the set elements relative to the anchor.
    pub(crate) fn offsets(&self) -> Vec<(isize, isize)> {
        let (pad_h, pad_w) = self.pad();
        self.data
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v != 0)
            .map(|(i, _)| {
                (
                    (i % self.width) as isize - pad_w as isize,
                    (i / self.width) as isize - pad_h as isize,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_kernel() -> Result<(), ImageError> {
        let kernel = Kernel::rect(3, 3)?;
        assert_eq!(kernel.width(), 3);
        assert_eq!(kernel.height(), 3);
        assert!(kernel.data().iter().all(|&x| x == 1));
        assert_eq!(Kernel::rect(0, 3), Err(ImageError::InvalidKernelSize(0)));
        Ok(())
    }

    #[test]
    fn test_cross_kernel() -> Result<(), ImageError> {
        let kernel = Kernel::cross(3, 3)?;
        #[rustfmt::skip]
        assert_eq!(kernel.data(), &[
            0, 1, 0,
            1, 1, 1,
            0, 1, 0,
        ]);
        assert_eq!(kernel.offsets().len(), 5);
        Ok(())
    }

    #[test]
    fn test_ellipse_kernel() -> Result<(), ImageError> {
        let kernel = Kernel::ellipse(5, 5)?;
        #[rustfmt::skip]
        assert_eq!(kernel.data(), &[
            0, 0, 1, 0, 0,
            1, 1, 1, 1, 1,
            1, 1, 1, 1, 1,
            1, 1, 1, 1, 1,
            0, 0, 1, 0, 0,
        ]);

        let line = Kernel::ellipse(3, 1)?;
        assert_eq!(line.data(), &[1, 1, 1]);
        Ok(())
    }

    #[test]
    fn test_kernel_padding() -> Result<(), ImageError> {
        let kernel = Kernel::rect(5, 3)?;
        assert_eq!(kernel.pad(), (1, 2));
        assert_eq!(kernel.offsets()[0], (-2, -1));
        assert!(Kernel::from_mask(vec![1; 4], 3, 3).is_err());
        Ok(())
    }
}
