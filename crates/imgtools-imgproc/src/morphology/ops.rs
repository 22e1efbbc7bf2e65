use std::str::FromStr;

use super::kernels::Kernel;
use crate::{parallel, utils::check_same_size};
use imgtools_image::{Image, ImageDtype, ImageError};

/// Compound morphological operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MorphOp {
    /// Erosion followed by dilation.
    Open,
    /// Dilation followed by erosion.
    Close,
    /// Dilation minus erosion.
    Gradient,
    /// Source minus its opening.
    TopHat,
    /// Closing minus the source.
    BlackHat,
}

impl MorphOp {
    const NAMES: [&'static str; 5] = ["open", "close", "gradient", "tophat", "blackhat"];
}

impl FromStr for MorphOp {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "close" => Ok(Self::Close),
            "gradient" => Ok(Self::Gradient),
            "tophat" => Ok(Self::TopHat),
            "blackhat" => Ok(Self::BlackHat),
            _ => Err(ImageError::unknown_option(
                "morphological operation",
                s,
                &Self::NAMES,
            )),
        }
    }
}

// single pass keeping the extreme value selected by `pick` over the kernel support
fn morph_once<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    offsets: &[(isize, isize)],
    pick: impl Fn(T, T) -> T + Send + Sync,
) where
    T: ImageDtype,
{
    let (rows, cols) = (src.rows() as isize, src.cols() as isize);
    let data = src.as_slice();

    parallel::par_iter_rows_indexed(dst, |y, dst_row| {
        for (x, out) in dst_row.chunks_exact_mut(C).enumerate() {
            let base = (y * cols as usize + x) * C;
            out.copy_from_slice(&data[base..base + C]);

            let mut first = true;
            for &(dx, dy) in offsets {
                let (sx, sy) = (x as isize + dx, y as isize + dy);
                // pixels outside the image never win
                if sx < 0 || sy < 0 || sx >= cols || sy >= rows {
                    continue;
                }
                let idx = (sy * cols + sx) as usize * C;
                for (o, &v) in out.iter_mut().zip(&data[idx..idx + C]) {
                    *o = if first { v } else { pick(*o, v) };
                }
                first = false;
            }
        }
    });
}

fn morph<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    kernel: &Kernel,
    iterations: usize,
    pick: impl Fn(T, T) -> T + Send + Sync + Copy,
) -> Result<(), ImageError>
where
    T: ImageDtype,
{
    check_same_size(src, dst)?;

    dst.as_slice_mut().copy_from_slice(src.as_slice());
    if iterations == 0 {
        return Ok(());
    }

    let offsets = kernel.offsets();
    morph_once(src, dst, &offsets, pick);

    let mut temp = dst.clone();
    for _ in 1..iterations {
        temp.as_slice_mut().copy_from_slice(dst.as_slice());
        morph_once(&temp, dst, &offsets, pick);
    }

    Ok(())
}

fn min_val<T: PartialOrd>(a: T, b: T) -> T {
    if b < a {
        b
    } else {
        a
    }
}

fn max_val<T: PartialOrd>(a: T, b: T) -> T {
    if b > a {
        b
    } else {
        a
    }
}

/// Erode an image using a [`Kernel`].
///
/// Erosion shrinks bright regions in the image. Each pixel is replaced
/// by the minimum value in the neighborhood defined by the kernel.
/// Neighbors outside the image are ignored.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image (will be overwritten).
/// * `kernel` - The morphological structuring element ([`Kernel`]).
/// * `iterations` - How many times the erosion is applied. Zero copies `src`.
///
/// # Example
///
/// ```
/// use imgtools_image::Image;
/// use imgtools_imgproc::morphology::{erode, Kernel};
///
/// let image = Image::<u8, 1>::new([5, 1].into(), vec![0, 255, 255, 255, 0]).unwrap();
/// let mut eroded = Image::<u8, 1>::from_size_val(image.size(), 0).unwrap();
///
/// erode(&image, &mut eroded, &Kernel::rect(3, 1).unwrap(), 1).unwrap();
/// assert_eq!(eroded.as_slice(), &[0, 0, 255, 0, 0]);
/// ```
pub fn erode<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    kernel: &Kernel,
    iterations: usize,
) -> Result<(), ImageError> {
    morph(src, dst, kernel, iterations, min_val)
}

/// Dilate an image using a [`Kernel`].
///
/// Dilation expands bright regions in the image. Each pixel is replaced
/// by the maximum value in the neighborhood defined by the kernel.
/// Neighbors outside the image are ignored.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image (will be overwritten).
/// * `kernel` - The morphological structuring element ([`Kernel`]).
/// * `iterations` - How many times the dilation is applied. Zero copies `src`.
pub fn dilate<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    kernel: &Kernel,
    iterations: usize,
) -> Result<(), ImageError> {
    morph(src, dst, kernel, iterations, max_val)
}

/// Apply a compound morphological operation.
///
/// Erosion and dilation steps are each repeated `iterations` times. The
/// differences of [`MorphOp::Gradient`], [`MorphOp::TopHat`] and
/// [`MorphOp::BlackHat`] saturate at zero for integer images.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image (will be overwritten).
/// * `op` - The operation to apply.
/// * `kernel` - The morphological structuring element ([`Kernel`]).
/// * `iterations` - Repetitions of every erosion and dilation.
pub fn morphology_ex<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    op: MorphOp,
    kernel: &Kernel,
    iterations: usize,
) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    let mut temp = Image::<T, C>::from_size_val(src.size(), T::default())?;

    match op {
        MorphOp::Open => {
            erode(src, &mut temp, kernel, iterations)?;
            dilate(&temp, dst, kernel, iterations)?;
        }
        MorphOp::Close => {
            dilate(src, &mut temp, kernel, iterations)?;
            erode(&temp, dst, kernel, iterations)?;
        }
        MorphOp::Gradient => {
            let mut eroded = temp.clone();
            dilate(src, &mut temp, kernel, iterations)?;
            erode(src, &mut eroded, kernel, iterations)?;
            difference(&temp, &eroded, dst);
        }
        MorphOp::TopHat => {
            let mut opened = temp.clone();
            morphology_ex(src, &mut opened, MorphOp::Open, kernel, iterations)?;
            difference(src, &opened, dst);
        }
        MorphOp::BlackHat => {
            let mut closed = temp.clone();
            morphology_ex(src, &mut closed, MorphOp::Close, kernel, iterations)?;
            difference(&closed, src, dst);
        }
    }

    Ok(())
}

fn difference<T: ImageDtype, const C: usize>(
    a: &Image<T, C>,
    b: &Image<T, C>,
    dst: &mut Image<T, C>,
) {
    parallel::par_iter_rows_val_two(a, b, dst, |&a, &b, out| {
        *out = T::from_f32(a.to_f32() - b.to_f32());
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    fn square_with_speck() -> Result<Image<u8, 1>, ImageError> {
        Image::new(
            [7, 7].into(),
            vec![
                255, 0, 0, 0, 0, 0, 0,
                0, 0, 0, 0, 0, 0, 0,
                0, 0, 255, 255, 255, 0, 0,
                0, 0, 255, 255, 255, 0, 0,
                0, 0, 255, 255, 255, 0, 0,
                0, 0, 0, 0, 0, 0, 0,
                0, 0, 0, 0, 0, 0, 0,
            ],
        )
    }

    #[test]
    fn test_erode_dilate() -> Result<(), ImageError> {
        let img = square_with_speck()?;
        let kernel = Kernel::rect(3, 3)?;

        let mut eroded = Image::<u8, 1>::from_size_val(img.size(), 0)?;
        erode(&img, &mut eroded, &kernel, 1)?;
        let on = eroded.as_slice().iter().filter(|&&v| v == 255).count();
        assert_eq!(on, 1);
        assert_eq!(*eroded.get_pixel(3, 3, 0)?, 255);

        let mut dilated = Image::<u8, 1>::from_size_val(img.size(), 0)?;
        dilate(&img, &mut dilated, &kernel, 1)?;
        // 5x5 block plus the corner around the speck, sharing pixel (1, 1)
        let on = dilated.as_slice().iter().filter(|&&v| v == 255).count();
        assert_eq!(on, 25 + 3);

        dilate(&img, &mut dilated, &kernel, 0)?;
        assert_eq!(dilated.as_slice(), img.as_slice());
        Ok(())
    }

    #[test]
    fn test_iterations() -> Result<(), ImageError> {
        let mut img = Image::<u8, 1>::from_size_val([9, 9].into(), 0)?;
        img.set_pixel(4, 4, 0, 200)?;
        let kernel = Kernel::cross(3, 3)?;

        let mut once = Image::<u8, 1>::from_size_val(img.size(), 0)?;
        let mut twice = once.clone();
        dilate(&img, &mut once, &kernel, 1)?;
        dilate(&img, &mut twice, &kernel, 2)?;

        let count = |im: &Image<u8, 1>| im.as_slice().iter().filter(|&&v| v == 200).count();
        assert_eq!(count(&once), 5);
        assert_eq!(count(&twice), 13);
        Ok(())
    }

    #[test]
    fn test_morphology_ex() -> Result<(), ImageError> {
        let img = square_with_speck()?;
        let kernel = Kernel::rect(3, 3)?;
        let mut dst = Image::<u8, 1>::from_size_val(img.size(), 0)?;

        // opening removes the speck and keeps the square
        morphology_ex(&img, &mut dst, MorphOp::Open, &kernel, 1)?;
        assert_eq!(*dst.get_pixel(0, 0, 0)?, 0);
        assert_eq!(
            dst.as_slice().iter().filter(|&&v| v == 255).count(),
            9
        );

        // top hat keeps only what opening removed
        morphology_ex(&img, &mut dst, MorphOp::TopHat, &kernel, 1)?;
        assert_eq!(*dst.get_pixel(0, 0, 0)?, 255);
        assert_eq!(dst.as_slice().iter().filter(|&&v| v != 0).count(), 1);

        morphology_ex(&img, &mut dst, MorphOp::Gradient, &kernel, 1)?;
        assert_eq!(*dst.get_pixel(3, 3, 0)?, 0);
        assert_eq!(*dst.get_pixel(2, 2, 0)?, 255);

        // closing fills a one pixel hole
        let mut holed = Image::<u8, 1>::from_size_val([5, 5].into(), 255)?;
        holed.set_pixel(2, 2, 0, 0)?;
        let mut closed = holed.clone();
        morphology_ex(&holed, &mut closed, MorphOp::Close, &kernel, 1)?;
        assert!(closed.as_slice().iter().all(|&v| v == 255));

        morphology_ex(&holed, &mut closed, MorphOp::BlackHat, &kernel, 1)?;
        assert_eq!(*closed.get_pixel(2, 2, 0)?, 255);
        assert_eq!(closed.as_slice().iter().filter(|&&v| v != 0).count(), 1);
        Ok(())
    }

    #[test]
    fn test_morph_op_from_str() {
        assert_eq!("TopHat".parse::<MorphOp>(), Ok(MorphOp::TopHat));
        assert_eq!("close".parse::<MorphOp>(), Ok(MorphOp::Close));
        assert!(matches!(
            "thin".parse::<MorphOp>(),
            Err(ImageError::UnknownOption { .. })
        ));
    }
}
