//! Intensity enhancement: brightness, contrast, gamma and histogram equalization.

mod adjust;
mod clahe;
mod equalize;

pub use adjust::{
    add_weighted, adjust_brightness, adjust_brightness_contrast, adjust_contrast,
    convert_scale_abs, gamma_correction,
};
pub use clahe::Clahe;
pub use equalize::{auto_contrast, equalize_histogram};
