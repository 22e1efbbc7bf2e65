mod convert;
mod gray;
mod hsv;
mod lab;

pub use convert::{convert_color, ColorSpace, ConvertedImage};
pub use gray::{bgr_from_rgb, gray_from_rgb, gray_from_rgb_u8, rgb_from_gray};
pub use hsv::hsv_from_rgb_u8;
pub use lab::{lab_from_rgb_u8, lab_from_srgb_pixel, rgb_from_lab_u8, srgb_from_lab_pixel};
