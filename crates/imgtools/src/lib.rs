#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use imgtools_image as image;

#[doc(inline)]
pub use imgtools_imgproc as imgproc;
