#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// border extrapolation modes.
pub mod border;

/// color transformations module.
pub mod color;

/// contour extraction and shape analysis module.
pub mod contours;

/// image basic operations module.
pub mod core;

/// corner detection module.
pub mod corners;

/// image cropping module.
pub mod crop;

/// edge detection module.
pub mod edges;

/// image enhancement module.
pub mod enhance;

/// image filtering module.
pub mod filter;

/// frequency domain filtering module.
pub mod frequency;

/// compute image histogram module.
pub mod histogram;

/// utilities for interpolation.
pub mod interpolation;

/// morphological operations module.
pub mod morphology;

/// module containing parallization utilities.
pub mod parallel;

/// utility functions for resizing images.
pub mod resize;

/// image segmentation module.
pub mod segmentation;

/// operations to threshold images.
pub mod threshold;

/// image geometric transformations module.
pub mod warp;

mod utils;
