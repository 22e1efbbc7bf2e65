//! Morphological operations: structuring elements, erosion, dilation and
//! the compound operations built from them.

mod kernels;
pub use kernels::Kernel;

mod ops;
pub use ops::{dilate, erode, morphology_ex, MorphOp};
