//! Image preparation: format normalization and size reduction
//!
//! Every selected file runs through the same chain before it reaches a
//! slot or collection:
//! 1. Normalize - make sure it is PNG or JPEG
//! 2. Reduce - shrink it if it is over the size threshold

mod batch;
mod normalize;
mod reduce;

pub use batch::{prepare_batch, prepare_file, BatchOutcome, DroppedFile, Prepared};
pub use normalize::{normalize, normalize_blocking};
pub use reduce::{
    reduce_if_large, reduce_if_large_blocking, ReduceOptions, ReduceOutcome, Reduced,
    CATALOG_MAX_DIMENSION, DEFAULT_TARGET_BYTES, DEFAULT_THRESHOLD_BYTES, STANDARD_MAX_DIMENSION,
};
