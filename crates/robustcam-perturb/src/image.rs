//! Image containers and layout helpers.
//!
//! Inputs are channel-last `(height, width, 3)` 8-bit arrays.  Every
//! primitive emits channel-first `(3, height, width)` output; downstream
//! consumers rely on that transposition.

use ndarray::{Array3, ArrayView3};
use robustcam_types::PerturbError;

/// A channel-last RGB image.
pub type Image = Array3<u8>;

/// Number of colour channels every image must carry.
pub const CHANNELS: usize = 3;

/// Check that `shape` describes a non-empty `(height, width, 3)` image.
pub fn validate_shape(shape: &[usize]) -> Result<(), PerturbError> {
    match shape {
        [h, w, CHANNELS] if *h > 0 && *w > 0 => Ok(()),
        _ => Err(PerturbError::InvalidImageShape {
            shape: shape.to_vec(),
        }),
    }
}

/// Validate a channel-last image view.
pub fn check_image(image: &ArrayView3<u8>) -> Result<(), PerturbError> {
    validate_shape(image.shape())
}

/// Build an [`Image`] from a raw buffer and an arbitrary-rank shape.
///
/// Rejects anything that is not exactly three dimensions with three channels,
/// or whose buffer length does not match the shape.
pub fn image_from_raw(shape: &[usize], data: Vec<u8>) -> Result<Image, PerturbError> {
    validate_shape(shape)?;
    Array3::from_shape_vec((shape[0], shape[1], shape[2]), data).map_err(|_| {
        PerturbError::InvalidImageShape {
            shape: shape.to_vec(),
        }
    })
}

/// `(h, w, c)` → `(c, h, w)` in standard memory order.
pub fn to_channel_first<T: Clone>(image: ArrayView3<T>) -> Array3<T> {
    image
        .permuted_axes([2, 0, 1])
        .as_standard_layout()
        .into_owned()
}

/// `(c, h, w)` → `(h, w, c)` in standard memory order.
pub fn to_channel_last<T: Clone>(image: ArrayView3<T>) -> Array3<T> {
    image
        .permuted_axes([1, 2, 0])
        .as_standard_layout()
        .into_owned()
}

/// Float → 8-bit conversion: truncate toward zero, saturate to `[0, 255]`.
#[inline]
pub(crate) fn saturate_u8(value: f32) -> u8 {
    // `as` truncates, saturates, and maps NaN to 0.
    value as u8
}

/// Output of a primitive.
///
/// Additive noise is the only primitive that yields floating-point samples;
/// it neither clips nor casts back to 8-bit.  The two variants keep that
/// inconsistency visible at the type level instead of hiding it.
#[derive(Debug, Clone, PartialEq)]
pub enum PerturbedImage {
    /// Channel-first 8-bit image.
    U8(Array3<u8>),
    /// Channel-first unclipped float image (noise family).
    F32(Array3<f32>),
}

impl PerturbedImage {
    /// `(channels, height, width)`.
    pub fn dim(&self) -> (usize, usize, usize) {
        match self {
            PerturbedImage::U8(a) => a.dim(),
            PerturbedImage::F32(a) => a.dim(),
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, PerturbedImage::F32(_))
    }

    pub fn as_u8(&self) -> Option<&Array3<u8>> {
        match self {
            PerturbedImage::U8(a) => Some(a),
            PerturbedImage::F32(_) => None,
        }
    }

    /// Cast to 8-bit.  Float samples are truncated and saturated.
    pub fn into_u8(self) -> Array3<u8> {
        match self {
            PerturbedImage::U8(a) => a,
            PerturbedImage::F32(a) => a.mapv(saturate_u8),
        }
    }

    pub fn to_f32(&self) -> Array3<f32> {
        match self {
            PerturbedImage::U8(a) => a.mapv(f32::from),
            PerturbedImage::F32(a) => a.clone(),
        }
    }
}
