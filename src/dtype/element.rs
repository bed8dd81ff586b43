//! Element trait for mapping Rust types to DType

use super::DType;
use bytemuck::{Pod, Zeroable};
use num_traits::{One, Zero};
use std::ops::{Add, Div, Mul, Sub};

/// Trait for types that can be elements of a matrix batch
///
/// This trait connects Rust's type system to batchr's runtime dtype tag.
/// It is implemented for the four supported precisions.
///
/// # Bounds
/// - `Copy + Clone + Send + Sync + 'static` - Basic trait requirements
/// - `Pod + Zeroable` - Safe memory transmutation (bytemuck)
/// - `Add + Sub + Mul + Div` - Arithmetic operations (Output = Self)
/// - `Zero + One` - Additive and multiplicative identities (num-traits)
/// - `PartialEq` - Exact-zero pivot detection
pub trait Element:
    Copy
    + Clone
    + Send
    + Sync
    + Pod
    + Zeroable
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Zero
    + One
    + PartialEq
{
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Convert to f64 for generic numeric operations
    ///
    /// For complex types this returns the **magnitude** (|z|), not the real
    /// part, so that a single scalar comparison is always meaningful.
    fn to_f64(self) -> f64;

    /// Convert from f64 to this type
    ///
    /// For complex types this creates a real number (imaginary part = 0).
    fn from_f64(v: f64) -> Self;
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl Element for super::complex::Complex64 {
    const DTYPE: DType = DType::Complex64;

    /// Returns magnitude (|z|) - this is a lossy conversion.
    /// For the real part, use `.re` directly.
    #[inline]
    fn to_f64(self) -> f64 {
        self.magnitude() as f64
    }

    /// Creates a real complex number (im = 0)
    #[inline]
    fn from_f64(v: f64) -> Self {
        Self::new(v as f32, 0.0)
    }
}

impl Element for super::complex::Complex128 {
    const DTYPE: DType = DType::Complex128;

    /// Returns magnitude (|z|) - this is a lossy conversion.
    /// For the real part, use `.re` directly.
    #[inline]
    fn to_f64(self) -> f64 {
        self.magnitude()
    }

    /// Creates a real complex number (im = 0)
    #[inline]
    fn from_f64(v: f64) -> Self {
        Self::new(v, 0.0)
    }
}
