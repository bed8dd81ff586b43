//! Data type system for batchr
//!
//! The four supported element types (`f32`, `f64`, `Complex64`, `Complex128`)
//! are connected to the runtime [`DType`] tag through the [`Element`] trait,
//! and to the solvers through the [`Scalar`] trait, which adds the field
//! operations (conjugation, magnitude) the factorizations need.

pub mod complex;
mod element;
mod scalar;

pub use complex::{Complex64, Complex128};
pub use element::Element;
pub use scalar::Scalar;

use std::fmt;

/// Element types supported by the batched solvers
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// Complex with f32 components
    Complex64,
    /// Complex with f64 components
    Complex128,
}

impl DType {
    /// Size of one element in bytes
    pub const fn size_of(&self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F64 => 8,
            DType::Complex64 => 8,
            DType::Complex128 => 16,
        }
    }

    /// Whether this dtype has an imaginary component
    pub const fn is_complex(&self) -> bool {
        matches!(self, DType::Complex64 | DType::Complex128)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::Complex64 => "complex64",
            DType::Complex128 => "complex128",
        };
        write!(f, "{}", name)
    }
}
