//! Scalar trait: the field operations the factorizations need
//!
//! `Element` ties a Rust type to its runtime dtype; `Scalar` adds the pieces
//! of complex arithmetic (conjugation, component access) that let one generic
//! implementation serve the real and complex instantiations of every routine.

use super::complex::{Complex64, Complex128};
use super::Element;
use std::ops::Neg;

/// Extension of [`Element`] for the four factorization precisions
///
/// Real types implement `conj` as the identity and report a zero imaginary
/// part, so generic Householder code written against `Scalar` collapses to
/// the ordinary real formulas under monomorphization.
pub trait Scalar: Element + Neg<Output = Self> {
    /// Whether this type carries an imaginary component
    const IS_COMPLEX: bool;

    /// Complex conjugate (identity for real types)
    fn conj(self) -> Self;

    /// Real component as f64
    fn re(self) -> f64;

    /// Imaginary component as f64 (zero for real types)
    fn im(self) -> f64;

    /// Magnitude |x| as f64
    #[inline]
    fn abs(self) -> f64 {
        // Element::to_f64 is the magnitude for complex types and the signed
        // value for real types.
        self.to_f64().abs()
    }

    /// Build a value from a real f64 (imaginary part zero)
    #[inline]
    fn from_real(v: f64) -> Self {
        Self::from_f64(v)
    }

    /// Build a value from real and imaginary f64 components
    ///
    /// Real types keep only the real component; callers must not route a
    /// nonzero imaginary part through a real instantiation.
    fn from_re_im(re: f64, im: f64) -> Self;

    /// Magnitude below which reflector generation rescales its inputs
    /// before computing the scalar factor (the precision's safe minimum,
    /// smallest normal over machine epsilon)
    const SAFE_MIN: f64;
}

impl Scalar for f32 {
    const IS_COMPLEX: bool = false;
    const SAFE_MIN: f64 = (f32::MIN_POSITIVE / f32::EPSILON) as f64;

    #[inline]
    fn conj(self) -> Self {
        self
    }

    #[inline]
    fn re(self) -> f64 {
        self as f64
    }

    #[inline]
    fn im(self) -> f64 {
        0.0
    }

    #[inline]
    fn from_re_im(re: f64, _im: f64) -> Self {
        re as f32
    }
}

impl Scalar for f64 {
    const IS_COMPLEX: bool = false;
    const SAFE_MIN: f64 = f64::MIN_POSITIVE / f64::EPSILON;

    #[inline]
    fn conj(self) -> Self {
        self
    }

    #[inline]
    fn re(self) -> f64 {
        self
    }

    #[inline]
    fn im(self) -> f64 {
        0.0
    }

    #[inline]
    fn from_re_im(re: f64, _im: f64) -> Self {
        re
    }
}

impl Scalar for Complex64 {
    const IS_COMPLEX: bool = true;
    const SAFE_MIN: f64 = (f32::MIN_POSITIVE / f32::EPSILON) as f64;

    #[inline]
    fn conj(self) -> Self {
        Complex64::conj(self)
    }

    #[inline]
    fn re(self) -> f64 {
        self.re as f64
    }

    #[inline]
    fn im(self) -> f64 {
        self.im as f64
    }

    #[inline]
    fn from_re_im(re: f64, im: f64) -> Self {
        Complex64::new(re as f32, im as f32)
    }
}

impl Scalar for Complex128 {
    const IS_COMPLEX: bool = true;
    const SAFE_MIN: f64 = f64::MIN_POSITIVE / f64::EPSILON;

    #[inline]
    fn conj(self) -> Self {
        Complex128::conj(self)
    }

    #[inline]
    fn re(self) -> f64 {
        self.re
    }

    #[inline]
    fn im(self) -> f64 {
        self.im
    }

    #[inline]
    fn from_re_im(re: f64, im: f64) -> Self {
        Complex128::new(re, im)
    }
}
