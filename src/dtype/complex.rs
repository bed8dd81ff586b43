//! Complex number types for the complex-valued factorizations
//!
//! This module provides Complex64 and Complex128 types that are compatible
//! with bytemuck for zero-copy conversions and implement the Element trait
//! for batched matrix operations.
//!
//! # Storage Format
//!
//! Complex numbers are stored in interleaved format (re, im, re, im...),
//! matching the LAPACK, numpy and BLAS conventions, so a caller-owned
//! `&[Complex128]` column-major buffer has exactly the layout a Fortran
//! `COMPLEX*16` array would have.
//!
//! # Examples
//!
//! ```ignore
//! use batchr::dtype::Complex64;
//!
//! let z = Complex64::new(3.0, 4.0);
//! assert_eq!(z.magnitude(), 5.0);
//!
//! let conjugate = z.conj(); // 3 - 4i
//! ```

use bytemuck::{Pod, Zeroable};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Macro to implement complex number type with all operations
///
/// This avoids code duplication between Complex64 and Complex128.
macro_rules! impl_complex {
    (
        $name:ident,
        $float:ty,
        $doc_bits:literal,
        $doc_float_bits:literal
    ) => {
        #[doc = concat!($doc_bits, "-bit complex number with ", $doc_float_bits, " real and imaginary parts")]
        ///
        #[doc = concat!("Memory layout: ", stringify!($name), " is ", stringify!($float), " × 2, interleaved format.")]
        #[repr(C)]
        #[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
        pub struct $name {
            /// Real part
            pub re: $float,
            /// Imaginary part
            pub im: $float,
        }

        impl $name {
            /// Zero complex number
            pub const ZERO: Self = Self { re: 0.0, im: 0.0 };

            /// One (real unit)
            pub const ONE: Self = Self { re: 1.0, im: 0.0 };

            /// Imaginary unit i
            pub const I: Self = Self { re: 0.0, im: 1.0 };

            /// Create a new complex number
            #[inline]
            pub const fn new(re: $float, im: $float) -> Self {
                Self { re, im }
            }

            /// Create a complex number from polar form: r * e^(iθ)
            #[inline]
            pub fn from_polar(r: $float, theta: $float) -> Self {
                Self {
                    re: r * theta.cos(),
                    im: r * theta.sin(),
                }
            }

            /// Magnitude (absolute value): |z| = sqrt(re² + im²)
            #[inline]
            pub fn magnitude(self) -> $float {
                (self.re * self.re + self.im * self.im).sqrt()
            }

            /// Squared magnitude: |z|² = re² + im²
            ///
            /// More efficient than `magnitude()` when you only need the squared value.
            #[inline]
            pub fn magnitude_squared(self) -> $float {
                self.re * self.re + self.im * self.im
            }

            /// Complex conjugate: conj(a + bi) = a - bi
            #[inline]
            pub fn conj(self) -> Self {
                Self {
                    re: self.re,
                    im: -self.im,
                }
            }

            /// Reciprocal: 1/z = conj(z)/|z|²
            #[inline]
            pub fn recip(self) -> Self {
                let mag_sq = self.magnitude_squared();
                if mag_sq == 0.0 {
                    Self {
                        re: <$float>::INFINITY,
                        im: <$float>::INFINITY,
                    }
                } else {
                    Self {
                        re: self.re / mag_sq,
                        im: -self.im / mag_sq,
                    }
                }
            }
        }

        impl Add for $name {
            type Output = Self;

            #[inline]
            fn add(self, rhs: Self) -> Self {
                Self {
                    re: self.re + rhs.re,
                    im: self.im + rhs.im,
                }
            }
        }

        impl Sub for $name {
            type Output = Self;

            #[inline]
            fn sub(self, rhs: Self) -> Self {
                Self {
                    re: self.re - rhs.re,
                    im: self.im - rhs.im,
                }
            }
        }

        impl Mul for $name {
            type Output = Self;

            /// Complex multiplication: (a+bi)(c+di) = (ac-bd) + (ad+bc)i
            #[inline]
            fn mul(self, rhs: Self) -> Self {
                Self {
                    re: self.re * rhs.re - self.im * rhs.im,
                    im: self.re * rhs.im + self.im * rhs.re,
                }
            }
        }

        impl Div for $name {
            type Output = Self;

            /// Complex division: (a+bi)/(c+di) = (a+bi)*conj(c+di)/|c+di|²
            #[inline]
            fn div(self, rhs: Self) -> Self {
                let denom = rhs.magnitude_squared();
                if denom == 0.0 {
                    Self {
                        re: <$float>::NAN,
                        im: <$float>::NAN,
                    }
                } else {
                    Self {
                        re: (self.re * rhs.re + self.im * rhs.im) / denom,
                        im: (self.im * rhs.re - self.re * rhs.im) / denom,
                    }
                }
            }
        }

        impl Neg for $name {
            type Output = Self;

            #[inline]
            fn neg(self) -> Self {
                Self {
                    re: -self.re,
                    im: -self.im,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.im >= 0.0 {
                    write!(f, "{}+{}i", self.re, self.im)
                } else {
                    write!(f, "{}{}i", self.re, self.im)
                }
            }
        }

        impl From<$float> for $name {
            #[inline]
            fn from(re: $float) -> Self {
                Self { re, im: 0.0 }
            }
        }

        impl From<($float, $float)> for $name {
            #[inline]
            fn from((re, im): ($float, $float)) -> Self {
                Self { re, im }
            }
        }

        impl num_traits::Zero for $name {
            #[inline]
            fn zero() -> Self {
                Self::ZERO
            }

            #[inline]
            fn is_zero(&self) -> bool {
                *self == Self::ZERO
            }
        }

        impl num_traits::One for $name {
            #[inline]
            fn one() -> Self {
                Self::ONE
            }
        }
    };
}

// Generate Complex64 and Complex128 using the macro
impl_complex!(Complex64, f32, "64", "f32");
impl_complex!(Complex128, f64, "128", "f64");

// ============================================================================
// Conversion between complex types (cannot be in macro due to cross-type refs)
// ============================================================================

impl From<Complex64> for Complex128 {
    #[inline]
    fn from(c: Complex64) -> Self {
        Self {
            re: c.re as f64,
            im: c.im as f64,
        }
    }
}

impl From<Complex128> for Complex64 {
    #[inline]
    fn from(c: Complex128) -> Self {
        Self {
            re: c.re as f32,
            im: c.im as f32,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
