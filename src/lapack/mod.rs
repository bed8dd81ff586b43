//! Batched factorization drivers and their building blocks
//!
//! The [`Lapack`] trait is the public surface: blocked LU/QR/LQ
//! factorizations, Householder reflector kernels, orthogonal-factor
//! application, and non-pivoting block-tridiagonal factor/solve, all batched
//! over the three storage layouts. Matrix arguments are
//! [`MatrixBatchMut`](crate::batch::MatrixBatchMut) descriptors; vector
//! outputs (pivots, Householder scalars) are
//! [`VecBatchMut`](crate::batch::VecBatchMut).
//!
//! # Conventions
//!
//! - Matrices are column-major; reflectors follow the LAPACK compact
//!   representation (factored matrix holds the reflector vectors, a separate
//!   array holds the scalar factors).
//! - Per-matrix singularity is reported through `info`: 0 for a clean
//!   factorization, otherwise the 1-based index of the first zero pivot
//!   (first failure wins). Singularity is not an `Err`.
//! - Every entry point validates in a fixed order: unsupported values,
//!   then sizes, then buffers. On error nothing has been written.
//! - Scratch memory is caller-provided: query the exact requirement with the
//!   sizing functions in [`workspace`], allocate once with
//!   [`Workspace::alloc`], reuse across calls of the same shape.

pub mod config;
pub mod workspace;

pub use config::BlockConfig;
pub use workspace::{Workspace, WorkspaceReq};

use crate::batch::{MatrixBatchMut, VecBatchMut};
use crate::dtype::Scalar;
use crate::error::Result;

/// Which side a reflector or triangular factor is applied from
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Operation applied to a matrix operand
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Use the matrix as stored
    None,
    /// Transpose
    Transpose,
    /// Conjugate transpose (plain transpose for real types)
    ConjTranspose,
}

/// Order in which the elementary reflectors of a block compose
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    /// H = H(1) H(2) ... H(k)
    Forward,
    /// H = H(k) ... H(2) H(1)
    Backward,
}

/// How the reflector vectors are stored in the factored matrix
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StorageMode {
    /// Reflector i is column i, below the diagonal (QR-style)
    ColumnWise,
    /// Reflector i is row i, right of the diagonal (LQ-style)
    RowWise,
}

/// Batched dense factorization routines
///
/// Implemented by runtime clients; the CPU client is the reference
/// implementation. All methods are generic over the four precisions.
pub trait Lapack {
    /// Generate one Householder reflector per instance:
    /// H * [alpha; x] = [beta; 0] with H = I - tau * v * v^H.
    ///
    /// `alpha` is a 1x1 batch holding the leading element (overwritten with
    /// beta); `x` is a 1x(n-1) batch (vector increment in its `lda`) holding
    /// the tail, overwritten with the reflector vector. A zero tail with real
    /// alpha yields tau = 0 (H = I); it is not an error.
    fn larfg<T: Scalar>(
        &self,
        alpha: &mut MatrixBatchMut<'_, T>,
        x: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        ws: &mut Workspace<T>,
    ) -> Result<()>;

    /// Apply one reflector H = I - tau * v * v^H to `c` from `side`.
    ///
    /// `v` is a 1xL batch (L = rows of `c` for the left side, columns for the
    /// right; vector increment in its `lda`) whose leading element must be 1.
    fn larf<T: Scalar>(
        &self,
        side: Side,
        v: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        c: &mut MatrixBatchMut<'_, T>,
        ws: &mut Workspace<T>,
    ) -> Result<()>;

    /// Build the k x k triangular factor T of a block reflector from `k`
    /// elementary reflectors of order `n` stored in `v`.
    fn larft<T: Scalar>(
        &self,
        direct: Direction,
        storev: StorageMode,
        n: usize,
        k: usize,
        v: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        t: &mut MatrixBatchMut<'_, T>,
        ws: &mut Workspace<T>,
    ) -> Result<()>;

    /// Apply a block reflector (or its transpose/adjoint) to `c` from `side`,
    /// as a fixed sequence of batched matrix-multiply passes.
    fn larfb<T: Scalar>(
        &self,
        side: Side,
        trans: Operation,
        direct: Direction,
        storev: StorageMode,
        k: usize,
        v: &mut MatrixBatchMut<'_, T>,
        t: &mut MatrixBatchMut<'_, T>,
        c: &mut MatrixBatchMut<'_, T>,
        ws: &mut Workspace<T>,
    ) -> Result<()>;

    /// Unblocked LU factorization, sequential over columns.
    ///
    /// With `ipiv` present, partial pivoting: entry j receives the 1-based
    /// row that column j pivoted on. Without it, no interchanges. A pivot
    /// that is exactly zero records `info[b] = j + 1` (first failure only)
    /// and the factorization continues.
    fn getf2<T: Scalar>(
        &self,
        a: &mut MatrixBatchMut<'_, T>,
        ipiv: Option<&mut VecBatchMut<'_, i32>>,
        info: &mut [i32],
        ws: &mut Workspace<T>,
    ) -> Result<()>;

    /// Blocked LU factorization with the same outputs as [`Lapack::getf2`].
    ///
    /// Chooses once per call between the unblocked path (small dimension) and
    /// the panel/update loop, per `cfg`.
    fn getrf<T: Scalar>(
        &self,
        a: &mut MatrixBatchMut<'_, T>,
        ipiv: Option<&mut VecBatchMut<'_, i32>>,
        info: &mut [i32],
        cfg: BlockConfig,
        ws: &mut Workspace<T>,
    ) -> Result<()>;

    /// Solve op(A) X = B from the output of [`Lapack::getrf`]; `b` holds the
    /// right-hand sides and receives the solution. `a` is read, not modified.
    fn getrs<T: Scalar>(
        &self,
        trans: Operation,
        a: &mut MatrixBatchMut<'_, T>,
        ipiv: Option<&mut VecBatchMut<'_, i32>>,
        b: &mut MatrixBatchMut<'_, T>,
        ws: &mut Workspace<T>,
    ) -> Result<()>;

    /// Unblocked QR factorization (Householder, column reflectors).
    fn geqr2<T: Scalar>(
        &self,
        a: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        ws: &mut Workspace<T>,
    ) -> Result<()>;

    /// Blocked QR factorization.
    fn geqrf<T: Scalar>(
        &self,
        a: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        cfg: BlockConfig,
        ws: &mut Workspace<T>,
    ) -> Result<()>;

    /// Unblocked LQ factorization (Householder, row reflectors).
    fn gelq2<T: Scalar>(
        &self,
        a: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        ws: &mut Workspace<T>,
    ) -> Result<()>;

    /// Blocked LQ factorization.
    fn gelqf<T: Scalar>(
        &self,
        a: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        cfg: BlockConfig,
        ws: &mut Workspace<T>,
    ) -> Result<()>;

    /// Apply Q (or its transpose/adjoint) from a QR factorization to `c`.
    ///
    /// `k` is the number of reflectors; `a` and `tau` are the outputs of
    /// [`Lapack::geqrf`]. Blocked when `k` exceeds the switch size.
    fn ormqr<T: Scalar>(
        &self,
        side: Side,
        trans: Operation,
        k: usize,
        a: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        c: &mut MatrixBatchMut<'_, T>,
        cfg: BlockConfig,
        ws: &mut Workspace<T>,
    ) -> Result<()>;

    /// Apply Q (or its transpose/adjoint) from an LQ factorization to `c`.
    fn ormlq<T: Scalar>(
        &self,
        side: Side,
        trans: Operation,
        k: usize,
        a: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        c: &mut MatrixBatchMut<'_, T>,
        cfg: BlockConfig,
        ws: &mut Workspace<T>,
    ) -> Result<()>;

    /// Apply one orthogonal factor of a bidiagonalization to `c`.
    ///
    /// `storev` selects the factor: `ColumnWise` applies Q (delegates to
    /// [`Lapack::ormqr`]), `RowWise` applies P (delegates to
    /// [`Lapack::ormlq`] with the operation flipped). When the applied
    /// dimension does not exceed `k`, the useful reflectors sit one diagonal
    /// off the origin and the reflector count drops by one.
    #[allow(clippy::too_many_arguments)]
    fn ormbr<T: Scalar>(
        &self,
        storev: StorageMode,
        side: Side,
        trans: Operation,
        k: usize,
        a: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        c: &mut MatrixBatchMut<'_, T>,
        cfg: BlockConfig,
        ws: &mut Workspace<T>,
    ) -> Result<()>;

    /// Factor a batched block-tridiagonal system without pivoting.
    ///
    /// `a`, `b`, `c` hold the sub-diagonal, diagonal and super-diagonal
    /// nb x nb blocks, each batch a row of `nblocks` (or `nblocks - 1`)
    /// blocks stored side by side. A singular diagonal block k records
    /// `info[b] = local + k * nb` (first failure wins).
    fn geblttrf_npvt<T: Scalar>(
        &self,
        nb: usize,
        nblocks: usize,
        a: &mut MatrixBatchMut<'_, T>,
        b: &mut MatrixBatchMut<'_, T>,
        c: &mut MatrixBatchMut<'_, T>,
        info: &mut [i32],
        ws: &mut Workspace<T>,
    ) -> Result<()>;

    /// Solve a factored block-tridiagonal system for `nrhs` right-hand sides
    /// stored block-row-wise in `x` (forward then backward block sweep).
    #[allow(clippy::too_many_arguments)]
    fn geblttrs_npvt<T: Scalar>(
        &self,
        nb: usize,
        nblocks: usize,
        nrhs: usize,
        a: &mut MatrixBatchMut<'_, T>,
        b: &mut MatrixBatchMut<'_, T>,
        c: &mut MatrixBatchMut<'_, T>,
        x: &mut MatrixBatchMut<'_, T>,
        ws: &mut Workspace<T>,
    ) -> Result<()>;
}
