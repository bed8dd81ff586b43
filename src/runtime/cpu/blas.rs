//! Batched BLAS-like primitive kernels
//!
//! Each kernel is a transform over the (row, column, batch) index space of
//! its operands, addressed through [`RawBatch`] so that the batched, strided
//! and interleaved layouts all flow through the same code. The batch loop is
//! parallelized with Rayon when the problem is large enough to amortize the
//! fork cost.
//!
//! # Safety
//!
//! All kernels are `unsafe`: the caller must guarantee that every descriptor
//! addresses memory inside the buffers it was built from for the given
//! dimensions and batch count, and that no two descriptors alias unless the
//! kernel documents the overlap (in-place trmm/trsm operate on `b` only).

use crate::batch::{idx2d, RawBatch, RawVec};
use crate::dtype::Scalar;
use crate::lapack::Operation;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Parallelization threshold: skip Rayon when the whole launch is small
/// (fork overhead exceeds the benefit)
const PARALLEL_THRESHOLD: usize = 4096;

/// Triangular operand shape
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Uplo {
    Upper,
    Lower,
}

/// Whether a triangular operand carries an implicit unit diagonal
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Diag {
    Unit,
    NonUnit,
}

/// Kernel scaling factor: a constant, or one value per batch instance
/// (optionally negated/conjugated on read)
#[derive(Copy, Clone)]
pub(crate) enum Alpha<T> {
    Const(T),
    Ptr {
        vec: RawVec<T>,
        neg: bool,
        conj: bool,
    },
}

impl<T: Scalar> Alpha<T> {
    /// Resolve the factor for instance `b`
    ///
    /// # Safety
    /// For the `Ptr` case, entry 0 of instance `b` must be readable.
    #[inline]
    unsafe fn value(&self, b: usize) -> T {
        match *self {
            Alpha::Const(v) => v,
            Alpha::Ptr { vec, neg, conj } => {
                let mut v = *vec.at(b, 0);
                if conj {
                    v = v.conj();
                }
                if neg {
                    v = -v;
                }
                v
            }
        }
    }
}

/// Decompose an operation mode into (transposed, conjugated) flags
#[inline]
fn op_flags(op: Operation) -> (bool, bool) {
    match op {
        Operation::None => (false, false),
        Operation::Transpose => (true, false),
        Operation::ConjTranspose => (true, true),
    }
}

/// Run `f(b)` for every batch instance, in parallel when `work` (a rough
/// element count for the whole launch) is large enough
#[inline]
pub(crate) fn for_each_batch<F>(batch_count: usize, work: usize, f: F)
where
    F: Fn(usize) + Send + Sync,
{
    #[cfg(feature = "rayon")]
    {
        if work >= PARALLEL_THRESHOLD && batch_count > 1 {
            (0..batch_count).into_par_iter().for_each(&f);
            return;
        }
    }
    #[cfg(not(feature = "rayon"))]
    let _ = work;
    for b in 0..batch_count {
        f(b);
    }
}

// ============================================================================
// Vector kernels
// ============================================================================

/// Per-instance argmax of |x_i| over `n` entries with increment `incx`,
/// written 0-based into entry 0 of `out`
pub(crate) unsafe fn iamax<T: Scalar>(
    n: usize,
    x: RawBatch<T>,
    incx: usize,
    out: RawVec<i32>,
    batch_count: usize,
) {
    for_each_batch(batch_count, n * batch_count, |b| unsafe {
        let xp = x.ptr(b);
        let mut best = 0usize;
        let mut best_val = f64::NEG_INFINITY;
        for i in 0..n {
            let v = (*xp.add(i * incx)).abs();
            if v > best_val {
                best_val = v;
                best = i;
            }
        }
        *out.at(b, 0) = best as i32;
    });
}

/// x := alpha * x over `n` entries with increment `incx`
pub(crate) unsafe fn scal<T: Scalar>(
    n: usize,
    alpha: Alpha<T>,
    x: RawBatch<T>,
    incx: usize,
    batch_count: usize,
) {
    for_each_batch(batch_count, n * batch_count, |b| unsafe {
        let a = alpha.value(b);
        let xp = x.ptr(b);
        for i in 0..n {
            let p = xp.add(i * incx);
            *p = a * *p;
        }
    });
}

/// Conjugate `n` entries of x in place (no-op for real types)
pub(crate) unsafe fn lacgv<T: Scalar>(n: usize, x: RawBatch<T>, incx: usize, batch_count: usize) {
    if !T::IS_COMPLEX {
        return;
    }
    for_each_batch(batch_count, n * batch_count, |b| unsafe {
        let xp = x.ptr(b);
        for i in 0..n {
            let p = xp.add(i * incx);
            *p = (*p).conj();
        }
    });
}

/// Apply the row interchanges recorded in `ipiv[k1..k2]` to the `n` columns
/// of `a`
///
/// Pivot entries are 1-based row indices relative to the row indexing of the
/// `a` view. `forward` replays the interchanges in recorded order (as after
/// factorization); reversed order undoes them (transpose solves).
pub(crate) unsafe fn laswp<T: Scalar>(
    n: usize,
    a: RawBatch<T>,
    k1: usize,
    k2: usize,
    ipiv: RawVec<i32>,
    forward: bool,
    batch_count: usize,
) {
    if k1 >= k2 {
        return;
    }
    let work = n * (k2 - k1) * batch_count;
    for_each_batch(batch_count, work, |b| unsafe {
        let ap = a.ptr(b);
        let ks: Box<dyn Iterator<Item = usize>> = if forward {
            Box::new(k1..k2)
        } else {
            Box::new((k1..k2).rev())
        };
        for k in ks {
            let p = (*ipiv.at(b, k) - 1) as usize;
            if p != k {
                for j in 0..n {
                    let pk = ap.add(idx2d(k, j, a.inca, a.lda));
                    let pp = ap.add(idx2d(p, j, a.inca, a.lda));
                    std::ptr::swap(pk, pp);
                }
            }
        }
    });
}

// ============================================================================
// Rank-1 / matrix-vector kernels
// ============================================================================

/// A += alpha * x * y^T (or y^H when `conj_y`), A m x n
pub(crate) unsafe fn ger<T: Scalar>(
    m: usize,
    n: usize,
    alpha: Alpha<T>,
    x: RawBatch<T>,
    incx: usize,
    y: RawBatch<T>,
    incy: usize,
    conj_y: bool,
    a: RawBatch<T>,
    batch_count: usize,
) {
    for_each_batch(batch_count, m * n * batch_count, |b| unsafe {
        let al = alpha.value(b);
        if al.is_zero() {
            return;
        }
        let xp = x.ptr(b);
        let yp = y.ptr(b);
        let ap = a.ptr(b);
        for j in 0..n {
            let mut yv = *yp.add(j * incy);
            if conj_y {
                yv = yv.conj();
            }
            let ayv = al * yv;
            if ayv.is_zero() {
                continue;
            }
            for i in 0..m {
                let p = ap.add(idx2d(i, j, a.inca, a.lda));
                *p = *p + *xp.add(i * incx) * ayv;
            }
        }
    });
}

/// y := alpha * op(A) * x + beta * y, A m x n
///
/// `beta == 0` overwrites y without reading it.
pub(crate) unsafe fn gemv<T: Scalar>(
    trans: Operation,
    m: usize,
    n: usize,
    alpha: Alpha<T>,
    a: RawBatch<T>,
    x: RawBatch<T>,
    incx: usize,
    beta: T,
    y: RawBatch<T>,
    incy: usize,
    batch_count: usize,
) {
    let (transposed, conj) = op_flags(trans);
    let out_len = if transposed { n } else { m };
    let in_len = if transposed { m } else { n };
    for_each_batch(batch_count, m * n * batch_count, |b| unsafe {
        let al = alpha.value(b);
        let ap = a.ptr(b);
        let xp = x.ptr(b);
        let yp = y.ptr(b);
        for i in 0..out_len {
            let mut acc = T::zero();
            for l in 0..in_len {
                let av = if transposed {
                    *ap.add(idx2d(l, i, a.inca, a.lda))
                } else {
                    *ap.add(idx2d(i, l, a.inca, a.lda))
                };
                let av = if conj { av.conj() } else { av };
                acc = acc + av * *xp.add(l * incx);
            }
            let dst = yp.add(i * incy);
            if beta.is_zero() {
                *dst = al * acc;
            } else {
                *dst = al * acc + beta * *dst;
            }
        }
    });
}

// ============================================================================
// Matrix-matrix kernels
// ============================================================================

/// C := alpha * op(A) * op(B) + beta * C, C m x n, inner dimension k
///
/// `beta == 0` overwrites C without reading it.
pub(crate) unsafe fn gemm<T: Scalar>(
    transa: Operation,
    transb: Operation,
    m: usize,
    n: usize,
    k: usize,
    alpha: T,
    a: RawBatch<T>,
    b: RawBatch<T>,
    beta: T,
    c: RawBatch<T>,
    batch_count: usize,
) {
    let (ta, ca) = op_flags(transa);
    let (tb, cb) = op_flags(transb);
    for_each_batch(batch_count, m * n * k.max(1) * batch_count, |bi| unsafe {
        let ap = a.ptr(bi);
        let bp = b.ptr(bi);
        let cp = c.ptr(bi);
        for j in 0..n {
            for i in 0..m {
                let mut acc = T::zero();
                for l in 0..k {
                    let av = if ta {
                        *ap.add(idx2d(l, i, a.inca, a.lda))
                    } else {
                        *ap.add(idx2d(i, l, a.inca, a.lda))
                    };
                    let av = if ca { av.conj() } else { av };
                    let bv = if tb {
                        *bp.add(idx2d(j, l, b.inca, b.lda))
                    } else {
                        *bp.add(idx2d(l, j, b.inca, b.lda))
                    };
                    let bv = if cb { bv.conj() } else { bv };
                    acc = acc + av * bv;
                }
                let dst = cp.add(idx2d(i, j, c.inca, c.lda));
                if beta.is_zero() {
                    *dst = alpha * acc;
                } else {
                    *dst = alpha * acc + beta * *dst;
                }
            }
        }
    });
}

/// B := alpha * B * op(A) in place, with A an n x n triangle and B m x n
pub(crate) unsafe fn trmm_right<T: Scalar>(
    uplo: Uplo,
    trans: Operation,
    diag: Diag,
    m: usize,
    n: usize,
    alpha: T,
    a: RawBatch<T>,
    b: RawBatch<T>,
    batch_count: usize,
) {
    let (transposed, conj) = op_flags(trans);
    // Column update order that only reads not-yet-updated columns:
    //   op(A) upper, notrans -> descending (col j reads cols < j)
    //   op(A) lower, notrans -> ascending  (col j reads cols > j)
    // transposition flips which triangle contributes, so it flips the order
    let descending = (uplo == Uplo::Upper) != transposed;
    for_each_batch(batch_count, m * n * n.max(1) * batch_count, |bi| unsafe {
        let ap = a.ptr(bi);
        let bp = b.ptr(bi);
        let cols: Box<dyn Iterator<Item = usize>> = if descending {
            Box::new((0..n).rev())
        } else {
            Box::new(0..n)
        };
        for j in cols {
            // effective diagonal factor
            let d = match diag {
                Diag::Unit => T::one(),
                Diag::NonUnit => {
                    let v = *ap.add(idx2d(j, j, a.inca, a.lda));
                    if conj {
                        v.conj()
                    } else {
                        v
                    }
                }
            };
            // contributing off-diagonal range of l
            let (lo, hi) = match (uplo, transposed) {
                (Uplo::Upper, false) => (0, j),          // A(l, j), l < j
                (Uplo::Lower, false) => (j + 1, n),      // A(l, j), l > j
                (Uplo::Upper, true) => (j + 1, n),       // op(A)(l, j) = A(j, l), l > j
                (Uplo::Lower, true) => (0, j),           // op(A)(l, j) = A(j, l), l < j
            };
            for i in 0..m {
                let mut acc = d * *bp.add(idx2d(i, j, b.inca, b.lda));
                for l in lo..hi {
                    let av = if transposed {
                        *ap.add(idx2d(j, l, a.inca, a.lda))
                    } else {
                        *ap.add(idx2d(l, j, a.inca, a.lda))
                    };
                    let av = if conj { av.conj() } else { av };
                    acc = acc + *bp.add(idx2d(i, l, b.inca, b.lda)) * av;
                }
                *bp.add(idx2d(i, j, b.inca, b.lda)) = alpha * acc;
            }
        }
    });
}

/// Solve op(A) * X = alpha * B in place on B, with A an m x m triangle and
/// B m x n
pub(crate) unsafe fn trsm_left<T: Scalar>(
    uplo: Uplo,
    trans: Operation,
    diag: Diag,
    m: usize,
    n: usize,
    alpha: T,
    a: RawBatch<T>,
    b: RawBatch<T>,
    batch_count: usize,
) {
    let (transposed, conj) = op_flags(trans);
    // forward substitution when op(A) is effectively lower triangular
    let forward = (uplo == Uplo::Lower) != transposed;
    for_each_batch(batch_count, m * m.max(1) * n * batch_count, |bi| unsafe {
        let ap = a.ptr(bi);
        let bp = b.ptr(bi);
        for j in 0..n {
            if alpha != T::one() {
                for i in 0..m {
                    let p = bp.add(idx2d(i, j, b.inca, b.lda));
                    *p = alpha * *p;
                }
            }
            let rows: Box<dyn Iterator<Item = usize>> = if forward {
                Box::new(0..m)
            } else {
                Box::new((0..m).rev())
            };
            for i in rows {
                let mut acc = *bp.add(idx2d(i, j, b.inca, b.lda));
                let (lo, hi) = if forward { (0, i) } else { (i + 1, m) };
                for l in lo..hi {
                    let av = if transposed {
                        *ap.add(idx2d(l, i, a.inca, a.lda))
                    } else {
                        *ap.add(idx2d(i, l, a.inca, a.lda))
                    };
                    let av = if conj { av.conj() } else { av };
                    acc = acc - av * *bp.add(idx2d(l, j, b.inca, b.lda));
                }
                if diag == Diag::NonUnit {
                    let d = *ap.add(idx2d(i, i, a.inca, a.lda));
                    let d = if conj { d.conj() } else { d };
                    acc = acc / d;
                }
                *bp.add(idx2d(i, j, b.inca, b.lda)) = acc;
            }
        }
    });
}

// ============================================================================
// Block copy kernels (reflector applicator plumbing)
// ============================================================================

/// dst := src, both m x n
pub(crate) unsafe fn copy_block<T: Scalar>(
    m: usize,
    n: usize,
    src: RawBatch<T>,
    dst: RawBatch<T>,
    batch_count: usize,
) {
    for_each_batch(batch_count, m * n * batch_count, |b| unsafe {
        let sp = src.ptr(b);
        let dp = dst.ptr(b);
        for j in 0..n {
            for i in 0..m {
                *dp.add(idx2d(i, j, dst.inca, dst.lda)) = *sp.add(idx2d(i, j, src.inca, src.lda));
            }
        }
    });
}

/// dst(i, j) := src(j, i), optionally conjugated; dst is m x n, src n x m
pub(crate) unsafe fn copy_adjoint<T: Scalar>(
    m: usize,
    n: usize,
    src: RawBatch<T>,
    dst: RawBatch<T>,
    conj: bool,
    batch_count: usize,
) {
    for_each_batch(batch_count, m * n * batch_count, |b| unsafe {
        let sp = src.ptr(b);
        let dp = dst.ptr(b);
        for j in 0..n {
            for i in 0..m {
                let v = *sp.add(idx2d(j, i, src.inca, src.lda));
                *dp.add(idx2d(i, j, dst.inca, dst.lda)) = if conj { v.conj() } else { v };
            }
        }
    });
}

/// dst(i, j) -= src(i, j); both m x n
pub(crate) unsafe fn sub_block<T: Scalar>(
    m: usize,
    n: usize,
    src: RawBatch<T>,
    dst: RawBatch<T>,
    batch_count: usize,
) {
    for_each_batch(batch_count, m * n * batch_count, |b| unsafe {
        let sp = src.ptr(b);
        let dp = dst.ptr(b);
        for j in 0..n {
            for i in 0..m {
                let p = dp.add(idx2d(i, j, dst.inca, dst.lda));
                *p = *p - *sp.add(idx2d(i, j, src.inca, src.lda));
            }
        }
    });
}

/// dst(i, j) -= src(j, i), optionally conjugated; dst is m x n, src n x m
pub(crate) unsafe fn sub_adjoint<T: Scalar>(
    m: usize,
    n: usize,
    src: RawBatch<T>,
    dst: RawBatch<T>,
    conj: bool,
    batch_count: usize,
) {
    for_each_batch(batch_count, m * n * batch_count, |b| unsafe {
        let sp = src.ptr(b);
        let dp = dst.ptr(b);
        for j in 0..n {
            for i in 0..m {
                let v = *sp.add(idx2d(j, i, src.inca, src.lda));
                let v = if conj { v.conj() } else { v };
                let p = dp.add(idx2d(i, j, dst.inca, dst.lda));
                *p = *p - v;
            }
        }
    });
}
