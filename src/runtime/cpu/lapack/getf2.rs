//! Unblocked LU factorization

use super::{
    check_capacity, check_geometry, check_info, check_vec_capacity, check_workspace, PtrSlots,
};
use crate::batch::{idx2d, MatrixBatchMut, RawBatch, RawVec, VecBatchMut};
use crate::dtype::Scalar;
use crate::error::Result;
use crate::lapack::{workspace, Workspace};
use crate::runtime::cpu::blas::{self, Alpha};

/// Record the pivot for column `j` of the panel, swap its row into place
/// across all `n` panel columns, and stage the scaling factor
///
/// A pivot that is exactly zero stages a factor of one (the column is left
/// unscaled) and flags `info` with the global 1-based column index if no
/// earlier failure was recorded. Row indices and the written pivot entry are
/// relative to the panel plus `offset`.
#[allow(clippy::too_many_arguments)]
unsafe fn check_singularity<T: Scalar>(
    n: usize,
    j: usize,
    a: RawBatch<T>,
    pivot_idx: Option<RawVec<i32>>,
    ipiv: Option<RawVec<i32>>,
    offset: usize,
    pivot_val: RawVec<T>,
    info: RawVec<i32>,
    batch_count: usize,
) {
    blas::for_each_batch(batch_count, n * batch_count, |b| unsafe {
        let idx = match pivot_idx {
            Some(pi) => *pi.at(b, 0) as usize,
            None => 0,
        };
        if let Some(ip) = ipiv {
            *ip.at(b, j) = (offset + j + idx + 1) as i32;
        }
        if idx != 0 {
            let ap = a.ptr(b);
            for col in 0..n {
                let p1 = ap.add(idx2d(j, col, a.inca, a.lda));
                let p2 = ap.add(idx2d(j + idx, col, a.inca, a.lda));
                std::ptr::swap(p1, p2);
            }
        }
        let piv = *a.ptr(b).add(idx2d(j, j, a.inca, a.lda));
        if piv.is_zero() {
            let ib = info.at(b, 0);
            if *ib == 0 {
                *ib = (offset + j + 1) as i32;
            }
            *pivot_val.at(b, 0) = T::one();
        } else {
            *pivot_val.at(b, 0) = T::one() / piv;
        }
    });
}

/// Factor an m x n panel in place, sequential over columns
///
/// With `ipiv` present, partial pivoting within the panel; `offset` is the
/// global row/column position of the panel, folded into the recorded pivot
/// entries and info values. `info` is never reset here so earlier failures
/// survive across panels.
#[allow(clippy::too_many_arguments)]
pub(super) unsafe fn getf2_body<T: Scalar>(
    m: usize,
    n: usize,
    a: RawBatch<T>,
    ipiv: Option<RawVec<i32>>,
    offset: usize,
    info: RawVec<i32>,
    pivot_val: &mut [T],
    pivot_idx: &mut [i32],
    minus_one: T,
    batch_count: usize,
) {
    let dim = m.min(n);
    if dim == 0 || batch_count == 0 {
        return;
    }
    let pv = RawVec::packed(pivot_val.as_mut_ptr(), 1);
    let pi = if ipiv.is_some() {
        Some(RawVec::packed(pivot_idx.as_mut_ptr(), 1))
    } else {
        None
    };
    for j in 0..dim {
        if let Some(pi) = pi {
            blas::iamax(
                m - j,
                a.shifted(idx2d(j, j, a.inca, a.lda)),
                a.inca,
                pi,
                batch_count,
            );
        }
        check_singularity(n, j, a, pi, ipiv, offset, pv, info, batch_count);
        if j + 1 < m {
            blas::scal(
                m - j - 1,
                Alpha::Ptr {
                    vec: pv,
                    neg: false,
                    conj: false,
                },
                a.shifted(idx2d(j + 1, j, a.inca, a.lda)),
                a.inca,
                batch_count,
            );
            if j + 1 < n {
                blas::ger(
                    m - j - 1,
                    n - j - 1,
                    Alpha::Const(minus_one),
                    a.shifted(idx2d(j + 1, j, a.inca, a.lda)),
                    a.inca,
                    a.shifted(idx2d(j, j + 1, a.inca, a.lda)),
                    a.lda,
                    false,
                    a.shifted(idx2d(j + 1, j + 1, a.inca, a.lda)),
                    batch_count,
                );
            }
        }
    }
}

pub(super) fn getf2<T: Scalar>(
    a: &mut MatrixBatchMut<'_, T>,
    mut ipiv: Option<&mut VecBatchMut<'_, i32>>,
    info: &mut [i32],
    ws: &mut Workspace<T>,
) -> Result<()> {
    check_geometry("a", a)?;
    let m = a.rows();
    let n = a.cols();
    let bc = a.batch_count();
    check_info(info, bc)?;
    check_capacity("a", a)?;
    if let Some(p) = ipiv.as_deref() {
        check_vec_capacity("ipiv", p, m.min(n), bc)?;
    }
    let pivot = ipiv.is_some();
    check_workspace(ws, &workspace::getf2_workspace(m, n, pivot, a.layout(), bc))?;
    info[..bc].fill(0);
    if m == 0 || n == 0 || bc == 0 {
        return Ok(());
    }
    let Workspace {
        scalars,
        pivot_val,
        pivot_idx,
        ptr_array,
        ..
    } = ws;
    let mut slots = PtrSlots::new(ptr_array);
    let ra = a.raw(slots.take(a.layout(), bc));
    let rp = ipiv.as_mut().map(|p| p.raw());
    let ri = RawVec::packed(info.as_mut_ptr(), 1);
    unsafe { getf2_body(m, n, ra, rp, 0, ri, pivot_val, pivot_idx, scalars[1], bc) };
    Ok(())
}
