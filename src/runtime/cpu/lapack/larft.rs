//! Triangular factor of a block reflector

use super::{
    check_batch_uniform, check_capacity, check_geometry, check_vec_capacity, check_workspace,
    PtrSlots,
};
use crate::batch::{idx2d, MatrixBatchMut, RawBatch, RawVec, VecBatchMut};
use crate::dtype::Scalar;
use crate::error::{Error, Result};
use crate::lapack::{workspace, Direction, StorageMode, Workspace};
use crate::runtime::cpu::blas;

/// Build the upper triangular factor T of H(1) H(2) ... H(k) from `k`
/// forward-ordered reflectors of order `n`
///
/// Columnwise storage reads reflector i from column i of `v` (unit head at
/// row i implicit); rowwise storage reads it conjugated from row i. Column i
/// of T is -tau_i V^H v_i folded through the already-built leading triangle;
/// a zero tau_i zeroes the column.
pub(super) unsafe fn larft_kernel<T: Scalar>(
    storev: StorageMode,
    n: usize,
    k: usize,
    v: RawBatch<T>,
    tau: RawVec<T>,
    t: RawBatch<T>,
    batch_count: usize,
) {
    blas::for_each_batch(batch_count, n * k * k * batch_count, |b| unsafe {
        let vp = v.ptr(b);
        let tp = t.ptr(b);
        for i in 0..k {
            let taui = *tau.at(b, i);
            if taui.is_zero() {
                for j in 0..=i {
                    *tp.add(idx2d(j, i, t.inca, t.lda)) = T::zero();
                }
                continue;
            }
            for j in 0..i {
                let mut acc = match storev {
                    StorageMode::ColumnWise => (*vp.add(idx2d(i, j, v.inca, v.lda))).conj(),
                    StorageMode::RowWise => *vp.add(idx2d(j, i, v.inca, v.lda)),
                };
                match storev {
                    StorageMode::ColumnWise => {
                        for r in i + 1..n {
                            acc = acc
                                + (*vp.add(idx2d(r, j, v.inca, v.lda))).conj()
                                    * *vp.add(idx2d(r, i, v.inca, v.lda));
                        }
                    }
                    StorageMode::RowWise => {
                        for c in i + 1..n {
                            acc = acc
                                + *vp.add(idx2d(j, c, v.inca, v.lda))
                                    * (*vp.add(idx2d(i, c, v.inca, v.lda))).conj();
                        }
                    }
                }
                *tp.add(idx2d(j, i, t.inca, t.lda)) = -taui * acc;
            }
            // fold in the already-built leading triangle (upper trmv)
            for j in 0..i {
                let mut acc = T::zero();
                for l in j..i {
                    acc = acc
                        + *tp.add(idx2d(j, l, t.inca, t.lda)) * *tp.add(idx2d(l, i, t.inca, t.lda));
                }
                *tp.add(idx2d(j, i, t.inca, t.lda)) = acc;
            }
            *tp.add(idx2d(i, i, t.inca, t.lda)) = taui;
        }
    });
}

#[allow(clippy::too_many_arguments)]
pub(super) fn larft<T: Scalar>(
    direct: Direction,
    storev: StorageMode,
    n: usize,
    k: usize,
    v: &mut MatrixBatchMut<'_, T>,
    tau: &mut VecBatchMut<'_, T>,
    t: &mut MatrixBatchMut<'_, T>,
    ws: &mut Workspace<T>,
) -> Result<()> {
    if direct == Direction::Backward {
        return Err(Error::NotImplemented {
            feature: "backward reflector ordering",
        });
    }
    check_batch_uniform(&[
        ("v", v.layout(), v.batch_count()),
        ("t", t.layout(), t.batch_count()),
    ])?;
    check_geometry("v", v)?;
    check_geometry("t", t)?;
    if k < 1 {
        return Err(Error::invalid_size("k", "at least one reflector required"));
    }
    let (vr, vc) = match storev {
        StorageMode::ColumnWise => (n, k),
        StorageMode::RowWise => (k, n),
    };
    if v.rows() != vr || v.cols() != vc {
        return Err(Error::invalid_size(
            "v",
            "reflector dimensions inconsistent with n, k and the storage mode",
        ));
    }
    if t.rows() != k || t.cols() != k {
        return Err(Error::invalid_size("t", "expected a k x k view"));
    }
    let bc = v.batch_count();
    check_capacity("v", v)?;
    check_capacity("t", t)?;
    check_vec_capacity("tau", tau, k, bc)?;
    check_workspace(ws, &workspace::larft_workspace(n, k, v.layout(), bc))?;
    if n == 0 || bc == 0 {
        return Ok(());
    }
    let mut slots = PtrSlots::new(&mut ws.ptr_array);
    let rv = v.raw(slots.take(v.layout(), bc));
    let rt = t.raw(slots.take(t.layout(), bc));
    let rtau = tau.raw();
    unsafe { larft_kernel(storev, n, k, rv, rtau, rt, bc) };
    Ok(())
}
