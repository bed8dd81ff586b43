//! Block reflector application

use super::{
    check_batch_uniform, check_capacity, check_geometry, check_trans, check_workspace, PtrSlots,
};
use crate::batch::{idx2d, MatrixBatchMut, RawBatch};
use crate::dtype::Scalar;
use crate::error::{Error, Result};
use crate::lapack::{workspace, Direction, Operation, Side, StorageMode, Workspace};
use crate::runtime::cpu::blas::{self, Diag, Uplo};

/// Apply a forward block reflector H = I - V T V^H (or its adjoint) to an
/// m x n view of c
///
/// The workspace panel `work` holds W, one ldw x k block per instance with
/// ldw = n (left) or m (right). Each case is the standard sequence: gather
/// the leading rows/columns of C into W, accumulate the trailing part
/// through V2, fold in T, then scatter the update back through V.
#[allow(clippy::too_many_arguments)]
pub(super) unsafe fn larfb_body<T: Scalar>(
    side: Side,
    trans: Operation,
    storev: StorageMode,
    m: usize,
    n: usize,
    k: usize,
    v: RawBatch<T>,
    t: RawBatch<T>,
    c: RawBatch<T>,
    work: RawBatch<T>,
    one: T,
    minus_one: T,
    batch_count: usize,
) {
    if m == 0 || n == 0 || k == 0 || batch_count == 0 {
        return;
    }
    let bc = batch_count;
    let notran = trans == Operation::None;
    match (side, storev) {
        (Side::Left, StorageMode::ColumnWise) => {
            // V = [V1; V2] with V1 k x k unit lower, C = [C1; C2], W n x k
            blas::copy_adjoint(n, k, c, work, true, bc);
            blas::trmm_right(Uplo::Lower, Operation::None, Diag::Unit, n, k, one, v, work, bc);
            if m > k {
                blas::gemm(
                    Operation::ConjTranspose,
                    Operation::None,
                    n,
                    k,
                    m - k,
                    one,
                    c.shifted(idx2d(k, 0, c.inca, c.lda)),
                    v.shifted(idx2d(k, 0, v.inca, v.lda)),
                    one,
                    work,
                    bc,
                );
            }
            let tt = if notran {
                Operation::ConjTranspose
            } else {
                Operation::None
            };
            blas::trmm_right(Uplo::Upper, tt, Diag::NonUnit, n, k, one, t, work, bc);
            if m > k {
                blas::gemm(
                    Operation::None,
                    Operation::ConjTranspose,
                    m - k,
                    n,
                    k,
                    minus_one,
                    v.shifted(idx2d(k, 0, v.inca, v.lda)),
                    work,
                    one,
                    c.shifted(idx2d(k, 0, c.inca, c.lda)),
                    bc,
                );
            }
            blas::trmm_right(
                Uplo::Lower,
                Operation::ConjTranspose,
                Diag::Unit,
                n,
                k,
                one,
                v,
                work,
                bc,
            );
            blas::sub_adjoint(k, n, work, c, true, bc);
        }
        (Side::Right, StorageMode::ColumnWise) => {
            // V = [V1; V2] with V1 k x k unit lower, C = [C1 C2], W m x k
            blas::copy_block(m, k, c, work, bc);
            blas::trmm_right(Uplo::Lower, Operation::None, Diag::Unit, m, k, one, v, work, bc);
            if n > k {
                blas::gemm(
                    Operation::None,
                    Operation::None,
                    m,
                    k,
                    n - k,
                    one,
                    c.shifted(idx2d(0, k, c.inca, c.lda)),
                    v.shifted(idx2d(k, 0, v.inca, v.lda)),
                    one,
                    work,
                    bc,
                );
            }
            let tt = if notran {
                Operation::None
            } else {
                Operation::ConjTranspose
            };
            blas::trmm_right(Uplo::Upper, tt, Diag::NonUnit, m, k, one, t, work, bc);
            if n > k {
                blas::gemm(
                    Operation::None,
                    Operation::ConjTranspose,
                    m,
                    n - k,
                    k,
                    minus_one,
                    work,
                    v.shifted(idx2d(k, 0, v.inca, v.lda)),
                    one,
                    c.shifted(idx2d(0, k, c.inca, c.lda)),
                    bc,
                );
            }
            blas::trmm_right(
                Uplo::Lower,
                Operation::ConjTranspose,
                Diag::Unit,
                m,
                k,
                one,
                v,
                work,
                bc,
            );
            blas::sub_block(m, k, work, c, bc);
        }
        (Side::Left, StorageMode::RowWise) => {
            // V = [V1 V2] with V1 k x k unit upper, C = [C1; C2], W n x k
            blas::copy_adjoint(n, k, c, work, true, bc);
            blas::trmm_right(
                Uplo::Upper,
                Operation::ConjTranspose,
                Diag::Unit,
                n,
                k,
                one,
                v,
                work,
                bc,
            );
            if m > k {
                blas::gemm(
                    Operation::ConjTranspose,
                    Operation::ConjTranspose,
                    n,
                    k,
                    m - k,
                    one,
                    c.shifted(idx2d(k, 0, c.inca, c.lda)),
                    v.shifted(idx2d(0, k, v.inca, v.lda)),
                    one,
                    work,
                    bc,
                );
            }
            let tt = if notran {
                Operation::ConjTranspose
            } else {
                Operation::None
            };
            blas::trmm_right(Uplo::Upper, tt, Diag::NonUnit, n, k, one, t, work, bc);
            if m > k {
                blas::gemm(
                    Operation::ConjTranspose,
                    Operation::ConjTranspose,
                    m - k,
                    n,
                    k,
                    minus_one,
                    v.shifted(idx2d(0, k, v.inca, v.lda)),
                    work,
                    one,
                    c.shifted(idx2d(k, 0, c.inca, c.lda)),
                    bc,
                );
            }
            blas::trmm_right(Uplo::Upper, Operation::None, Diag::Unit, n, k, one, v, work, bc);
            blas::sub_adjoint(k, n, work, c, true, bc);
        }
        (Side::Right, StorageMode::RowWise) => {
            // V = [V1 V2] with V1 k x k unit upper, C = [C1 C2], W m x k
            blas::copy_block(m, k, c, work, bc);
            blas::trmm_right(
                Uplo::Upper,
                Operation::ConjTranspose,
                Diag::Unit,
                m,
                k,
                one,
                v,
                work,
                bc,
            );
            if n > k {
                blas::gemm(
                    Operation::None,
                    Operation::ConjTranspose,
                    m,
                    k,
                    n - k,
                    one,
                    c.shifted(idx2d(0, k, c.inca, c.lda)),
                    v.shifted(idx2d(0, k, v.inca, v.lda)),
                    one,
                    work,
                    bc,
                );
            }
            let tt = if notran {
                Operation::None
            } else {
                Operation::ConjTranspose
            };
            blas::trmm_right(Uplo::Upper, tt, Diag::NonUnit, m, k, one, t, work, bc);
            if n > k {
                blas::gemm(
                    Operation::None,
                    Operation::None,
                    m,
                    n - k,
                    k,
                    minus_one,
                    work,
                    v.shifted(idx2d(0, k, v.inca, v.lda)),
                    one,
                    c.shifted(idx2d(0, k, c.inca, c.lda)),
                    bc,
                );
            }
            blas::trmm_right(Uplo::Upper, Operation::None, Diag::Unit, m, k, one, v, work, bc);
            blas::sub_block(m, k, work, c, bc);
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub(super) fn larfb<T: Scalar>(
    side: Side,
    trans: Operation,
    direct: Direction,
    storev: StorageMode,
    k: usize,
    v: &mut MatrixBatchMut<'_, T>,
    t: &mut MatrixBatchMut<'_, T>,
    c: &mut MatrixBatchMut<'_, T>,
    ws: &mut Workspace<T>,
) -> Result<()> {
    if direct == Direction::Backward {
        return Err(Error::NotImplemented {
            feature: "backward reflector ordering",
        });
    }
    check_trans::<T>(trans)?;
    check_batch_uniform(&[
        ("v", v.layout(), v.batch_count()),
        ("t", t.layout(), t.batch_count()),
        ("c", c.layout(), c.batch_count()),
    ])?;
    check_geometry("v", v)?;
    check_geometry("t", t)?;
    check_geometry("c", c)?;
    let m = c.rows();
    let n = c.cols();
    let nq = match side {
        Side::Left => m,
        Side::Right => n,
    };
    if k < 1 || k > nq {
        return Err(Error::invalid_size(
            "k",
            "reflector count must be between 1 and the applied dimension",
        ));
    }
    let (vr, vc) = match storev {
        StorageMode::ColumnWise => (nq, k),
        StorageMode::RowWise => (k, nq),
    };
    if v.rows() != vr || v.cols() != vc {
        return Err(Error::invalid_size(
            "v",
            "reflector dimensions inconsistent with c, k and the storage mode",
        ));
    }
    if t.rows() != k || t.cols() != k {
        return Err(Error::invalid_size("t", "expected a k x k view"));
    }
    let bc = c.batch_count();
    check_capacity("v", v)?;
    check_capacity("t", t)?;
    check_capacity("c", c)?;
    check_workspace(
        ws,
        &workspace::larfb_workspace(side, m, n, k, c.layout(), bc),
    )?;
    if m == 0 || n == 0 || bc == 0 {
        return Ok(());
    }
    let Workspace {
        scalars,
        work,
        ptr_array,
        ..
    } = ws;
    let mut slots = PtrSlots::new(ptr_array);
    let rv = v.raw(slots.take(v.layout(), bc));
    let rt = t.raw(slots.take(t.layout(), bc));
    let rc = c.raw(slots.take(c.layout(), bc));
    let ldw = match side {
        Side::Left => n,
        Side::Right => m,
    };
    let w = RawBatch::packed(work.as_mut_ptr(), ldw * k, 1, ldw);
    unsafe {
        larfb_body(
            side, trans, storev, m, n, k, rv, rt, rc, w, scalars[0], scalars[1], bc,
        )
    };
    Ok(())
}
