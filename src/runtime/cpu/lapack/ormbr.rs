//! Apply an orthogonal/unitary factor of a bidiagonalization

use super::ormlq::ormlq_body;
use super::ormqr::ormqr_body;
use super::{
    check_batch_uniform, check_capacity, check_geometry, check_trans, check_vec_capacity,
    check_workspace, PtrSlots,
};
use crate::batch::{idx2d, MatrixBatchMut, VecBatchMut};
use crate::dtype::Scalar;
use crate::error::{Error, Result};
use crate::lapack::{workspace, BlockConfig, Operation, Side, StorageMode, Workspace};

/// Apply Q (column-stored reflectors) or P (row-stored reflectors) from a
/// bidiagonalization of an nq x k (or k x nq) matrix to `c`
///
/// When the applied dimension nq exceeds k the reflectors start at the
/// origin and the QR/LQ applier runs directly. Otherwise the useful
/// reflectors sit one diagonal off the origin: the applied view of `c`
/// drops its first row (left) or column (right), and the reflector count is
/// nq - 1. The P factor applies through the LQ path with the operation
/// flipped, since the bidiagonalization stores P's adjoint.
#[allow(clippy::too_many_arguments)]
pub(super) fn ormbr<T: Scalar>(
    storev: StorageMode,
    side: Side,
    trans: Operation,
    k: usize,
    a: &mut MatrixBatchMut<'_, T>,
    tau: &mut VecBatchMut<'_, T>,
    c: &mut MatrixBatchMut<'_, T>,
    cfg: BlockConfig,
    ws: &mut Workspace<T>,
) -> Result<()> {
    check_trans::<T>(trans)?;
    check_batch_uniform(&[
        ("a", a.layout(), a.batch_count()),
        ("c", c.layout(), c.batch_count()),
    ])?;
    check_geometry("a", a)?;
    check_geometry("c", c)?;
    let m = c.rows();
    let n = c.cols();
    let nq = match side {
        Side::Left => m,
        Side::Right => n,
    };
    let nk = nq.min(k);
    let dims_ok = match storev {
        StorageMode::ColumnWise => a.rows() >= nq && a.cols() >= nk,
        StorageMode::RowWise => a.rows() >= nk && a.cols() >= nq,
    };
    if !dims_ok {
        return Err(Error::invalid_size(
            "a",
            "factor dimensions inconsistent with c, k and the storage mode",
        ));
    }
    let bc = c.batch_count();
    check_capacity("a", a)?;
    check_capacity("c", c)?;
    check_vec_capacity("tau", tau, nk, bc)?;
    check_workspace(
        ws,
        &workspace::ormbr_workspace(storev, side, m, n, k, c.layout(), bc, cfg),
    )?;
    if m == 0 || n == 0 || k == 0 || bc == 0 {
        return Ok(());
    }
    let Workspace {
        scalars,
        work,
        diag,
        trfact,
        ptr_array,
        ..
    } = ws;
    let mut slots = PtrSlots::new(ptr_array);
    let ra = a.raw(slots.take(a.layout(), bc));
    let rc = c.raw(slots.take(c.layout(), bc));
    let rt = tau.raw();
    let (one, minus_one, zero) = (scalars[0], scalars[1], scalars[2]);
    match storev {
        StorageMode::ColumnWise => {
            if nq > k {
                unsafe {
                    ormqr_body(
                        side, trans, m, n, k, ra, rt, rc, cfg, work, diag, trfact, one, minus_one,
                        zero, bc,
                    )
                };
            } else if nq > 1 {
                let (mi, ni, cshift) = match side {
                    Side::Left => (m - 1, n, idx2d(1, 0, rc.inca, rc.lda)),
                    Side::Right => (m, n - 1, idx2d(0, 1, rc.inca, rc.lda)),
                };
                unsafe {
                    ormqr_body(
                        side,
                        trans,
                        mi,
                        ni,
                        nq - 1,
                        ra.shifted(idx2d(1, 0, ra.inca, ra.lda)),
                        rt,
                        rc.shifted(cshift),
                        cfg,
                        work,
                        diag,
                        trfact,
                        one,
                        minus_one,
                        zero,
                        bc,
                    )
                };
            }
        }
        StorageMode::RowWise => {
            let transp = if trans == Operation::None {
                if T::IS_COMPLEX {
                    Operation::ConjTranspose
                } else {
                    Operation::Transpose
                }
            } else {
                Operation::None
            };
            if nq > k {
                unsafe {
                    ormlq_body(
                        side, transp, m, n, k, ra, rt, rc, cfg, work, diag, trfact, one, minus_one,
                        zero, bc,
                    )
                };
            } else if nq > 1 {
                let (mi, ni, cshift) = match side {
                    Side::Left => (m - 1, n, idx2d(1, 0, rc.inca, rc.lda)),
                    Side::Right => (m, n - 1, idx2d(0, 1, rc.inca, rc.lda)),
                };
                unsafe {
                    ormlq_body(
                        side,
                        transp,
                        mi,
                        ni,
                        nq - 1,
                        ra.shifted(idx2d(0, 1, ra.inca, ra.lda)),
                        rt,
                        rc.shifted(cshift),
                        cfg,
                        work,
                        diag,
                        trfact,
                        one,
                        minus_one,
                        zero,
                        bc,
                    )
                };
            }
        }
    }
    Ok(())
}
