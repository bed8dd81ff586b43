//! Apply the orthogonal/unitary factor of a QR factorization

use super::larf::{larf_body, restore_diag, save_diag_set_one};
use super::larfb::larfb_body;
use super::larft::larft_kernel;
use super::{
    check_batch_uniform, check_capacity, check_geometry, check_trans, check_vec_capacity,
    check_workspace, PtrSlots,
};
use crate::batch::{idx2d, MatrixBatchMut, RawBatch, RawVec, VecBatchMut};
use crate::dtype::Scalar;
use crate::error::{Error, Result};
use crate::lapack::{workspace, BlockConfig, Operation, Side, StorageMode, Workspace};

/// Apply Q or Q^H reflector by reflector
///
/// Q is applied in ascending reflector order for (left, transposed) and
/// (right, not transposed), descending otherwise, so each reflector sees the
/// partial product the factorization built it against.
#[allow(clippy::too_many_arguments)]
pub(super) unsafe fn orm2r_body<T: Scalar>(
    side: Side,
    trans: Operation,
    m: usize,
    n: usize,
    k: usize,
    a: RawBatch<T>,
    tau: RawVec<T>,
    c: RawBatch<T>,
    work: &mut [T],
    diag: &mut [T],
    one: T,
    zero: T,
    batch_count: usize,
) {
    if m == 0 || n == 0 || k == 0 || batch_count == 0 {
        return;
    }
    let dv = RawVec::packed(diag.as_mut_ptr(), 1);
    let ascending = match side {
        Side::Left => trans != Operation::None,
        Side::Right => trans == Operation::None,
    };
    let mut order: Vec<usize> = (0..k).collect();
    if !ascending {
        order.reverse();
    }
    let conj_tau = trans != Operation::None;
    for i in order {
        let (mi, ni, cv) = match side {
            Side::Left => (m - i, n, c.shifted(idx2d(i, 0, c.inca, c.lda))),
            Side::Right => (m, n - i, c.shifted(idx2d(0, i, c.inca, c.lda))),
        };
        let v = a.shifted(idx2d(i, i, a.inca, a.lda));
        let wlen = match side {
            Side::Left => ni,
            Side::Right => mi,
        };
        let w = RawBatch::packed(work.as_mut_ptr(), wlen, 1, wlen);
        save_diag_set_one(v, dv, batch_count);
        larf_body(
            side,
            mi,
            ni,
            v,
            a.inca,
            tau.shifted(i),
            conj_tau,
            cv,
            w,
            one,
            zero,
            batch_count,
        );
        restore_diag(v, dv, batch_count);
    }
}

/// Blocked application: per block, build the triangular factor and apply the
/// block reflector; falls back to the reflector-by-reflector path for small k
#[allow(clippy::too_many_arguments)]
pub(super) unsafe fn ormqr_body<T: Scalar>(
    side: Side,
    trans: Operation,
    m: usize,
    n: usize,
    k: usize,
    a: RawBatch<T>,
    tau: RawVec<T>,
    c: RawBatch<T>,
    cfg: BlockConfig,
    work: &mut [T],
    diag: &mut [T],
    trfact: &mut [T],
    one: T,
    minus_one: T,
    zero: T,
    batch_count: usize,
) {
    if m == 0 || n == 0 || k == 0 || batch_count == 0 {
        return;
    }
    if k <= cfg.switch_size {
        orm2r_body(
            side, trans, m, n, k, a, tau, c, work, diag, one, zero, batch_count,
        );
        return;
    }
    let nq = match side {
        Side::Left => m,
        Side::Right => n,
    };
    let nb = cfg.block_size.min(k);
    let ascending = match side {
        Side::Left => trans != Operation::None,
        Side::Right => trans == Operation::None,
    };
    let mut starts: Vec<usize> = (0..k).step_by(nb).collect();
    if !ascending {
        starts.reverse();
    }
    for i in starts {
        let ib = nb.min(k - i);
        let v = a.shifted(idx2d(i, i, a.inca, a.lda));
        let t = RawBatch::packed(trfact.as_mut_ptr(), ib * ib, 1, ib);
        larft_kernel(
            StorageMode::ColumnWise,
            nq - i,
            ib,
            v,
            tau.shifted(i),
            t,
            batch_count,
        );
        let (mi, ni, cv) = match side {
            Side::Left => (m - i, n, c.shifted(idx2d(i, 0, c.inca, c.lda))),
            Side::Right => (m, n - i, c.shifted(idx2d(0, i, c.inca, c.lda))),
        };
        let ldw = match side {
            Side::Left => ni,
            Side::Right => mi,
        };
        let w = RawBatch::packed(work.as_mut_ptr(), ldw * ib, 1, ldw);
        larfb_body(
            side,
            trans,
            StorageMode::ColumnWise,
            mi,
            ni,
            ib,
            v,
            t,
            cv,
            w,
            one,
            minus_one,
            batch_count,
        );
    }
}

#[allow(clippy::too_many_arguments)]
pub(super) fn ormqr<T: Scalar>(
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
    if k > nq {
        return Err(Error::invalid_size(
            "k",
            "more reflectors than the applied dimension",
        ));
    }
    if a.rows() != nq || a.cols() < k {
        return Err(Error::invalid_size(
            "a",
            "factor dimensions inconsistent with c and k",
        ));
    }
    let bc = c.batch_count();
    check_capacity("a", a)?;
    check_capacity("c", c)?;
    check_vec_capacity("tau", tau, k, bc)?;
    check_workspace(
        ws,
        &workspace::ormqr_workspace(side, m, n, k, c.layout(), bc, cfg),
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
    unsafe {
        ormqr_body(
            side, trans, m, n, k, ra, rt, rc, cfg, work, diag, trfact, scalars[0], scalars[1],
            scalars[2], bc,
        )
    };
    Ok(())
}
