//! Apply the orthogonal/unitary factor of an LQ factorization

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
use crate::runtime::cpu::blas;

/// Apply Q or Q^H reflector by reflector, row-stored reflectors
///
/// Each reflector row is conjugated around the application (the factorization
/// stores it conjugated), and tau is conjugated for the no-transpose case.
#[allow(clippy::too_many_arguments)]
pub(super) unsafe fn orml2_body<T: Scalar>(
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
    let nq = match side {
        Side::Left => m,
        Side::Right => n,
    };
    let ascending = match side {
        Side::Left => trans == Operation::None,
        Side::Right => trans != Operation::None,
    };
    let mut order: Vec<usize> = (0..k).collect();
    if !ascending {
        order.reverse();
    }
    let conj_tau = trans == Operation::None;
    for i in order {
        let (mi, ni, cv) = match side {
            Side::Left => (m - i, n, c.shifted(idx2d(i, 0, c.inca, c.lda))),
            Side::Right => (m, n - i, c.shifted(idx2d(0, i, c.inca, c.lda))),
        };
        let v = a.shifted(idx2d(i, i, a.inca, a.lda));
        if i + 1 < nq {
            blas::lacgv(
                nq - i - 1,
                a.shifted(idx2d(i, i + 1, a.inca, a.lda)),
                a.lda,
                batch_count,
            );
        }
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
            a.lda,
            tau.shifted(i),
            conj_tau,
            cv,
            w,
            one,
            zero,
            batch_count,
        );
        restore_diag(v, dv, batch_count);
        if i + 1 < nq {
            blas::lacgv(
                nq - i - 1,
                a.shifted(idx2d(i, i + 1, a.inca, a.lda)),
                a.lda,
                batch_count,
            );
        }
    }
}

/// Blocked application; the block applicator receives the flipped operation
/// because the stored rows represent the adjoint factor
#[allow(clippy::too_many_arguments)]
pub(super) unsafe fn ormlq_body<T: Scalar>(
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
        orml2_body(
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
        Side::Left => trans == Operation::None,
        Side::Right => trans != Operation::None,
    };
    let transt = if trans == Operation::None {
        Operation::ConjTranspose
    } else {
        Operation::None
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
            StorageMode::RowWise,
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
            transt,
            StorageMode::RowWise,
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
pub(super) fn ormlq<T: Scalar>(
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
    if a.cols() != nq || a.rows() < k {
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
        &workspace::ormlq_workspace(side, m, n, k, c.layout(), bc, cfg),
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
        ormlq_body(
            side, trans, m, n, k, ra, rt, rc, cfg, work, diag, trfact, scalars[0], scalars[1],
            scalars[2], bc,
        )
    };
    Ok(())
}
