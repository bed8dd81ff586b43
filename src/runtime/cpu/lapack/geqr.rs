//! QR factorization (unblocked panel and blocked driver)

use super::larf::{larf_body, larfg_kernel, restore_diag, save_diag_set_one};
use super::larfb::larfb_body;
use super::larft::larft_kernel;
use super::{check_capacity, check_geometry, check_vec_capacity, check_workspace, PtrSlots};
use crate::batch::{idx2d, MatrixBatchMut, RawBatch, RawVec, VecBatchMut};
use crate::dtype::Scalar;
use crate::error::Result;
use crate::lapack::{workspace, BlockConfig, Operation, Side, StorageMode, Workspace};

/// Factor an m x n panel: reflector j zeroes column j below the diagonal,
/// R accumulates in the upper triangle
#[allow(clippy::too_many_arguments)]
pub(super) unsafe fn geqr2_body<T: Scalar>(
    m: usize,
    n: usize,
    a: RawBatch<T>,
    tau: RawVec<T>,
    work: &mut [T],
    diag: &mut [T],
    one: T,
    zero: T,
    batch_count: usize,
) {
    let dim = m.min(n);
    if dim == 0 || batch_count == 0 {
        return;
    }
    let dv = RawVec::packed(diag.as_mut_ptr(), 1);
    for j in 0..dim {
        let col = a.shifted(idx2d(j, j, a.inca, a.lda));
        larfg_kernel(
            m - j,
            col,
            a.shifted(idx2d((j + 1).min(m - 1), j, a.inca, a.lda)),
            a.inca,
            tau.shifted(j),
            batch_count,
        );
        if j + 1 < n {
            save_diag_set_one(col, dv, batch_count);
            let wlen = n - j - 1;
            let w = RawBatch::packed(work.as_mut_ptr(), wlen, 1, wlen);
            larf_body(
                Side::Left,
                m - j,
                n - j - 1,
                col,
                a.inca,
                tau.shifted(j),
                true,
                a.shifted(idx2d(j, j + 1, a.inca, a.lda)),
                w,
                one,
                zero,
                batch_count,
            );
            restore_diag(col, dv, batch_count);
        }
    }
}

/// Blocked driver: factor a panel, build its triangular factor, apply the
/// block reflector to the trailing columns, then finish the remainder
/// unblocked
#[allow(clippy::too_many_arguments)]
pub(super) unsafe fn geqrf_body<T: Scalar>(
    m: usize,
    n: usize,
    a: RawBatch<T>,
    tau: RawVec<T>,
    cfg: BlockConfig,
    work: &mut [T],
    diag: &mut [T],
    trfact: &mut [T],
    one: T,
    minus_one: T,
    zero: T,
    batch_count: usize,
) {
    let dim = m.min(n);
    if dim == 0 || batch_count == 0 {
        return;
    }
    if dim <= cfg.switch_size {
        geqr2_body(m, n, a, tau, work, diag, one, zero, batch_count);
        return;
    }
    let mut j = 0;
    while j < dim - cfg.switch_size {
        let jb = (dim - j).min(cfg.block_size);
        let panel = a.shifted(idx2d(j, j, a.inca, a.lda));
        geqr2_body(
            m - j,
            jb,
            panel,
            tau.shifted(j),
            work,
            diag,
            one,
            zero,
            batch_count,
        );
        if j + jb < n {
            let t = RawBatch::packed(trfact.as_mut_ptr(), jb * jb, 1, jb);
            larft_kernel(
                StorageMode::ColumnWise,
                m - j,
                jb,
                panel,
                tau.shifted(j),
                t,
                batch_count,
            );
            let ldw = n - j - jb;
            let w = RawBatch::packed(work.as_mut_ptr(), ldw * jb, 1, ldw);
            larfb_body(
                Side::Left,
                Operation::ConjTranspose,
                StorageMode::ColumnWise,
                m - j,
                n - j - jb,
                jb,
                panel,
                t,
                a.shifted(idx2d(j, j + jb, a.inca, a.lda)),
                w,
                one,
                minus_one,
                batch_count,
            );
        }
        j += jb;
    }
    if j < dim {
        geqr2_body(
            m - j,
            n - j,
            a.shifted(idx2d(j, j, a.inca, a.lda)),
            tau.shifted(j),
            work,
            diag,
            one,
            zero,
            batch_count,
        );
    }
}

pub(super) fn geqr2<T: Scalar>(
    a: &mut MatrixBatchMut<'_, T>,
    tau: &mut VecBatchMut<'_, T>,
    ws: &mut Workspace<T>,
) -> Result<()> {
    check_geometry("a", a)?;
    let m = a.rows();
    let n = a.cols();
    let bc = a.batch_count();
    check_capacity("a", a)?;
    check_vec_capacity("tau", tau, m.min(n), bc)?;
    check_workspace(ws, &workspace::geqr2_workspace(m, n, a.layout(), bc))?;
    if m == 0 || n == 0 || bc == 0 {
        return Ok(());
    }
    let Workspace {
        scalars,
        work,
        diag,
        ptr_array,
        ..
    } = ws;
    let mut slots = PtrSlots::new(ptr_array);
    let ra = a.raw(slots.take(a.layout(), bc));
    let rt = tau.raw();
    unsafe { geqr2_body(m, n, ra, rt, work, diag, scalars[0], scalars[2], bc) };
    Ok(())
}

pub(super) fn geqrf<T: Scalar>(
    a: &mut MatrixBatchMut<'_, T>,
    tau: &mut VecBatchMut<'_, T>,
    cfg: BlockConfig,
    ws: &mut Workspace<T>,
) -> Result<()> {
    check_geometry("a", a)?;
    let m = a.rows();
    let n = a.cols();
    let bc = a.batch_count();
    check_capacity("a", a)?;
    check_vec_capacity("tau", tau, m.min(n), bc)?;
    check_workspace(ws, &workspace::geqrf_workspace(m, n, a.layout(), bc, cfg))?;
    if m == 0 || n == 0 || bc == 0 {
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
    let rt = tau.raw();
    unsafe {
        geqrf_body(
            m, n, ra, rt, cfg, work, diag, trfact, scalars[0], scalars[1], scalars[2], bc,
        )
    };
    Ok(())
}
