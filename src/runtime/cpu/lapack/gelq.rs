//! LQ factorization (unblocked panel and blocked driver)

use super::larf::{larf_body, larfg_kernel, restore_diag, save_diag_set_one};
use super::larfb::larfb_body;
use super::larft::larft_kernel;
use super::{check_capacity, check_geometry, check_vec_capacity, check_workspace, PtrSlots};
use crate::batch::{idx2d, MatrixBatchMut, RawBatch, RawVec, VecBatchMut};
use crate::dtype::Scalar;
use crate::error::Result;
use crate::lapack::{workspace, BlockConfig, Operation, Side, StorageMode, Workspace};
use crate::runtime::cpu::blas;

/// Factor an m x n panel: reflector j zeroes row j right of the diagonal,
/// L accumulates in the lower triangle
///
/// Complex rows are conjugated around the reflector generation so the stored
/// vectors follow the row-reflector convention the appliers expect.
#[allow(clippy::too_many_arguments)]
pub(super) unsafe fn gelq2_body<T: Scalar>(
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
        let row = a.shifted(idx2d(j, j, a.inca, a.lda));
        blas::lacgv(n - j, row, a.lda, batch_count);
        larfg_kernel(
            n - j,
            row,
            a.shifted(idx2d(j, (j + 1).min(n - 1), a.inca, a.lda)),
            a.lda,
            tau.shifted(j),
            batch_count,
        );
        if j + 1 < m {
            save_diag_set_one(row, dv, batch_count);
            let wlen = m - j - 1;
            let w = RawBatch::packed(work.as_mut_ptr(), wlen, 1, wlen);
            larf_body(
                Side::Right,
                m - j - 1,
                n - j,
                row,
                a.lda,
                tau.shifted(j),
                false,
                a.shifted(idx2d(j + 1, j, a.inca, a.lda)),
                w,
                one,
                zero,
                batch_count,
            );
            restore_diag(row, dv, batch_count);
        }
        blas::lacgv(n - j, row, a.lda, batch_count);
    }
}

#[allow(clippy::too_many_arguments)]
pub(super) unsafe fn gelqf_body<T: Scalar>(
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
        gelq2_body(m, n, a, tau, work, diag, one, zero, batch_count);
        return;
    }
    let mut j = 0;
    while j < dim - cfg.switch_size {
        let jb = (dim - j).min(cfg.block_size);
        let panel = a.shifted(idx2d(j, j, a.inca, a.lda));
        gelq2_body(
            jb,
            n - j,
            panel,
            tau.shifted(j),
            work,
            diag,
            one,
            zero,
            batch_count,
        );
        if j + jb < m {
            let t = RawBatch::packed(trfact.as_mut_ptr(), jb * jb, 1, jb);
            larft_kernel(
                StorageMode::RowWise,
                n - j,
                jb,
                panel,
                tau.shifted(j),
                t,
                batch_count,
            );
            let ldw = m - j - jb;
            let w = RawBatch::packed(work.as_mut_ptr(), ldw * jb, 1, ldw);
            larfb_body(
                Side::Right,
                Operation::None,
                StorageMode::RowWise,
                m - j - jb,
                n - j,
                jb,
                panel,
                t,
                a.shifted(idx2d(j + jb, j, a.inca, a.lda)),
                w,
                one,
                minus_one,
                batch_count,
            );
        }
        j += jb;
    }
    if j < dim {
        gelq2_body(
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

pub(super) fn gelq2<T: Scalar>(
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
    check_workspace(ws, &workspace::gelq2_workspace(m, n, a.layout(), bc))?;
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
    unsafe { gelq2_body(m, n, ra, rt, work, diag, scalars[0], scalars[2], bc) };
    Ok(())
}

pub(super) fn gelqf<T: Scalar>(
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
    check_workspace(ws, &workspace::gelqf_workspace(m, n, a.layout(), bc, cfg))?;
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
        gelqf_body(
            m, n, ra, rt, cfg, work, diag, trfact, scalars[0], scalars[1], scalars[2], bc,
        )
    };
    Ok(())
}
