//! Block-tridiagonal factorization and solve without pivoting

use super::getrf::getrf_body;
use super::getrs::getrs_body;
use super::{
    check_batch_uniform, check_capacity, check_geometry, check_info, check_workspace, PtrSlots,
};
use crate::batch::{idx2d, MatrixBatchMut, RawVec};
use crate::dtype::Scalar;
use crate::error::{Error, Result};
use crate::lapack::{workspace, BlockConfig, Operation, Workspace};
use crate::runtime::cpu::blas;

fn check_block_row<T: Scalar>(
    arg: &'static str,
    m: &MatrixBatchMut<'_, T>,
    nb: usize,
    blocks: usize,
) -> Result<()> {
    check_geometry(arg, m)?;
    if m.cols() != nb * blocks || (blocks > 0 && nb > 0 && m.rows() != nb) {
        return Err(Error::invalid_size(
            arg,
            "expected a row of nb x nb blocks stored side by side",
        ));
    }
    Ok(())
}

/// Factor a block-tridiagonal system in place: each step solves the current
/// diagonal factor into the super-diagonal block and eliminates it from the
/// next diagonal block, which is then LU-factored without pivoting
///
/// A singular diagonal block k reports `local + k * nb` through `info`,
/// first failure per instance only.
pub(super) fn geblttrf_npvt<T: Scalar>(
    nb: usize,
    nblocks: usize,
    a: &mut MatrixBatchMut<'_, T>,
    b: &mut MatrixBatchMut<'_, T>,
    c: &mut MatrixBatchMut<'_, T>,
    info: &mut [i32],
    ws: &mut Workspace<T>,
) -> Result<()> {
    check_batch_uniform(&[
        ("a", a.layout(), a.batch_count()),
        ("b", b.layout(), b.batch_count()),
        ("c", c.layout(), c.batch_count()),
    ])?;
    check_block_row("a", a, nb, nblocks.saturating_sub(1))?;
    check_block_row("b", b, nb, nblocks)?;
    check_block_row("c", c, nb, nblocks.saturating_sub(1))?;
    let bc = b.batch_count();
    check_info(info, bc)?;
    check_capacity("a", a)?;
    check_capacity("b", b)?;
    check_capacity("c", c)?;
    check_workspace(
        ws,
        &workspace::geblttrf_workspace(nb, nblocks, b.layout(), bc),
    )?;
    info[..bc].fill(0);
    if nb == 0 || nblocks == 0 || bc == 0 {
        return Ok(());
    }
    let Workspace {
        scalars,
        pivot_val,
        pivot_idx,
        iinfo,
        ptr_array,
        ..
    } = ws;
    let (one, minus_one) = (scalars[0], scalars[1]);
    let mut slots = PtrSlots::new(ptr_array);
    let ra = a.raw(slots.take(a.layout(), bc));
    let rb = b.raw(slots.take(b.layout(), bc));
    let rc = c.raw(slots.take(c.layout(), bc));
    let ri = RawVec::packed(info.as_mut_ptr(), 1);
    unsafe {
        getrf_body(
            nb,
            nb,
            rb,
            None,
            ri,
            BlockConfig::GETRF,
            pivot_val,
            pivot_idx,
            one,
            minus_one,
            bc,
        );
        for k in 0..nblocks - 1 {
            let bk = rb.shifted(idx2d(0, k * nb, rb.inca, rb.lda));
            let bk1 = rb.shifted(idx2d(0, (k + 1) * nb, rb.inca, rb.lda));
            let ak = ra.shifted(idx2d(0, k * nb, ra.inca, ra.lda));
            let ck = rc.shifted(idx2d(0, k * nb, rc.inca, rc.lda));
            getrs_body(Operation::None, nb, nb, bk, None, ck, one, bc);
            blas::gemm(
                Operation::None,
                Operation::None,
                nb,
                nb,
                nb,
                minus_one,
                ak,
                ck,
                one,
                bk1,
                bc,
            );
            iinfo.fill(0);
            let rii = RawVec::packed(iinfo.as_mut_ptr(), 1);
            getrf_body(
                nb,
                nb,
                bk1,
                None,
                rii,
                BlockConfig::GETRF,
                pivot_val,
                pivot_idx,
                one,
                minus_one,
                bc,
            );
            for bi in 0..bc {
                if info[bi] == 0 && iinfo[bi] != 0 {
                    info[bi] = iinfo[bi] + ((k + 1) * nb) as i32;
                }
            }
        }
    }
    Ok(())
}

/// Solve a factored block-tridiagonal system: a forward sweep eliminates the
/// sub-diagonal contributions and solves each diagonal factor, a backward
/// sweep removes the super-diagonal contributions
#[allow(clippy::too_many_arguments)]
pub(super) fn geblttrs_npvt<T: Scalar>(
    nb: usize,
    nblocks: usize,
    nrhs: usize,
    a: &mut MatrixBatchMut<'_, T>,
    b: &mut MatrixBatchMut<'_, T>,
    c: &mut MatrixBatchMut<'_, T>,
    x: &mut MatrixBatchMut<'_, T>,
    ws: &mut Workspace<T>,
) -> Result<()> {
    check_batch_uniform(&[
        ("a", a.layout(), a.batch_count()),
        ("b", b.layout(), b.batch_count()),
        ("c", c.layout(), c.batch_count()),
        ("x", x.layout(), x.batch_count()),
    ])?;
    check_block_row("a", a, nb, nblocks.saturating_sub(1))?;
    check_block_row("b", b, nb, nblocks)?;
    check_block_row("c", c, nb, nblocks.saturating_sub(1))?;
    check_geometry("x", x)?;
    if x.cols() != nrhs * nblocks || (nblocks > 0 && nb > 0 && nrhs > 0 && x.rows() != nb) {
        return Err(Error::invalid_size(
            "x",
            "expected nblocks panels of nb x nrhs stored side by side",
        ));
    }
    let bc = b.batch_count();
    check_capacity("a", a)?;
    check_capacity("b", b)?;
    check_capacity("c", c)?;
    check_capacity("x", x)?;
    check_workspace(
        ws,
        &workspace::geblttrs_workspace(nb, nblocks, nrhs, b.layout(), bc),
    )?;
    if nb == 0 || nblocks == 0 || nrhs == 0 || bc == 0 {
        return Ok(());
    }
    let Workspace {
        scalars, ptr_array, ..
    } = ws;
    let (one, minus_one) = (scalars[0], scalars[1]);
    let mut slots = PtrSlots::new(ptr_array);
    let ra = a.raw(slots.take(a.layout(), bc));
    let rb = b.raw(slots.take(b.layout(), bc));
    let rc = c.raw(slots.take(c.layout(), bc));
    let rx = x.raw(slots.take(x.layout(), bc));
    unsafe {
        for k in 0..nblocks {
            let xk = rx.shifted(idx2d(0, k * nrhs, rx.inca, rx.lda));
            if k > 0 {
                let xk_prev = rx.shifted(idx2d(0, (k - 1) * nrhs, rx.inca, rx.lda));
                let ak_prev = ra.shifted(idx2d(0, (k - 1) * nb, ra.inca, ra.lda));
                blas::gemm(
                    Operation::None,
                    Operation::None,
                    nb,
                    nrhs,
                    nb,
                    minus_one,
                    ak_prev,
                    xk_prev,
                    one,
                    xk,
                    bc,
                );
            }
            getrs_body(
                Operation::None,
                nb,
                nrhs,
                rb.shifted(idx2d(0, k * nb, rb.inca, rb.lda)),
                None,
                xk,
                one,
                bc,
            );
        }
        for k in (0..nblocks - 1).rev() {
            let xk = rx.shifted(idx2d(0, k * nrhs, rx.inca, rx.lda));
            let xk_next = rx.shifted(idx2d(0, (k + 1) * nrhs, rx.inca, rx.lda));
            let ck = rc.shifted(idx2d(0, k * nb, rc.inca, rc.lda));
            blas::gemm(
                Operation::None,
                Operation::None,
                nb,
                nrhs,
                nb,
                minus_one,
                ck,
                xk_next,
                one,
                xk,
                bc,
            );
        }
    }
    Ok(())
}
