//! Blocked LU factorization

use super::getf2::getf2_body;
use super::{
    check_capacity, check_geometry, check_info, check_vec_capacity, check_workspace, PtrSlots,
};
use crate::batch::{idx2d, MatrixBatchMut, RawBatch, RawVec, VecBatchMut};
use crate::dtype::Scalar;
use crate::error::Result;
use crate::lapack::{workspace, BlockConfig, Operation, Workspace};
use crate::runtime::cpu::blas::{self, Diag, Uplo};

/// Factor an m x n matrix in place, choosing once between the unblocked
/// panel kernel and the right-looking panel/update loop
#[allow(clippy::too_many_arguments)]
pub(super) unsafe fn getrf_body<T: Scalar>(
    m: usize,
    n: usize,
    a: RawBatch<T>,
    ipiv: Option<RawVec<i32>>,
    info: RawVec<i32>,
    cfg: BlockConfig,
    pivot_val: &mut [T],
    pivot_idx: &mut [i32],
    one: T,
    minus_one: T,
    batch_count: usize,
) {
    let dim = m.min(n);
    if dim == 0 || batch_count == 0 {
        return;
    }
    if dim <= cfg.switch_size {
        getf2_body(
            m, n, a, ipiv, 0, info, pivot_val, pivot_idx, minus_one, batch_count,
        );
        return;
    }
    let mut j = 0;
    while j < dim {
        let jb = (dim - j).min(cfg.block_size);
        // panel: rows j..m, columns j..j+jb; pivot entries come out global
        getf2_body(
            m - j,
            jb,
            a.shifted(idx2d(j, j, a.inca, a.lda)),
            ipiv.map(|p| p.shifted(j)),
            j,
            info,
            pivot_val,
            pivot_idx,
            minus_one,
            batch_count,
        );
        if let Some(ip) = ipiv {
            // replay the panel interchanges on the columns outside it
            if j > 0 {
                blas::laswp(j, a, j, j + jb, ip, true, batch_count);
            }
            if j + jb < n {
                blas::laswp(
                    n - j - jb,
                    a.shifted(idx2d(0, j + jb, a.inca, a.lda)),
                    j,
                    j + jb,
                    ip,
                    true,
                    batch_count,
                );
            }
        }
        if j + jb < n {
            blas::trsm_left(
                Uplo::Lower,
                Operation::None,
                Diag::Unit,
                jb,
                n - j - jb,
                one,
                a.shifted(idx2d(j, j, a.inca, a.lda)),
                a.shifted(idx2d(j, j + jb, a.inca, a.lda)),
                batch_count,
            );
            if j + jb < m {
                blas::gemm(
                    Operation::None,
                    Operation::None,
                    m - j - jb,
                    n - j - jb,
                    jb,
                    minus_one,
                    a.shifted(idx2d(j + jb, j, a.inca, a.lda)),
                    a.shifted(idx2d(j, j + jb, a.inca, a.lda)),
                    one,
                    a.shifted(idx2d(j + jb, j + jb, a.inca, a.lda)),
                    batch_count,
                );
            }
        }
        j += jb;
    }
}

pub(super) fn getrf<T: Scalar>(
    a: &mut MatrixBatchMut<'_, T>,
    mut ipiv: Option<&mut VecBatchMut<'_, i32>>,
    info: &mut [i32],
    cfg: BlockConfig,
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
    check_workspace(
        ws,
        &workspace::getrf_workspace(m, n, pivot, a.layout(), bc, cfg),
    )?;
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
    unsafe {
        getrf_body(
            m, n, ra, rp, ri, cfg, pivot_val, pivot_idx, scalars[0], scalars[1], bc,
        )
    };
    Ok(())
}
