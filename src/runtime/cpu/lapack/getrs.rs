//! Solve from an LU factorization

use super::{
    check_batch_uniform, check_capacity, check_geometry, check_vec_capacity, check_workspace,
    PtrSlots,
};
use crate::batch::{MatrixBatchMut, RawBatch, RawVec, VecBatchMut};
use crate::dtype::Scalar;
use crate::error::{Error, Result};
use crate::lapack::{workspace, Operation, Workspace};
use crate::runtime::cpu::blas::{self, Diag, Uplo};

/// Solve op(A) X = B in place on `b` from a factored `a`
///
/// The no-transpose path replays the interchanges first and substitutes
/// L then U; the transpose paths substitute in the opposite order and undo
/// the interchanges last.
pub(super) unsafe fn getrs_body<T: Scalar>(
    trans: Operation,
    n: usize,
    nrhs: usize,
    a: RawBatch<T>,
    ipiv: Option<RawVec<i32>>,
    b: RawBatch<T>,
    one: T,
    batch_count: usize,
) {
    if n == 0 || nrhs == 0 || batch_count == 0 {
        return;
    }
    match trans {
        Operation::None => {
            if let Some(ip) = ipiv {
                blas::laswp(nrhs, b, 0, n, ip, true, batch_count);
            }
            blas::trsm_left(
                Uplo::Lower,
                Operation::None,
                Diag::Unit,
                n,
                nrhs,
                one,
                a,
                b,
                batch_count,
            );
            blas::trsm_left(
                Uplo::Upper,
                Operation::None,
                Diag::NonUnit,
                n,
                nrhs,
                one,
                a,
                b,
                batch_count,
            );
        }
        op => {
            blas::trsm_left(Uplo::Upper, op, Diag::NonUnit, n, nrhs, one, a, b, batch_count);
            blas::trsm_left(Uplo::Lower, op, Diag::Unit, n, nrhs, one, a, b, batch_count);
            if let Some(ip) = ipiv {
                blas::laswp(nrhs, b, 0, n, ip, false, batch_count);
            }
        }
    }
}

pub(super) fn getrs<T: Scalar>(
    trans: Operation,
    a: &mut MatrixBatchMut<'_, T>,
    mut ipiv: Option<&mut VecBatchMut<'_, i32>>,
    b: &mut MatrixBatchMut<'_, T>,
    ws: &mut Workspace<T>,
) -> Result<()> {
    check_batch_uniform(&[
        ("a", a.layout(), a.batch_count()),
        ("b", b.layout(), b.batch_count()),
    ])?;
    check_geometry("a", a)?;
    check_geometry("b", b)?;
    if a.rows() != a.cols() {
        return Err(Error::invalid_size("a", "expected a square factor"));
    }
    let n = a.rows();
    let nrhs = b.cols();
    if b.rows() != n {
        return Err(Error::invalid_size(
            "b",
            "right-hand side rows must match the factor order",
        ));
    }
    let bc = a.batch_count();
    check_capacity("a", a)?;
    check_capacity("b", b)?;
    if let Some(p) = ipiv.as_deref() {
        check_vec_capacity("ipiv", p, n, bc)?;
    }
    check_workspace(ws, &workspace::getrs_workspace(n, nrhs, a.layout(), bc))?;
    if n == 0 || nrhs == 0 || bc == 0 {
        return Ok(());
    }
    let Workspace {
        scalars, ptr_array, ..
    } = ws;
    let mut slots = PtrSlots::new(ptr_array);
    let ra = a.raw(slots.take(a.layout(), bc));
    let rb = b.raw(slots.take(b.layout(), bc));
    let rp = ipiv.as_mut().map(|p| p.raw());
    unsafe { getrs_body(trans, n, nrhs, ra, rp, rb, scalars[0], bc) };
    Ok(())
}
