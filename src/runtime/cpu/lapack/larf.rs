//! Householder reflector generation and single-reflector application

use super::{
    check_batch_uniform, check_capacity, check_geometry, check_vec_capacity, check_workspace,
    PtrSlots,
};
use crate::batch::{MatrixBatchMut, RawBatch, RawVec, VecBatchMut};
use crate::dtype::Scalar;
use crate::error::{Error, Result};
use crate::lapack::{workspace, Operation, Side, Workspace};
use crate::runtime::cpu::blas::{self, Alpha};

/// Overflow/underflow-safe Euclidean norm of the reflector tail
unsafe fn tail_norm<T: Scalar>(n: usize, xp: *mut T, incx: usize) -> f64 {
    let mut nrm = 0.0f64;
    for i in 0..n - 1 {
        let v = *xp.add(i * incx);
        nrm = nrm.hypot(v.re()).hypot(v.im());
    }
    nrm
}

/// Generate one reflector per instance: alpha receives beta, the tail of x
/// receives the reflector vector, tau its scalar factor
///
/// A zero tail with a real leading element yields tau = 0 (the identity).
/// When |beta| falls below the precision's safe minimum the inputs are
/// rescaled, tau and the tail are computed at the safe scale, and beta is
/// scaled back, so subnormal-magnitude columns still produce an accurate
/// reflector.
pub(super) unsafe fn larfg_kernel<T: Scalar>(
    n: usize,
    alpha: RawBatch<T>,
    x: RawBatch<T>,
    incx: usize,
    tau: RawVec<T>,
    batch_count: usize,
) {
    blas::for_each_batch(batch_count, n * batch_count, |b| unsafe {
        let ap = alpha.ptr(b);
        let xp = x.ptr(b);
        let mut a0 = *ap;
        let mut xnorm = tail_norm(n, xp, incx);
        if xnorm == 0.0 && a0.im() == 0.0 {
            *tau.at(b, 0) = T::zero();
            return;
        }
        let signed_norm = |a: T, xn: f64| {
            let norm = a.re().hypot(a.im()).hypot(xn);
            if a.re() >= 0.0 {
                -norm
            } else {
                norm
            }
        };
        let mut beta = signed_norm(a0, xnorm);
        let rsafmn = 1.0 / T::SAFE_MIN;
        let mut knt = 0u32;
        while beta.abs() < T::SAFE_MIN && knt < 20 {
            let up = T::from_real(rsafmn);
            for i in 0..n - 1 {
                let p = xp.add(i * incx);
                *p = up * *p;
            }
            a0 = up * a0;
            beta *= rsafmn;
            knt += 1;
        }
        if knt > 0 {
            // beta is now at least SAFE_MIN; redo the norm at the safe scale
            xnorm = tail_norm(n, xp, incx);
            beta = signed_norm(a0, xnorm);
        }
        *tau.at(b, 0) = T::from_re_im((beta - a0.re()) / beta, -a0.im() / beta);
        let scale = T::one() / (a0 - T::from_real(beta));
        for i in 0..n - 1 {
            let p = xp.add(i * incx);
            *p = scale * *p;
        }
        for _ in 0..knt {
            beta *= T::SAFE_MIN;
        }
        *ap = T::from_real(beta);
    });
}

/// Save the element at the descriptor origin and replace it with one (the
/// implicit unit head of a stored reflector)
pub(super) unsafe fn save_diag_set_one<T: Scalar>(
    a: RawBatch<T>,
    diag: RawVec<T>,
    batch_count: usize,
) {
    blas::for_each_batch(batch_count, batch_count, |b| unsafe {
        let p = a.ptr(b);
        *diag.at(b, 0) = *p;
        *p = T::one();
    });
}

pub(super) unsafe fn restore_diag<T: Scalar>(a: RawBatch<T>, diag: RawVec<T>, batch_count: usize) {
    blas::for_each_batch(batch_count, batch_count, |b| unsafe {
        *a.ptr(b) = *diag.at(b, 0);
    });
}

/// Apply H = I - tau v v^H (with conj(tau) when `conj_tau`) to an m x n view
/// of c, as one matrix-vector product into `work` and one rank-1 update
pub(super) unsafe fn larf_body<T: Scalar>(
    side: Side,
    m: usize,
    n: usize,
    v: RawBatch<T>,
    incv: usize,
    tau: RawVec<T>,
    conj_tau: bool,
    c: RawBatch<T>,
    work: RawBatch<T>,
    one: T,
    zero: T,
    batch_count: usize,
) {
    if m == 0 || n == 0 || batch_count == 0 {
        return;
    }
    let alpha = Alpha::Ptr {
        vec: tau,
        neg: true,
        conj: conj_tau,
    };
    match side {
        Side::Left => {
            // w := C^H v, then C -= tau v w^H
            blas::gemv(
                Operation::ConjTranspose,
                m,
                n,
                Alpha::Const(one),
                c,
                v,
                incv,
                zero,
                work,
                1,
                batch_count,
            );
            blas::ger(m, n, alpha, v, incv, work, 1, true, c, batch_count);
        }
        Side::Right => {
            // w := C v, then C -= tau w v^H
            blas::gemv(
                Operation::None,
                m,
                n,
                Alpha::Const(one),
                c,
                v,
                incv,
                zero,
                work,
                1,
                batch_count,
            );
            blas::ger(m, n, alpha, work, 1, v, incv, true, c, batch_count);
        }
    }
}

pub(super) fn larfg<T: Scalar>(
    alpha: &mut MatrixBatchMut<'_, T>,
    x: &mut MatrixBatchMut<'_, T>,
    tau: &mut VecBatchMut<'_, T>,
    ws: &mut Workspace<T>,
) -> Result<()> {
    check_batch_uniform(&[
        ("alpha", alpha.layout(), alpha.batch_count()),
        ("x", x.layout(), x.batch_count()),
    ])?;
    check_geometry("alpha", alpha)?;
    check_geometry("x", x)?;
    if alpha.rows() != 1 || alpha.cols() != 1 {
        return Err(Error::invalid_size("alpha", "expected a 1x1 view"));
    }
    if x.rows() != 1 {
        return Err(Error::invalid_size("x", "expected a single-row view"));
    }
    let n = x.cols() + 1;
    let bc = alpha.batch_count();
    check_capacity("alpha", alpha)?;
    check_capacity("x", x)?;
    check_vec_capacity("tau", tau, 1, bc)?;
    check_workspace(ws, &workspace::larfg_workspace(n, alpha.layout(), bc))?;
    if bc == 0 {
        return Ok(());
    }
    let mut slots = PtrSlots::new(&mut ws.ptr_array);
    let incx = x.lda();
    let ra = alpha.raw(slots.take(alpha.layout(), bc));
    let rx = x.raw(slots.take(x.layout(), bc));
    let rt = tau.raw();
    unsafe { larfg_kernel(n, ra, rx, incx, rt, bc) };
    Ok(())
}

pub(super) fn larf<T: Scalar>(
    side: Side,
    v: &mut MatrixBatchMut<'_, T>,
    tau: &mut VecBatchMut<'_, T>,
    c: &mut MatrixBatchMut<'_, T>,
    ws: &mut Workspace<T>,
) -> Result<()> {
    check_batch_uniform(&[
        ("v", v.layout(), v.batch_count()),
        ("c", c.layout(), c.batch_count()),
    ])?;
    check_geometry("v", v)?;
    check_geometry("c", c)?;
    let m = c.rows();
    let n = c.cols();
    let len = match side {
        Side::Left => m,
        Side::Right => n,
    };
    if v.rows() != 1 || v.cols() != len {
        return Err(Error::invalid_size(
            "v",
            "expected a 1xL view matching the applied dimension of c",
        ));
    }
    let bc = c.batch_count();
    check_capacity("v", v)?;
    check_capacity("c", c)?;
    check_vec_capacity("tau", tau, 1, bc)?;
    check_workspace(ws, &workspace::larf_workspace(side, m, n, c.layout(), bc))?;
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
    let incv = v.lda();
    let rv = v.raw(slots.take(v.layout(), bc));
    let rc = c.raw(slots.take(c.layout(), bc));
    let rt = tau.raw();
    let wlen = match side {
        Side::Left => n,
        Side::Right => m,
    };
    let w = RawBatch::packed(work.as_mut_ptr(), wlen, 1, wlen);
    unsafe { larf_body(side, m, n, rv, incv, rt, false, rc, w, scalars[0], scalars[2], bc) };
    Ok(())
}
