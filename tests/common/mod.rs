//! Common test utilities
#![allow(dead_code)]

use batchr::dtype::Scalar;
use batchr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
use batchr::runtime::Runtime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Create a CPU client and device for testing
pub fn create_cpu_client() -> (CpuClient, CpuDevice) {
    let device = CpuDevice::new();
    let client = CpuRuntime::default_client(&device);
    (client, device)
}

/// Seeded generator so every test run sees the same matrices
pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Random entries in [-1, 1] (each component for complex types)
pub fn rand_data<T: Scalar>(rng: &mut StdRng, len: usize) -> Vec<T> {
    (0..len)
        .map(|_| {
            let re: f64 = rng.gen_range(-1.0..1.0);
            if T::IS_COMPLEX {
                T::from_re_im(re, rng.gen_range(-1.0..1.0))
            } else {
                T::from_real(re)
            }
        })
        .collect()
}

/// Push the diagonal of every instance away from zero so factorizations
/// without pivoting stay well conditioned
pub fn make_diag_dominant<T: Scalar>(
    data: &mut [T],
    n: usize,
    lda: usize,
    stride: usize,
    batch_count: usize,
) {
    let boost = T::from_real(n as f64 + 1.0);
    for b in 0..batch_count {
        for j in 0..n {
            let idx = b * stride + j * lda + j;
            data[idx] = data[idx] + boost;
        }
    }
}

/// Assert two slices are element-wise close: |a - b| <= tol * (1 + |b|)
pub fn assert_close<T: Scalar>(a: &[T], b: &[T], tol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (&x, &y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let bound = tol * (1.0 + y.abs());
        assert!(
            diff <= bound,
            "{}: element {} differs by {} (bound {})",
            msg,
            i,
            diff,
            bound
        );
    }
}

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Column-major reference product C = A * B, with C stored ldc = m
pub fn matmul<T: Scalar>(
    m: usize,
    k: usize,
    n: usize,
    a: &[T],
    lda: usize,
    b: &[T],
    ldb: usize,
) -> Vec<T> {
    let mut c = vec![T::zero(); m * n];
    for j in 0..n {
        for l in 0..k {
            let blj = b[l + j * ldb];
            for i in 0..m {
                c[i + j * m] = c[i + j * m] + a[i + l * lda] * blj;
            }
        }
    }
    c
}

/// Conjugate transpose of an m x n column-major matrix (plain transpose for
/// real types), stored n x m with lda = n
pub fn adjoint<T: Scalar>(m: usize, n: usize, a: &[T], lda: usize) -> Vec<T> {
    let mut at = vec![T::zero(); n * m];
    for j in 0..n {
        for i in 0..m {
            at[j + i * n] = a[i + j * lda].conj();
        }
    }
    at
}

/// Multiply the unit-lower and upper factors packed into one LU output
pub fn lu_reconstruct<T: Scalar>(m: usize, n: usize, f: &[T], lda: usize) -> Vec<T> {
    let dim = m.min(n);
    let mut l = vec![T::zero(); m * dim];
    for j in 0..dim {
        l[j + j * m] = T::one();
        for i in j + 1..m {
            l[i + j * m] = f[i + j * lda];
        }
    }
    let mut u = vec![T::zero(); dim * n];
    for j in 0..n {
        for i in 0..dim.min(j + 1) {
            u[i + j * dim] = f[i + j * lda];
        }
    }
    matmul(m, dim, n, &l, m, &u, dim)
}

/// Replay LU pivots on an m x n matrix: row j swaps with row ipiv[j] - 1,
/// in factorization order
pub fn apply_pivots<T: Scalar>(a: &mut [T], n: usize, lda: usize, ipiv: &[i32]) {
    for (j, &p) in ipiv.iter().enumerate() {
        let target = (p - 1) as usize;
        if target != j {
            for col in 0..n {
                a.swap(j + col * lda, target + col * lda);
            }
        }
    }
}

/// Upper triangle (including the diagonal) of an m x n factorization output,
/// zeros elsewhere, repacked with lda = m
pub fn upper_of<T: Scalar>(m: usize, n: usize, f: &[T], lda: usize) -> Vec<T> {
    let mut r = vec![T::zero(); m * n];
    for j in 0..n {
        for i in 0..m.min(j + 1) {
            r[i + j * m] = f[i + j * lda];
        }
    }
    r
}

/// Lower triangle (including the diagonal), zeros elsewhere, lda = m
pub fn lower_of<T: Scalar>(m: usize, n: usize, f: &[T], lda: usize) -> Vec<T> {
    let mut l = vec![T::zero(); m * n];
    for j in 0..n {
        for i in j..m {
            l[i + j * m] = f[i + j * lda];
        }
    }
    l
}

/// Repack a strided batch (stride = lda * cols) into the interleaved layout
/// with inca = batch_count, lda = batch_count * rows
pub fn to_interleaved<T: Scalar>(
    rows: usize,
    cols: usize,
    lda: usize,
    batch_count: usize,
    data: &[T],
) -> Vec<T> {
    let mut out = vec![T::zero(); rows * cols * batch_count];
    for b in 0..batch_count {
        for j in 0..cols {
            for i in 0..rows {
                out[b + i * batch_count + j * batch_count * rows] =
                    data[b * lda * cols + i + j * lda];
            }
        }
    }
    out
}

/// Inverse of [`to_interleaved`]: back to one packed matrix per instance
pub fn from_interleaved<T: Scalar>(
    rows: usize,
    cols: usize,
    batch_count: usize,
    data: &[T],
) -> Vec<T> {
    let mut out = vec![T::zero(); rows * cols * batch_count];
    for b in 0..batch_count {
        for j in 0..cols {
            for i in 0..rows {
                out[b * rows * cols + i + j * rows] =
                    data[b + i * batch_count + j * batch_count * rows];
            }
        }
    }
    out
}
