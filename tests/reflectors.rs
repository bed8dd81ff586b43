//! Householder reflector kernels

mod common;

use batchr::batch::{Layout, MatrixBatchMut, VecBatchMut};
use batchr::dtype::{Complex128, Scalar};
use batchr::lapack::{workspace, Direction, Lapack, Operation, Side, StorageMode, Workspace};
use common::*;

#[test]
fn test_larfg_annihilates_the_tail() {
    let (client, _) = create_cpu_client();
    let mut r = rng(51);
    let n = 4;
    let bc = 2;
    let alpha_orig: Vec<f64> = rand_data(&mut r, bc);
    let x_orig: Vec<f64> = rand_data(&mut r, (n - 1) * bc);
    let mut alpha_data = alpha_orig.clone();
    let mut x_data = x_orig.clone();
    let mut tau_data = vec![0.0f64; bc];

    let req = workspace::larfg_workspace(n, Layout::Strided, bc);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    let mut alpha = MatrixBatchMut::strided(1, 1, 1, 1, bc, &mut alpha_data);
    let mut x = MatrixBatchMut::strided(1, n - 1, 1, n - 1, bc, &mut x_data);
    let mut tau = VecBatchMut::new(&mut tau_data, 1);
    client.larfg(&mut alpha, &mut x, &mut tau, &mut ws).unwrap();

    for b in 0..bc {
        // H applied to the original vector must leave [beta, 0, ..., 0]
        let mut v = vec![1.0f64];
        v.extend_from_slice(&x_data[b * (n - 1)..(b + 1) * (n - 1)]);
        let mut orig = vec![alpha_orig[b]];
        orig.extend_from_slice(&x_orig[b * (n - 1)..(b + 1) * (n - 1)]);
        let dot: f64 = v.iter().zip(&orig).map(|(a, c)| a * c).sum();
        for i in 0..n {
            let h = orig[i] - tau_data[b] * v[i] * dot;
            let want = if i == 0 { alpha_data[b] } else { 0.0 };
            assert!((h - want).abs() < 1e-13, "instance {} entry {}", b, i);
        }
        // the stored beta has the opposite sign of alpha and the full norm
        let norm: f64 = orig.iter().map(|e| e * e).sum::<f64>().sqrt();
        assert!((alpha_data[b].abs() - norm).abs() < 1e-13);
    }
}

#[test]
fn test_larfg_zero_tail_is_identity() {
    let (client, _) = create_cpu_client();
    let n = 3;
    let mut alpha_data = vec![1.5f64];
    let mut x_data = vec![0.0f64; n - 1];
    let mut tau_data = vec![9.0f64];

    let req = workspace::larfg_workspace(n, Layout::Strided, 1);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    let mut alpha = MatrixBatchMut::strided(1, 1, 1, 1, 1, &mut alpha_data);
    let mut x = MatrixBatchMut::strided(1, n - 1, 1, n - 1, 1, &mut x_data);
    let mut tau = VecBatchMut::new(&mut tau_data, 1);
    client.larfg(&mut alpha, &mut x, &mut tau, &mut ws).unwrap();

    assert_eq!(tau_data[0], 0.0);
    assert_eq!(alpha_data[0], 1.5);
    assert_eq!(x_data, vec![0.0; n - 1]);
}

#[test]
fn test_larfg_rescales_subnormal_input() {
    let (client, _) = create_cpu_client();
    let n = 2;
    // subnormal magnitudes: a naive sum of squares underflows to zero here
    let a0 = 3.0e-310f64;
    let x0 = 4.0e-310f64;
    let mut alpha_data = vec![a0];
    let mut x_data = vec![x0];
    let mut tau_data = vec![0.0f64];

    let req = workspace::larfg_workspace(n, Layout::Strided, 1);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    let mut alpha = MatrixBatchMut::strided(1, 1, 1, 1, 1, &mut alpha_data);
    let mut x = MatrixBatchMut::strided(1, n - 1, 1, n - 1, 1, &mut x_data);
    let mut tau = VecBatchMut::new(&mut tau_data, 1);
    client.larfg(&mut alpha, &mut x, &mut tau, &mut ws).unwrap();

    // 3-4-5 vector scaled to subnormal range: beta = -5e-310,
    // tau = (beta - a0)/beta = 1.6, v = x/(a0 - beta) = 0.5
    assert!((tau_data[0] - 1.6).abs() < 1e-12, "tau = {}", tau_data[0]);
    assert!((x_data[0] - 0.5).abs() < 1e-12, "v = {}", x_data[0]);
    assert!(
        (alpha_data[0] / 5.0e-310 + 1.0).abs() < 1e-10,
        "beta = {:e}",
        alpha_data[0]
    );
}

#[test]
fn test_larf_matches_manual_application() {
    let (client, _) = create_cpu_client();
    let mut r = rng(52);
    let (m, n) = (3, 2);
    let v_data_orig: Vec<Complex128> = {
        let mut v = rand_data::<Complex128>(&mut r, m);
        v[0] = Complex128::ONE;
        v
    };
    let tau_val = Complex128::new(0.4, -0.2);
    let c_orig: Vec<Complex128> = rand_data(&mut r, m * n);

    let mut v_data = v_data_orig.clone();
    let mut tau_data = vec![tau_val];
    let mut c_data = c_orig.clone();
    let req = workspace::larf_workspace(Side::Left, m, n, Layout::Strided, 1);
    let mut ws = Workspace::<Complex128>::alloc(&req).unwrap();
    let mut v = MatrixBatchMut::strided(1, m, 1, m, 1, &mut v_data);
    let mut tau = VecBatchMut::new(&mut tau_data, 1);
    let mut c = MatrixBatchMut::strided(m, n, m, m * n, 1, &mut c_data);
    client.larf(Side::Left, &mut v, &mut tau, &mut c, &mut ws).unwrap();

    // H C = C - tau v (v^H C)
    for j in 0..n {
        let mut dot = Complex128::ZERO;
        for i in 0..m {
            dot = dot + v_data_orig[i].conj() * c_orig[i + j * m];
        }
        for i in 0..m {
            let want = c_orig[i + j * m] - tau_val * v_data_orig[i] * dot;
            let got = c_data[i + j * m];
            assert!((got - want).abs() < 1e-13, "({}, {})", i, j);
        }
    }
}

#[test]
fn test_larft_zero_tau_zeroes_the_column() {
    let (client, _) = create_cpu_client();
    let mut r = rng(53);
    let (n, k) = (5, 2);
    let mut v_data: Vec<f64> = rand_data(&mut r, n * k);
    v_data[0] = 1.0;
    v_data[1 + n] = 1.0;
    let mut tau_data = vec![0.3f64, 0.0];
    let mut t_data = vec![-1.0f64; k * k];

    let req = workspace::larft_workspace(n, k, Layout::Strided, 1);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    let mut v = MatrixBatchMut::strided(n, k, n, n * k, 1, &mut v_data);
    let mut tau = VecBatchMut::new(&mut tau_data, k);
    let mut t = MatrixBatchMut::strided(k, k, k, k * k, 1, &mut t_data);
    client
        .larft(Direction::Forward, StorageMode::ColumnWise, n, k, &mut v, &mut tau, &mut t, &mut ws)
        .unwrap();

    assert_eq!(t_data[0], 0.3);
    assert_eq!(t_data[2], 0.0);
    assert_eq!(t_data[3], 0.0);
}

fn block_vs_sequential(storev: StorageMode) {
    let (client, _) = create_cpu_client();
    let mut r = rng(54);
    let (nq, k, ncols) = (6usize, 2usize, 3usize);
    // forward-ordered reflectors with explicit unit heads and zeros on the
    // flat side, arbitrary tau
    let (vr, vc) = match storev {
        StorageMode::ColumnWise => (nq, k),
        StorageMode::RowWise => (k, nq),
    };
    let mut v_data: Vec<f64> = rand_data(&mut r, vr * vc);
    for j in 0..k {
        for i in 0..k {
            let idx = match storev {
                StorageMode::ColumnWise => i + j * nq,
                StorageMode::RowWise => j + i * k,
            };
            if i == j {
                v_data[idx] = 1.0;
            } else if i < j {
                v_data[idx] = 0.0;
            }
        }
    }
    let mut tau_data = vec![0.7f64, -0.4];
    let c_orig: Vec<f64> = rand_data(&mut r, nq * ncols);

    // blocked: T then one larfb
    let mut t_data = vec![0.0f64; k * k];
    let mut blocked = c_orig.clone();
    let req = workspace::larft_workspace(nq, k, Layout::Strided, 1).max(
        workspace::larfb_workspace(Side::Left, nq, ncols, k, Layout::Strided, 1),
    );
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    let mut v = MatrixBatchMut::strided(vr, vc, vr, vr * vc, 1, &mut v_data);
    let mut tau = VecBatchMut::new(&mut tau_data, k);
    let mut t = MatrixBatchMut::strided(k, k, k, k * k, 1, &mut t_data);
    client
        .larft(Direction::Forward, storev, nq, k, &mut v, &mut tau, &mut t, &mut ws)
        .unwrap();
    let mut c = MatrixBatchMut::strided(nq, ncols, nq, nq * ncols, 1, &mut blocked);
    client
        .larfb(Side::Left, Operation::None, Direction::Forward, storev, k, &mut v, &mut t, &mut c, &mut ws)
        .unwrap();

    // sequential: H C = H(1) (H(2) C)
    let mut seq = c_orig;
    let req = workspace::larf_workspace(Side::Left, nq, ncols, Layout::Strided, 1);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    for j in (0..k).rev() {
        let mut vj: Vec<f64> = (0..nq)
            .map(|i| match storev {
                StorageMode::ColumnWise => v_data[i + j * nq],
                StorageMode::RowWise => v_data[j + i * k],
            })
            .collect();
        let mut tj = vec![tau_data[j]];
        let mut vv = MatrixBatchMut::strided(1, nq, 1, nq, 1, &mut vj);
        let mut tv = VecBatchMut::new(&mut tj, 1);
        let mut cv = MatrixBatchMut::strided(nq, ncols, nq, nq * ncols, 1, &mut seq);
        client.larf(Side::Left, &mut vv, &mut tv, &mut cv, &mut ws).unwrap();
    }

    assert_close(&blocked, &seq, 1e-13, "block reflector vs sequential");
}

#[test]
fn test_larfb_columnwise_matches_sequential() {
    block_vs_sequential(StorageMode::ColumnWise);
}

#[test]
fn test_larfb_rowwise_matches_sequential() {
    block_vs_sequential(StorageMode::RowWise);
}

#[test]
fn test_backward_ordering_is_not_implemented() {
    let (client, _) = create_cpu_client();
    let (n, k) = (4, 2);
    let mut v_data = vec![0.0f64; n * k];
    let mut tau_data = vec![0.0f64; k];
    let mut t_data = vec![0.0f64; k * k];
    let mut c_data = vec![0.0f64; n];
    let mut ws = Workspace::<f64>::alloc(&workspace::larft_workspace(n, k, Layout::Strided, 1)).unwrap();

    let mut v = MatrixBatchMut::strided(n, k, n, n * k, 1, &mut v_data);
    let mut tau = VecBatchMut::new(&mut tau_data, k);
    let mut t = MatrixBatchMut::strided(k, k, k, k * k, 1, &mut t_data);
    let err = client
        .larft(Direction::Backward, StorageMode::ColumnWise, n, k, &mut v, &mut tau, &mut t, &mut ws)
        .unwrap_err();
    assert!(matches!(err, batchr::error::Error::NotImplemented { .. }));

    let mut c = MatrixBatchMut::strided(n, 1, n, n, 1, &mut c_data);
    let err = client
        .larfb(
            Side::Left,
            Operation::None,
            Direction::Backward,
            StorageMode::ColumnWise,
            k,
            &mut v,
            &mut t,
            &mut c,
            &mut ws,
        )
        .unwrap_err();
    assert!(matches!(err, batchr::error::Error::NotImplemented { .. }));
}
