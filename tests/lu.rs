//! LU factorization and solve

mod common;

use batchr::batch::{MatrixBatchMut, VecBatchMut};
use batchr::dtype::Complex128;
use batchr::lapack::{workspace, BlockConfig, Lapack, Operation, Workspace};
use common::*;

#[test]
fn test_getf2_plu_reconstruction() {
    let (client, _) = create_cpu_client();
    let mut r = rng(11);
    let n = 5;
    let bc = 3;
    let stride = n * n;
    let orig: Vec<f64> = rand_data(&mut r, stride * bc);
    let mut fact = orig.clone();
    let mut ipiv_data = vec![0i32; n * bc];
    let mut info = vec![-1i32; bc];

    let req = workspace::getf2_workspace(n, n, true, batchr::batch::Layout::Strided, bc);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    let mut a = MatrixBatchMut::strided(n, n, n, stride, bc, &mut fact);
    let mut ipiv = VecBatchMut::new(&mut ipiv_data, n);
    client.getf2(&mut a, Some(&mut ipiv), &mut info, &mut ws).unwrap();

    assert_eq!(info, vec![0; bc]);
    for b in 0..bc {
        let lu = lu_reconstruct(n, n, &fact[b * stride..(b + 1) * stride], n);
        let mut pa = orig[b * stride..(b + 1) * stride].to_vec();
        apply_pivots(&mut pa, n, n, &ipiv_data[b * n..(b + 1) * n]);
        assert_close(&lu, &pa, 1e-12, "PA = LU");
    }
}

#[test]
fn test_getf2_rectangular() {
    let (client, _) = create_cpu_client();
    let mut r = rng(12);
    for (m, n) in [(6usize, 4usize), (3, 5)] {
        let dim = m.min(n);
        let orig: Vec<f64> = rand_data(&mut r, m * n);
        let mut fact = orig.clone();
        let mut ipiv_data = vec![0i32; dim];
        let mut info = vec![0i32; 1];

        let req = workspace::getf2_workspace(m, n, true, batchr::batch::Layout::Strided, 1);
        let mut ws = Workspace::<f64>::alloc(&req).unwrap();
        let mut a = MatrixBatchMut::strided(m, n, m, m * n, 1, &mut fact);
        let mut ipiv = VecBatchMut::new(&mut ipiv_data, dim);
        client.getf2(&mut a, Some(&mut ipiv), &mut info, &mut ws).unwrap();

        assert_eq!(info[0], 0);
        let lu = lu_reconstruct(m, n, &fact, m);
        let mut pa = orig.clone();
        apply_pivots(&mut pa, n, m, &ipiv_data);
        assert_close(&lu, &pa, 1e-12, "rectangular PA = LU");
    }
}

#[test]
fn test_getrf_blocked_matches_unblocked() {
    let (client, _) = create_cpu_client();
    let mut r = rng(13);
    let n = 8;
    let bc = 2;
    let stride = n * n;
    let orig: Vec<f64> = rand_data(&mut r, stride * bc);
    let layout = batchr::batch::Layout::Strided;

    let mut unblocked = orig.clone();
    let mut piv_u = vec![0i32; n * bc];
    let mut info_u = vec![0i32; bc];
    let req = workspace::getf2_workspace(n, n, true, layout, bc);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    let mut a = MatrixBatchMut::strided(n, n, n, stride, bc, &mut unblocked);
    let mut ipiv = VecBatchMut::new(&mut piv_u, n);
    client.getf2(&mut a, Some(&mut ipiv), &mut info_u, &mut ws).unwrap();

    // small block size forces the panel/update loop
    let cfg = BlockConfig::new(2, 2);
    let mut blocked = orig;
    let mut piv_b = vec![0i32; n * bc];
    let mut info_b = vec![0i32; bc];
    let req = workspace::getrf_workspace(n, n, true, layout, bc, cfg);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    let mut a = MatrixBatchMut::strided(n, n, n, stride, bc, &mut blocked);
    let mut ipiv = VecBatchMut::new(&mut piv_b, n);
    client.getrf(&mut a, Some(&mut ipiv), &mut info_b, cfg, &mut ws).unwrap();

    assert_eq!(info_u, info_b);
    assert_eq!(piv_u, piv_b);
    assert_close(&blocked, &unblocked, 1e-12, "blocked vs unblocked LU");
}

#[test]
fn test_getrf_four_by_four_block_two() {
    let (client, _) = create_cpu_client();
    let mut r = rng(20);
    let n = 4;
    let orig: Vec<f64> = rand_data(&mut r, n * n);
    let layout = batchr::batch::Layout::Strided;

    let mut unblocked = orig.clone();
    let mut piv_u = vec![0i32; n];
    let mut info_u = vec![0i32; 1];
    let req = workspace::getf2_workspace(n, n, true, layout, 1);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    let mut a = MatrixBatchMut::strided(n, n, n, n * n, 1, &mut unblocked);
    let mut ipiv = VecBatchMut::new(&mut piv_u, n);
    client.getf2(&mut a, Some(&mut ipiv), &mut info_u, &mut ws).unwrap();

    let cfg = BlockConfig::new(2, 2);
    let mut blocked = orig;
    let mut piv_b = vec![0i32; n];
    let mut info_b = vec![0i32; 1];
    let req = workspace::getrf_workspace(n, n, true, layout, 1, cfg);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    let mut a = MatrixBatchMut::strided(n, n, n, n * n, 1, &mut blocked);
    let mut ipiv = VecBatchMut::new(&mut piv_b, n);
    client.getrf(&mut a, Some(&mut ipiv), &mut info_b, cfg, &mut ws).unwrap();

    assert_eq!(piv_u, piv_b);
    assert_eq!(info_u, info_b);
    assert_close(&blocked, &unblocked, 1e-13, "4x4 block-2 LU");
}

#[test]
fn test_getrf_without_pivoting() {
    let (client, _) = create_cpu_client();
    let mut r = rng(14);
    let n = 6;
    let bc = 2;
    let stride = n * n;
    let mut orig: Vec<f64> = rand_data(&mut r, stride * bc);
    make_diag_dominant(&mut orig, n, n, stride, bc);
    let mut fact = orig.clone();
    let mut info = vec![0i32; bc];

    let layout = batchr::batch::Layout::Strided;
    let req = workspace::getrf_workspace(n, n, false, layout, bc, BlockConfig::GETRF);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    let mut a = MatrixBatchMut::strided(n, n, n, stride, bc, &mut fact);
    client.getrf(&mut a, None, &mut info, BlockConfig::GETRF, &mut ws).unwrap();

    assert_eq!(info, vec![0; bc]);
    for b in 0..bc {
        let lu = lu_reconstruct(n, n, &fact[b * stride..(b + 1) * stride], n);
        assert_close(&lu, &orig[b * stride..(b + 1) * stride], 1e-11, "A = LU");
    }
}

#[test]
fn test_getrf_singular_instance_reports_info() {
    let (client, _) = create_cpu_client();
    let mut r = rng(15);
    let n = 4;
    let bc = 3;
    let stride = n * n;
    let mut data: Vec<f64> = rand_data(&mut r, stride * bc);
    // middle instance: first column exactly zero
    for i in 0..n {
        data[stride + i] = 0.0;
    }
    let mut ipiv_data = vec![0i32; n * bc];
    let mut info = vec![-7i32; bc];

    let layout = batchr::batch::Layout::Strided;
    let req = workspace::getrf_workspace(n, n, true, layout, bc, BlockConfig::GETRF);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    let mut a = MatrixBatchMut::strided(n, n, n, stride, bc, &mut data);
    let mut ipiv = VecBatchMut::new(&mut ipiv_data, n);
    // singularity is reported per matrix, not as an Err
    client.getrf(&mut a, Some(&mut ipiv), &mut info, BlockConfig::GETRF, &mut ws).unwrap();

    assert_eq!(info, vec![0, 1, 0]);
}

#[test]
fn test_getrf_layouts_agree() {
    let (client, _) = create_cpu_client();
    let mut r = rng(16);
    let n = 4;
    let bc = 2;
    let stride = n * n;
    let orig: Vec<f64> = rand_data(&mut r, stride * bc);
    let cfg = BlockConfig::GETRF;

    let mut strided = orig.clone();
    let mut piv_s = vec![0i32; n * bc];
    let mut info = vec![0i32; bc];
    let req = workspace::getrf_workspace(n, n, true, batchr::batch::Layout::Strided, bc, cfg);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    let mut a = MatrixBatchMut::strided(n, n, n, stride, bc, &mut strided);
    let mut ipiv = VecBatchMut::new(&mut piv_s, n);
    client.getrf(&mut a, Some(&mut ipiv), &mut info, cfg, &mut ws).unwrap();

    let mut m0 = orig[..stride].to_vec();
    let mut m1 = orig[stride..].to_vec();
    let mut piv_b = vec![0i32; n * bc];
    let mut info = vec![0i32; bc];
    let req = workspace::getrf_workspace(n, n, true, batchr::batch::Layout::Batched, bc, cfg);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    let mut a = MatrixBatchMut::batched(n, n, n, vec![&mut m0, &mut m1]);
    let mut ipiv = VecBatchMut::new(&mut piv_b, n);
    client.getrf(&mut a, Some(&mut ipiv), &mut info, cfg, &mut ws).unwrap();

    let mut inter = to_interleaved(n, n, n, bc, &orig);
    let mut piv_i = vec![0i32; n * bc];
    let mut info = vec![0i32; bc];
    let req = workspace::getrf_workspace(n, n, true, batchr::batch::Layout::Interleaved, bc, cfg);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    let mut a = MatrixBatchMut::interleaved(n, n, bc, bc * n, bc, &mut inter);
    let mut ipiv = VecBatchMut::new(&mut piv_i, n);
    client.getrf(&mut a, Some(&mut ipiv), &mut info, cfg, &mut ws).unwrap();

    assert_eq!(piv_s, piv_b);
    assert_eq!(piv_s, piv_i);
    assert_close(&strided[..stride], &m0, 1e-14, "batched vs strided");
    assert_close(&strided[stride..], &m1, 1e-14, "batched vs strided");
    let unpacked = from_interleaved(n, n, bc, &inter);
    assert_close(&strided, &unpacked, 1e-14, "interleaved vs strided");
}

#[test]
fn test_getrs_solves() {
    let (client, _) = create_cpu_client();
    let mut r = rng(17);
    let n = 5;
    let nrhs = 2;
    let bc = 2;
    let stride_a = n * n;
    let stride_b = n * nrhs;
    let layout = batchr::batch::Layout::Strided;
    let a_orig: Vec<f64> = rand_data(&mut r, stride_a * bc);
    let b_orig: Vec<f64> = rand_data(&mut r, stride_b * bc);

    let mut fact = a_orig.clone();
    let mut sol = b_orig.clone();
    let mut ipiv_data = vec![0i32; n * bc];
    let mut info = vec![0i32; bc];

    // one workspace sized for both phases
    let req = workspace::getrf_workspace(n, n, true, layout, bc, BlockConfig::GETRF)
        .max(workspace::getrs_workspace(n, nrhs, layout, bc));
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();

    let mut a = MatrixBatchMut::strided(n, n, n, stride_a, bc, &mut fact);
    let mut ipiv = VecBatchMut::new(&mut ipiv_data, n);
    client.getrf(&mut a, Some(&mut ipiv), &mut info, BlockConfig::GETRF, &mut ws).unwrap();
    assert_eq!(info, vec![0; bc]);

    let mut b = MatrixBatchMut::strided(n, nrhs, n, stride_b, bc, &mut sol);
    client.getrs(Operation::None, &mut a, Some(&mut ipiv), &mut b, &mut ws).unwrap();

    for inst in 0..bc {
        let ax = matmul(
            n,
            n,
            nrhs,
            &a_orig[inst * stride_a..(inst + 1) * stride_a],
            n,
            &sol[inst * stride_b..(inst + 1) * stride_b],
            n,
        );
        assert_close(&ax, &b_orig[inst * stride_b..(inst + 1) * stride_b], 1e-9, "A x = b");
    }
}

#[test]
fn test_getrs_transpose() {
    let (client, _) = create_cpu_client();
    let mut r = rng(18);
    let n = 4;
    let nrhs = 3;
    let layout = batchr::batch::Layout::Strided;
    let a_orig: Vec<f64> = rand_data(&mut r, n * n);
    let b_orig: Vec<f64> = rand_data(&mut r, n * nrhs);

    let mut fact = a_orig.clone();
    let mut sol = b_orig.clone();
    let mut ipiv_data = vec![0i32; n];
    let mut info = vec![0i32; 1];

    let req = workspace::getrf_workspace(n, n, true, layout, 1, BlockConfig::GETRF)
        .max(workspace::getrs_workspace(n, nrhs, layout, 1));
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();

    let mut a = MatrixBatchMut::strided(n, n, n, n * n, 1, &mut fact);
    let mut ipiv = VecBatchMut::new(&mut ipiv_data, n);
    client.getrf(&mut a, Some(&mut ipiv), &mut info, BlockConfig::GETRF, &mut ws).unwrap();

    let mut b = MatrixBatchMut::strided(n, nrhs, n, n * nrhs, 1, &mut sol);
    client.getrs(Operation::Transpose, &mut a, Some(&mut ipiv), &mut b, &mut ws).unwrap();

    let at = adjoint(n, n, &a_orig, n);
    let atx = matmul(n, n, nrhs, &at, n, &sol, n);
    assert_close(&atx, &b_orig, 1e-9, "A^T x = b");
}

#[test]
fn test_getrf_getrs_complex() {
    let (client, _) = create_cpu_client();
    let mut r = rng(19);
    let n = 6;
    let nrhs = 1;
    let layout = batchr::batch::Layout::Strided;
    let a_orig: Vec<Complex128> = rand_data(&mut r, n * n);
    let b_orig: Vec<Complex128> = rand_data(&mut r, n * nrhs);

    let mut fact = a_orig.clone();
    let mut ipiv_data = vec![0i32; n];
    let mut info = vec![0i32; 1];

    let req = workspace::getrf_workspace(n, n, true, layout, 1, BlockConfig::GETRF)
        .max(workspace::getrs_workspace(n, nrhs, layout, 1));
    let mut ws = Workspace::<Complex128>::alloc(&req).unwrap();

    let mut a = MatrixBatchMut::strided(n, n, n, n * n, 1, &mut fact);
    let mut ipiv = VecBatchMut::new(&mut ipiv_data, n);
    client.getrf(&mut a, Some(&mut ipiv), &mut info, BlockConfig::GETRF, &mut ws).unwrap();
    assert_eq!(info[0], 0);

    // conjugate-transpose solve against the reference product
    let mut sol = b_orig.clone();
    let mut b = MatrixBatchMut::strided(n, nrhs, n, n * nrhs, 1, &mut sol);
    client.getrs(Operation::ConjTranspose, &mut a, Some(&mut ipiv), &mut b, &mut ws).unwrap();
    let ah = adjoint(n, n, &a_orig, n);
    let ahx = matmul(n, n, nrhs, &ah, n, &sol, n);
    assert_close(&ahx, &b_orig, 1e-9, "A^H x = b");

    let lu = lu_reconstruct(n, n, &fact, n);
    let mut pa = a_orig.clone();
    apply_pivots(&mut pa, n, n, &ipiv_data);
    assert_close(&lu, &pa, 1e-12, "complex PA = LU");
}
