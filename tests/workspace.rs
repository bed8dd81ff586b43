//! Workspace sizing contract

mod common;

use batchr::batch::{Layout, MatrixBatchMut, VecBatchMut};
use batchr::dtype::DType;
use batchr::error::Error;
use batchr::lapack::{workspace, BlockConfig, Lapack, Workspace, WorkspaceReq};
use common::*;

#[test]
fn test_exact_requirement_suffices() {
    let (client, _) = create_cpu_client();
    let mut r = rng(61);
    let n = 8;
    let bc = 2;
    let cfg = BlockConfig::new(2, 2);
    let mut data: Vec<f64> = rand_data(&mut r, n * n * bc);
    let mut tau_data = vec![0.0f64; n * bc];

    let req = workspace::geqrf_workspace(n, n, Layout::Strided, bc, cfg);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    let mut a = MatrixBatchMut::strided(n, n, n, n * n, bc, &mut data);
    let mut tau = VecBatchMut::new(&mut tau_data, n);
    client.geqrf(&mut a, &mut tau, cfg, &mut ws).unwrap();
}

#[test]
fn test_undersized_workspace_is_rejected_before_any_write() {
    let (client, _) = create_cpu_client();
    let mut r = rng(62);
    let cfg = BlockConfig::new(2, 2);
    // the QR requirement grows with n (work scratch is per column), so a
    // workspace sized for 4x4 falls short of an 8x8 call
    let small = workspace::geqrf_workspace(4, 4, Layout::Strided, 1, cfg);
    let mut ws = Workspace::<f64>::alloc(&small).unwrap();
    assert!(!ws.satisfies(&workspace::geqrf_workspace(8, 8, Layout::Strided, 1, cfg)));

    let n = 8;
    let orig: Vec<f64> = rand_data(&mut r, n * n);
    let mut data = orig.clone();
    let mut tau_data = vec![0.0f64; n];
    let mut a = MatrixBatchMut::strided(n, n, n, n * n, 1, &mut data);
    let mut tau = VecBatchMut::new(&mut tau_data, n);
    let err = client.geqrf(&mut a, &mut tau, cfg, &mut ws).unwrap_err();
    assert!(matches!(err, Error::InvalidSize { arg: "ws", .. }));
    assert_eq!(data, orig);
    assert_eq!(tau_data, vec![0.0; n]);
}

#[test]
fn test_workspace_sized_for_fewer_instances_is_rejected() {
    let (client, _) = create_cpu_client();
    let mut r = rng(66);
    let n = 4;
    let small = workspace::getrf_workspace(n, n, true, Layout::Strided, 1, BlockConfig::GETRF);
    let mut ws = Workspace::<f64>::alloc(&small).unwrap();

    // LU scratch scales with the batch count, not the matrix shape
    let bc = 2;
    let orig: Vec<f64> = rand_data(&mut r, n * n * bc);
    let mut data = orig.clone();
    let mut ipiv_data = vec![0i32; n * bc];
    let mut info = vec![0i32; bc];
    let mut a = MatrixBatchMut::strided(n, n, n, n * n, bc, &mut data);
    let mut ipiv = VecBatchMut::new(&mut ipiv_data, n);
    let err = client
        .getrf(&mut a, Some(&mut ipiv), &mut info, BlockConfig::GETRF, &mut ws)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSize { arg: "ws", .. }));
    assert_eq!(data, orig);
}

#[test]
fn test_batched_layout_needs_its_own_pointer_slots() {
    let (client, _) = create_cpu_client();
    let mut r = rng(63);
    let n = 4;
    let bc = 2;
    // sized for packed layouts: no pointer-array region
    let req = workspace::getrf_workspace(n, n, true, Layout::Strided, bc, BlockConfig::GETRF);
    assert_eq!(req.ptr_array, 0);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();

    let mut m0: Vec<f64> = rand_data(&mut r, n * n);
    let mut m1: Vec<f64> = rand_data(&mut r, n * n);
    let mut ipiv_data = vec![0i32; n * bc];
    let mut info = vec![0i32; bc];
    let mut a = MatrixBatchMut::batched(n, n, n, vec![&mut m0, &mut m1]);
    let mut ipiv = VecBatchMut::new(&mut ipiv_data, n);
    let err = client
        .getrf(&mut a, Some(&mut ipiv), &mut info, BlockConfig::GETRF, &mut ws)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSize { arg: "ws", .. }));
}

#[test]
fn test_quick_return_zeroes_info_and_nothing_else() {
    let (client, _) = create_cpu_client();
    let bc = 3;
    let mut data: Vec<f64> = vec![];
    let mut info = vec![5i32; bc];
    // zero-dimension problems require no workspace at all
    let req = workspace::getrf_workspace(0, 0, true, Layout::Strided, bc, BlockConfig::GETRF);
    assert_eq!(req, WorkspaceReq::ZERO);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    let mut a = MatrixBatchMut::strided(0, 0, 1, 0, bc, &mut data);
    client.getrf(&mut a, None, &mut info, BlockConfig::GETRF, &mut ws).unwrap();
    assert_eq!(info, vec![0; bc]);
}

#[test]
fn test_empty_batch_is_a_quick_return() {
    let (client, _) = create_cpu_client();
    let mut data: Vec<f64> = vec![];
    let mut info: Vec<i32> = vec![];
    let req = workspace::getrf_workspace(4, 4, true, Layout::Strided, 0, BlockConfig::GETRF);
    assert_eq!(req, WorkspaceReq::ZERO);
    let mut ws = Workspace::<f64>::alloc(&req).unwrap();
    let mut a = MatrixBatchMut::strided(4, 4, 4, 16, 0, &mut data);
    client.getrf(&mut a, None, &mut info, BlockConfig::GETRF, &mut ws).unwrap();
}

#[test]
fn test_max_composition_serves_both_calls() {
    let a = workspace::geqrf_workspace(8, 6, Layout::Strided, 2, BlockConfig::GEQRF);
    let b = workspace::gelqf_workspace(6, 8, Layout::Strided, 2, BlockConfig::GELQF);
    let m = a.max(b);
    let ws = Workspace::<f64>::alloc(&m).unwrap();
    assert!(ws.satisfies(&a));
    assert!(ws.satisfies(&b));
    assert!(m.total_bytes(DType::F64) >= a.total_bytes(DType::F64));
    assert!(m.total_bytes(DType::F64) >= b.total_bytes(DType::F64));
}
