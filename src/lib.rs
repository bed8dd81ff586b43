//! # batchr
//!
//! **Batched dense matrix factorizations for Rust.**
//!
//! batchr factors and solves many small dense systems at once. Every routine
//! operates on a whole batch of matrices per call, with the batch stored in
//! one of three layouts (array of pointers, strided, or interleaved), and
//! reports a per-matrix status through an `info` array.
//!
//! ## Routines
//!
//! - **LU**: `getf2`, `getrf` (partial pivoting), `getrs` solve
//! - **QR / LQ**: `geqr2`, `geqrf`, `gelq2`, `gelqf`
//! - **Reflectors**: `larfg`, `larf`, `larft`, `larfb`
//! - **Apply Q**: `ormqr`, `ormlq`, `ormbr`
//! - **Block tridiagonal**: `geblttrf_npvt`, `geblttrs_npvt`
//!
//! All routines come in four precisions (`f32`, `f64`, `Complex64`,
//! `Complex128`) through the [`dtype::Scalar`] trait.
//!
//! ## Workspace model
//!
//! Routines never allocate per call. Each has a sizing function in
//! [`lapack::workspace`] that returns a [`WorkspaceReq`]; requirements for
//! different calls combine with [`WorkspaceReq::max`], and one
//! [`Workspace`] allocation serves them all.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use batchr::prelude::*;
//!
//! let client = CpuRuntime::default_client(&CpuRuntime::default_device());
//! let req = workspace::getrf_workspace(n, n, true, Layout::Strided, bc, BlockConfig::GETRF);
//! let mut ws = Workspace::<f64>::alloc(&req)?;
//! let mut a = MatrixBatchMut::strided(n, n, n, n * n, bc, &mut data);
//! let mut ipiv = VecBatchMut::new(&mut pivots, n);
//! client.getrf(&mut a, Some(&mut ipiv), &mut info, BlockConfig::GETRF, &mut ws)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): multi-threaded batch execution

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod batch;
pub mod dtype;
pub mod error;
pub mod lapack;
pub mod runtime;

pub use batch::{Layout, MatrixBatchMut, VecBatchMut};
pub use error::{Error, Result};
pub use lapack::{
    BlockConfig, Direction, Lapack, Operation, Side, StorageMode, Workspace, WorkspaceReq,
};
pub use runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
pub use runtime::{Device, Runtime, RuntimeClient};

/// Common imports
pub mod prelude {
    pub use crate::batch::{Layout, MatrixBatchMut, VecBatchMut};
    pub use crate::dtype::{Complex128, Complex64, Scalar};
    pub use crate::error::{Error, Result};
    pub use crate::lapack::{
        workspace, BlockConfig, Direction, Lapack, Operation, Side, StorageMode, Workspace,
        WorkspaceReq,
    };
    pub use crate::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
    pub use crate::runtime::{Device, Runtime, RuntimeClient};
}
