//! CPU runtime: the reference backend
//!
//! Kernel launches on the CPU are data-parallel loops over the
//! (row, column, batch) index space of each operation, parallelized over the
//! batch dimension with Rayon when the `rayon` feature is enabled.

pub(crate) mod blas;
mod client;
mod device;
pub(crate) mod lapack;
mod runtime;

pub use client::CpuClient;
pub use device::CpuDevice;
pub use runtime::CpuRuntime;
