//! Host device identity

use crate::runtime::Device;

/// The host CPU
///
/// There is exactly one, so the type carries no state: batched kernels run
/// on the calling thread (and the rayon pool when the `rayon` feature is
/// on), against caller-owned host memory.
#[derive(Clone, Debug, Default)]
pub struct CpuDevice;

impl CpuDevice {
    /// The host CPU device
    pub fn new() -> Self {
        Self
    }
}

impl Device for CpuDevice {
    fn id(&self) -> usize {
        0
    }

    fn name(&self) -> String {
        "cpu".to_string()
    }
}
