//! CPU runtime implementation

use super::client::CpuClient;
use super::device::CpuDevice;
use crate::runtime::Runtime;

/// CPU compute runtime
///
/// This is the default runtime that works on any platform. Matrix batches
/// stay in caller-owned host memory; workspace buffers are heap allocations.
#[derive(Clone, Debug, Default)]
pub struct CpuRuntime;

impl Runtime for CpuRuntime {
    type Device = CpuDevice;
    type Client = CpuClient;

    fn name() -> &'static str {
        "cpu"
    }

    fn default_device() -> Self::Device {
        CpuDevice::new()
    }

    fn default_client(device: &Self::Device) -> Self::Client {
        CpuClient::new(device.clone())
    }
}
