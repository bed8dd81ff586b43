//! Runtime backends for batched computation
//!
//! This module defines the `Runtime` trait and provides the CPU
//! implementation. The solvers are written against a client that launches
//! batched kernels in program order, so a device backend can slot in behind
//! the same seam.
//!
//! # Architecture
//!
//! ```text
//! Runtime (backend identity)
//! ├── Device (identifies a specific compute unit)
//! └── Client (dispatches kernel launches, owns execution order)
//! ```

pub mod cpu;

/// Core trait for compute backends
///
/// `Runtime` abstracts over compute devices. It uses static dispatch via
/// generics for zero-cost abstraction.
pub trait Runtime: Clone + Send + Sync + 'static {
    /// Device identifier type
    type Device: Device;

    /// Client for dispatching operations
    type Client: RuntimeClient<Self>;

    /// Human-readable name of this runtime
    fn name() -> &'static str;

    /// Get the default device
    fn default_device() -> Self::Device;

    /// Get the default client for a device
    fn default_client(device: &Self::Device) -> Self::Client;
}

/// Trait for device identification
pub trait Device: Clone + Send + Sync + 'static {
    /// Unique identifier for this device
    fn id(&self) -> usize;

    /// Check if two devices are the same
    fn is_same(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// Human-readable name
    fn name(&self) -> String {
        format!("Device({})", self.id())
    }
}

/// Trait for runtime clients that handle operation dispatch
///
/// Kernel launches issued through one client execute in program order;
/// a call either fails during argument validation, before any output is
/// written, or runs to completion.
pub trait RuntimeClient<R: Runtime>: Clone + Send + Sync {
    /// Get the device this client operates on
    fn device(&self) -> &R::Device;

    /// Synchronize: wait for all pending operations to complete
    fn synchronize(&self);
}
