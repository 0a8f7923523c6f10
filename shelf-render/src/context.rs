//! GPU context: owns the `wgpu::Device` and `Queue` shared by every atlas
//! surface and pipeline on one adapter.
//!
//! Rendering is headless only: atlases live in offscreen textures and
//! frames are rendered into caller-provided targets.
//!
//! The context is cheap to clone. All clones share one submission lock,
//! which surfaces hold for the duration of a resize copy or readback so
//! atlases sharing a device do not interleave those submissions.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use thiserror::Error;
use wgpu::{
    AdapterInfo, Device, DeviceDescriptor, Instance, InstanceDescriptor, Queue,
    RequestAdapterOptions, TextureFormat,
};

#[derive(Error, Debug)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

/// Core GPU state shared by all surfaces and pipelines.
#[derive(Clone)]
pub struct GpuContext {
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
    pub adapter_info: AdapterInfo,
    /// Format of offscreen render targets.
    pub target_format: TextureFormat,
    submit_lock: Arc<Mutex<()>>,
}

impl GpuContext {
    /// Create a headless context (no window, no surface).
    ///
    /// Useful for off-screen rendering, tests, and CI pipelines.
    pub async fn new_headless() -> Result<Self, GpuError> {
        let instance = Instance::new(&InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("shelf-headless"),
                    ..Default::default()
                },
                None,
            )
            .await?;

        let adapter_info = adapter.get_info();
        log::info!(
            "GPU context on {} ({:?})",
            adapter_info.name,
            adapter_info.backend
        );

        Ok(Self::from_parts(Arc::new(device), Arc::new(queue), adapter_info))
    }

    /// Wrap a device and queue created elsewhere.
    pub fn from_parts(device: Arc<Device>, queue: Arc<Queue>, adapter_info: AdapterInfo) -> Self {
        Self {
            device,
            queue,
            adapter_info,
            target_format: TextureFormat::Rgba8UnormSrgb,
            submit_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Take the device-wide submission lock.
    ///
    /// Hold it only across one encode-and-submit; never across a call
    /// that may take it again.
    pub fn lock_submission(&self) -> MutexGuard<'_, ()> {
        self.submit_lock.lock()
    }

    /// Whether `other` shares this context's device and submission lock.
    pub fn same_device(&self, other: &GpuContext) -> bool {
        Arc::ptr_eq(&self.submit_lock, &other.submit_lock)
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_context() {
        let gpu = pollster::block_on(GpuContext::new_headless());
        // May fail in CI without GPU; skip gracefully.
        if let Ok(gpu) = gpu {
            assert_eq!(gpu.target_format, TextureFormat::Rgba8UnormSrgb);
        }
    }

    #[test]
    fn test_clones_share_submission_lock() {
        let gpu = pollster::block_on(GpuContext::new_headless());
        if let Ok(gpu) = gpu {
            let other = gpu.clone();
            assert!(gpu.same_device(&other));
            let _guard = gpu.lock_submission();
            assert!(other.submit_lock.try_lock().is_none());
        }
    }
}
