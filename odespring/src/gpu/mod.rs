// SPDX-License-Identifier: AGPL-3.0-only

//! GPU FP64 back-end for odeSpring integration runs.
//!
//! Creates a wgpu device with `SHADER_F64` enabled and provides the buffer,
//! pipeline and dispatch helpers the GPU algebra and the per-problem
//! right-hand-side kernels are built on.
//!
//! ## Adapter selection
//!
//! Set `ODESPRING_GPU_ADAPTER` to select a specific GPU:
//!
//! | Value | Behavior |
//! |-------|----------|
//! | `auto` or unset | First discrete adapter with `SHADER_F64`, else any with `SHADER_F64` |
//! | `0`, `1`, … | Select adapter by enumeration index |
//! | substring | Case-insensitive name match (e.g. `"titan"`, `"4070"`) |
//!
//! `ODESPRING_WGPU_BACKEND` (`vulkan`, `metal`, `dx12`, `gl`) restricts the
//! wgpu backends that are enumerated.
//!
//! ## Module structure
//!
//! - `adapter` — adapter discovery and selection
//! - `buffers` — f64/i32 buffer creation, upload, readback
//! - `dispatch` — command encoding and dispatch
//! - `vector` — device-resident state vectors
//! - `algebra` — generated linear-combination kernels for the steppers

mod adapter;
mod algebra;
mod buffers;
mod dispatch;
mod vector;

pub use adapter::{AdapterInfo, AdapterSelector};
pub use algebra::{scale_sum_shader, GpuAlgebra, MAX_TERMS};
pub use buffers::mapped_bytes_to_f64;
pub use dispatch::{split_workgroups, workgroups_for, WORKGROUP_SIZE};
pub use vector::GpuVector;

use crate::error::{OdeSpringError, Result};
use std::sync::Arc;

/// wgpu device and queue with `SHADER_F64` enabled.
#[must_use]
pub struct GpuF64 {
    pub adapter_name: String,
    pub backend: wgpu::Backend,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl GpuF64 {
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

impl GpuF64 {
    /// Create a device on the selected adapter, requiring `SHADER_F64`.
    ///
    /// # Errors
    ///
    /// [`OdeSpringError::NoAdapter`] if nothing matches the selector,
    /// [`OdeSpringError::NoShaderF64`] if the adapter lacks f64 shaders, or
    /// [`OdeSpringError::DeviceCreation`] if wgpu refuses the device.
    pub async fn new() -> Result<Self> {
        let selected = adapter::select_adapter()?;
        let info = selected.get_info();
        if !selected.features().contains(wgpu::Features::SHADER_F64) {
            log::warn!("adapter '{}' has no SHADER_F64", info.name);
            return Err(OdeSpringError::NoShaderF64);
        }

        let required_limits = wgpu::Limits {
            max_storage_buffer_binding_size: 512 * 1024 * 1024,
            max_buffer_size: 1024 * 1024 * 1024,
            max_storage_buffers_per_shader_stage: 8,
            ..wgpu::Limits::default()
        };

        let (device, queue) = selected
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("odeSpring f64 device"),
                    required_features: wgpu::Features::SHADER_F64,
                    required_limits,
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| OdeSpringError::DeviceCreation(e.to_string()))?;

        log::info!(
            "GPU device ready: {} ({:?}, driver {})",
            info.name,
            info.backend,
            info.driver
        );

        Ok(Self {
            adapter_name: info.name,
            backend: info.backend,
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// Enumerate all available GPU adapters.
    #[must_use]
    pub fn enumerate_adapters() -> Vec<AdapterInfo> {
        adapter::enumerate_adapters()
    }

    /// Print device summary.
    pub fn print_info(&self) {
        println!("  GPU: {} ({:?})", self.adapter_name, self.backend);
    }

    /// Print all available adapters to stdout.
    pub fn print_available_adapters() {
        let adapters = Self::enumerate_adapters();
        println!("  Available GPU adapters:");
        for info in &adapters {
            let marker = if info.has_f64 { "✓" } else { "✗" };
            println!("    {marker} {info}");
        }
        if adapters.is_empty() {
            println!("    (none found)");
        }
    }
}

impl GpuF64 {
    /// Compile a WGSL compute shader with entry point `main` and an
    /// auto-derived bind group layout.
    #[must_use]
    pub fn create_pipeline(&self, shader_source: &str, label: &str) -> wgpu::ComputePipeline {
        log::debug!("compiling pipeline '{label}'");
        let module = self
            .device()
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(shader_source.into()),
            });

        self.device()
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: None,
                module: &module,
                entry_point: "main",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "requires GPU"]
    fn device_has_f64() {
        let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
        let gpu = rt.block_on(GpuF64::new()).expect("GPU with SHADER_F64");
        assert!(!gpu.adapter_name.is_empty());
    }

    #[test]
    #[ignore = "requires GPU"]
    fn enumerate_lists_selected_adapter() {
        let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
        let gpu = rt.block_on(GpuF64::new()).expect("GPU with SHADER_F64");
        let all = GpuF64::enumerate_adapters();
        assert!(all.iter().any(|a| a.name == gpu.adapter_name));
    }
}
