// SPDX-License-Identifier: AGPL-3.0-only

//! Device-resident f64 state vectors.

use super::GpuF64;
use crate::error::{OdeSpringError, Result};

/// An f64 storage buffer and its element count.
#[derive(Debug)]
pub struct GpuVector {
    buffer: wgpu::Buffer,
    len: usize,
}

impl GpuVector {
    /// Upload `data` into a new device buffer.
    #[must_use]
    pub fn from_host(gpu: &GpuF64, data: &[f64], label: &str) -> Self {
        Self {
            buffer: gpu.create_f64_buffer(data, label),
            len: data.len(),
        }
    }

    /// A zero-filled vector of `len` elements.
    #[must_use]
    pub fn zeros(gpu: &GpuF64, len: usize, label: &str) -> Self {
        Self {
            buffer: gpu.create_f64_output_buffer(len, label),
            len,
        }
    }

    /// Copy the whole vector to the host.
    ///
    /// # Errors
    ///
    /// Propagates [`OdeSpringError::GpuCompute`] from the readback.
    pub fn to_host(&self, gpu: &GpuF64) -> Result<Vec<f64>> {
        gpu.read_back_f64(&self.buffer, self.len)
    }

    /// Read only element 0.
    ///
    /// # Errors
    ///
    /// [`OdeSpringError::GpuCompute`] on readback failure or an empty vector.
    pub fn first(&self, gpu: &GpuF64) -> Result<f64> {
        gpu.read_back_f64(&self.buffer, self.len.min(1))?
            .first()
            .copied()
            .ok_or_else(|| OdeSpringError::GpuCompute("read of empty vector".into()))
    }

    #[must_use]
    pub const fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "requires GPU"]
    fn host_roundtrip() {
        let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
        let gpu = rt.block_on(GpuF64::new()).expect("GPU with SHADER_F64");
        let data = vec![1.0, -2.5, 3.25, 1e-300];
        let v = GpuVector::from_host(&gpu, &data, "roundtrip");
        assert_eq!(v.len(), 4);
        assert_eq!(v.to_host(&gpu).expect("readback"), data);
        assert!((v.first(&gpu).expect("readback") - 1.0).abs() < 1e-15);
    }

    #[test]
    #[ignore = "requires GPU"]
    fn zeros_are_zero() {
        let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
        let gpu = rt.block_on(GpuF64::new()).expect("GPU with SHADER_F64");
        let v = GpuVector::zeros(&gpu, 100, "zeros");
        assert!(v.to_host(&gpu).expect("readback").iter().all(|x| *x == 0.0));
    }
}
