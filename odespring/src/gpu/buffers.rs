// SPDX-License-Identifier: AGPL-3.0-only

//! GPU buffer creation, upload, and readback.

use super::GpuF64;
use crate::error::{OdeSpringError, Result};
use wgpu::util::DeviceExt;

const F64_BYTES: u64 = std::mem::size_of::<f64>() as u64;

impl GpuF64 {
    /// Storage buffer initialised from f64 data. Writable and re-uploadable.
    #[must_use]
    pub fn create_f64_buffer(&self, data: &[f64], label: &str) -> wgpu::Buffer {
        self.device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            })
    }

    /// Zero-filled storage buffer of `count` f64 values.
    #[must_use]
    pub fn create_f64_output_buffer(&self, count: usize, label: &str) -> wgpu::Buffer {
        self.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: count as u64 * F64_BYTES,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Read-only storage buffer of i32 indices (ELL column table).
    #[must_use]
    pub fn create_i32_buffer(&self, data: &[i32], label: &str) -> wgpu::Buffer {
        self.device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::STORAGE,
            })
    }

    /// Staging buffer for reading results back to the host.
    #[must_use]
    pub fn create_staging_buffer(&self, size: u64, label: &str) -> wgpu::Buffer {
        self.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Overwrite `buffer` from offset 0. Takes effect at the next submit.
    pub fn upload_f64(&self, buffer: &wgpu::Buffer, data: &[f64]) {
        self.queue()
            .write_buffer(buffer, 0, bytemuck::cast_slice(data));
    }

    /// Copy the first `count` f64 values of `buffer` to the host.
    ///
    /// # Errors
    ///
    /// Returns [`OdeSpringError::GpuCompute`] if the map callback fails or
    /// its channel is dropped.
    pub fn read_back_f64(&self, buffer: &wgpu::Buffer, count: usize) -> Result<Vec<f64>> {
        let size = count as u64 * F64_BYTES;
        if size == 0 {
            return Ok(Vec::new());
        }
        let staging = self.create_staging_buffer(size, "readback");
        let mut encoder = self.begin_encoder("readback");
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        self.submit_encoder(encoder);

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device().poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| OdeSpringError::GpuCompute("map callback channel dropped".into()))?
            .map_err(|e| OdeSpringError::GpuCompute(format!("buffer mapping: {e}")))?;

        let data = slice.get_mapped_range();
        let result = mapped_bytes_to_f64(&data);
        drop(data);
        staging.unmap();
        Ok(result)
    }
}

/// Convert mapped GPU buffer bytes to f64 values.
///
/// Mapped ranges are normally 8-byte aligned; unaligned input is decoded
/// chunk by chunk.
#[must_use]
pub fn mapped_bytes_to_f64(data: &[u8]) -> Vec<f64> {
    bytemuck::try_cast_slice(data).map_or_else(
        |_| {
            data.chunks_exact(8)
                .map(|chunk| {
                    let mut b = [0u8; 8];
                    b.copy_from_slice(chunk);
                    f64::from_le_bytes(b)
                })
                .collect()
        },
        <[f64]>::to_vec,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_bytes_aligned() {
        let values = [1.5, -2.25, std::f64::consts::PI];
        let bytes: &[u8] = bytemuck::cast_slice(&values);
        assert_eq!(mapped_bytes_to_f64(bytes), values.to_vec());
    }

    #[test]
    fn mapped_bytes_unaligned_fallback() {
        let values = [0.125f64, 7.0];
        let mut raw = vec![0u8];
        raw.extend(values.iter().flat_map(|v| v.to_le_bytes()));
        let decoded = mapped_bytes_to_f64(&raw[1..]);
        assert_eq!(decoded, values.to_vec());
    }

    #[test]
    fn mapped_bytes_empty() {
        assert!(mapped_bytes_to_f64(&[]).is_empty());
    }
}
