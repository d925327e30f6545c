// SPDX-License-Identifier: AGPL-3.0-only

//! Command encoding and dispatch.
//!
//! ```text
//! begin_encoder()  → CommandEncoder
//!   ↕  encode_pass() × k
//! submit_encoder() → one queue submission
//! ```

use super::GpuF64;

/// Threads per workgroup in every odeSpring kernel.
pub const WORKGROUP_SIZE: u32 = 64;

const MAX_WORKGROUPS_PER_DIM: u32 = 65_535;

/// Split a workgroup count into `(x, y, 1)` when `x` would exceed 65 535.
///
/// Kernels linearise with `gid.x + gid.y * nwg.x * 64u`.
#[must_use]
pub const fn split_workgroups(total: u32) -> (u32, u32, u32) {
    if total <= MAX_WORKGROUPS_PER_DIM {
        (total, 1, 1)
    } else {
        let y = total.div_ceil(MAX_WORKGROUPS_PER_DIM);
        let x = total.div_ceil(y);
        (x, y, 1)
    }
}

/// Workgroups needed to cover `n` elements, one thread each.
#[must_use]
pub fn workgroups_for(n: usize) -> u32 {
    u32::try_from(n.div_ceil(WORKGROUP_SIZE as usize)).unwrap_or(u32::MAX)
}

impl GpuF64 {
    /// Bind `buffers` at binding 0, 1, 2, … of group 0.
    #[must_use]
    pub fn create_bind_group(
        &self,
        pipeline: &wgpu::ComputePipeline,
        buffers: &[&wgpu::Buffer],
    ) -> wgpu::BindGroup {
        let layout = pipeline.get_bind_group_layout(0);
        let entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .zip(0u32..)
            .map(|(buf, binding)| wgpu::BindGroupEntry {
                binding,
                resource: buf.as_entire_binding(),
            })
            .collect();
        self.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bind_group"),
            layout: &layout,
            entries: &entries,
        })
    }

    /// Encode and submit a single dispatch.
    pub fn dispatch(
        &self,
        pipeline: &wgpu::ComputePipeline,
        bind_group: &wgpu::BindGroup,
        workgroups: u32,
    ) {
        let mut encoder = self.begin_encoder("dispatch");
        Self::encode_pass(&mut encoder, pipeline, bind_group, workgroups);
        self.submit_encoder(encoder);
    }

    #[must_use]
    pub fn begin_encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    pub fn submit_encoder(&self, encoder: wgpu::CommandEncoder) {
        self.queue().submit(std::iter::once(encoder.finish()));
    }

    /// Encode one compute pass into `encoder` without submitting.
    pub fn encode_pass(
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::ComputePipeline,
        bind_group: &wgpu::BindGroup,
        workgroups: u32,
    ) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("odespring_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        let (wx, wy, wz) = split_workgroups(workgroups);
        pass.dispatch_workgroups(wx, wy, wz);
    }
}
