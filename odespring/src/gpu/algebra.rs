// SPDX-License-Identifier: AGPL-3.0-only

//! Linear-combination kernels over [`GpuVector`] for the generic steppers.
//!
//! One WGSL kernel per `(term count, accumulate)` pair is generated from a
//! template on first use and cached. Every operation is a separate queue
//! submission that reads its coefficients from a single reusable params
//! buffer.
//!
//! ```text
//! params = [n, c1, …, ck]
//! lincomb:    out[i] =          c1·v1[i] + … + ck·vk[i]
//! accumulate: out[i] = out[i] + c1·v1[i] + … + ck·vk[i]
//! ```
//!
//! Bytes touched are counted at 8 bytes per element for every vector read
//! or written; `accumulate` reads and writes `out`.

use super::{workgroups_for, GpuF64, GpuVector, WORKGROUP_SIZE};
use crate::odeint::Algebra;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt::Write as _;

/// Largest term count with a dedicated kernel; longer sums are chained.
pub const MAX_TERMS: usize = 5;

/// WGSL source of the scale-sum kernel with `terms` inputs.
#[must_use]
pub fn scale_sum_shader(terms: usize, accumulate: bool) -> String {
    let mut src = String::from(
        "@group(0) @binding(0) var<storage, read> params: array<f64>;\n\
         @group(0) @binding(1) var<storage, read_write> v0: array<f64>;\n",
    );
    for k in 1..=terms {
        let _ = writeln!(
            src,
            "@group(0) @binding({}) var<storage, read> v{k}: array<f64>;",
            k + 1
        );
    }
    let mut expr = if accumulate {
        String::from("v0[i]")
    } else {
        String::new()
    };
    for k in 1..=terms {
        if !expr.is_empty() {
            expr.push_str(" + ");
        }
        let _ = write!(expr, "params[{k}] * v{k}[i]");
    }
    let _ = write!(
        src,
        r"
@compute @workgroup_size({WORKGROUP_SIZE})
fn main(@builtin(global_invocation_id) gid: vec3<u32>,
        @builtin(num_workgroups) nwg: vec3<u32>) {{
    let i = gid.x + gid.y * nwg.x * {WORKGROUP_SIZE}u;
    let n = u32(params[0]);
    if (i >= n) {{
        return;
    }}
    v0[i] = {expr};
}}
"
    );
    src
}

/// [`Algebra`] implementation running on a [`GpuF64`] device.
pub struct GpuAlgebra<'g> {
    gpu: &'g GpuF64,
    pipelines: RefCell<HashMap<(usize, bool), wgpu::ComputePipeline>>,
    params: wgpu::Buffer,
    bytes_touched: Cell<u64>,
}

impl<'g> GpuAlgebra<'g> {
    #[must_use]
    pub fn new(gpu: &'g GpuF64) -> Self {
        Self {
            gpu,
            pipelines: RefCell::new(HashMap::new()),
            params: gpu.create_f64_output_buffer(1 + MAX_TERMS, "scale_sum_params"),
            bytes_touched: Cell::new(0),
        }
    }

    #[must_use]
    pub const fn gpu(&self) -> &'g GpuF64 {
        self.gpu
    }

    /// Bytes read and written by all kernels so far, right-hand sides included.
    #[must_use]
    pub fn bytes_touched(&self) -> u64 {
        self.bytes_touched.get()
    }

    /// Add traffic from a kernel launched outside this algebra.
    pub fn record_bytes(&self, bytes: u64) {
        self.bytes_touched.set(self.bytes_touched.get() + bytes);
    }

    /// Number of compiled scale-sum kernels.
    #[must_use]
    pub fn cached_kernels(&self) -> usize {
        self.pipelines.borrow().len()
    }

    fn apply(&self, out: &GpuVector, terms: &[(f64, &GpuVector)], accumulate: bool) {
        if terms.is_empty() {
            if !accumulate {
                let mut encoder = self.gpu.begin_encoder("scale_sum0");
                encoder.clear_buffer(out.buffer(), 0, None);
                self.gpu.submit_encoder(encoder);
                self.record_bytes(out.len() as u64 * 8);
            }
            return;
        }
        for (k, chunk) in terms.chunks(MAX_TERMS).enumerate() {
            self.dispatch_chunk(out, chunk, accumulate || k > 0);
        }
    }

    fn dispatch_chunk(&self, out: &GpuVector, terms: &[(f64, &GpuVector)], accumulate: bool) {
        let n = out.len();
        debug_assert!(terms.iter().all(|(_, v)| v.len() == n));

        let mut params = Vec::with_capacity(1 + terms.len());
        params.push(n as f64);
        params.extend(terms.iter().map(|(c, _)| *c));
        self.gpu.upload_f64(&self.params, &params);

        let mut cache = self.pipelines.borrow_mut();
        let pipeline = cache.entry((terms.len(), accumulate)).or_insert_with(|| {
            let label = format!(
                "scale_sum{}{}",
                terms.len(),
                if accumulate { "_acc" } else { "" }
            );
            self.gpu
                .create_pipeline(&scale_sum_shader(terms.len(), accumulate), &label)
        });

        let mut buffers: Vec<&wgpu::Buffer> = Vec::with_capacity(2 + terms.len());
        buffers.push(&self.params);
        buffers.push(out.buffer());
        buffers.extend(terms.iter().map(|(_, v)| v.buffer()));
        let bind_group = self.gpu.create_bind_group(pipeline, &buffers);
        self.gpu.dispatch(pipeline, &bind_group, workgroups_for(n));

        let vectors = terms.len() as u64 + if accumulate { 2 } else { 1 };
        self.record_bytes(vectors * n as u64 * 8);
    }
}

impl Algebra for GpuAlgebra<'_> {
    type Vector = GpuVector;

    fn dim(&self, v: &GpuVector) -> usize {
        v.len()
    }

    fn zeros_like(&self, v: &GpuVector) -> GpuVector {
        GpuVector::zeros(self.gpu, v.len(), "stage")
    }

    fn lincomb(&self, out: &mut GpuVector, terms: &[(f64, &GpuVector)]) {
        self.apply(out, terms, false);
    }

    fn accumulate(&self, out: &mut GpuVector, terms: &[(f64, &GpuVector)]) {
        self.apply(out, terms, true);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::cpu::HostAlgebra;

    #[test]
    fn shader_binds_every_input() {
        let src = scale_sum_shader(3, false);
        for b in 0..5 {
            assert!(src.contains(&format!("@binding({b})")), "missing binding {b}");
        }
        assert!(!src.contains("@binding(5)"));
        assert!(src.contains("v0[i] = params[1] * v1[i] + params[2] * v2[i] + params[3] * v3[i];"));
    }

    #[test]
    fn accumulate_shader_reads_output() {
        let src = scale_sum_shader(1, true);
        assert!(src.contains("v0[i] = v0[i] + params[1] * v1[i];"));
        assert!(src.contains("@compute @workgroup_size(64)"));
    }

    fn gpu() -> GpuF64 {
        let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
        rt.block_on(GpuF64::new()).expect("GPU with SHADER_F64")
    }

    #[test]
    #[ignore = "requires GPU"]
    fn lincomb_matches_host() {
        let gpu = gpu();
        let alg = GpuAlgebra::new(&gpu);
        let host = HostAlgebra::serial();
        let n = 1000;
        let a: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();
        let b: Vec<f64> = (0..n).map(|i| (i as f64 * 0.5).cos()).collect();
        let mut h = vec![0.0; n];
        host.lincomb(&mut h, &[(0.5, &a), (-1.25, &b)]);

        let ga = GpuVector::from_host(&gpu, &a, "a");
        let gb = GpuVector::from_host(&gpu, &b, "b");
        let mut g = alg.zeros_like(&ga);
        alg.lincomb(&mut g, &[(0.5, &ga), (-1.25, &gb)]);
        let back = g.to_host(&gpu).expect("readback");
        for (x, y) in h.iter().zip(&back) {
            assert!((x - y).abs() < 1e-14);
        }
        assert_eq!(alg.bytes_touched(), 3 * n as u64 * 8);
    }

    #[test]
    #[ignore = "requires GPU"]
    fn long_sums_are_chained_and_kernels_cached() {
        let gpu = gpu();
        let alg = GpuAlgebra::new(&gpu);
        let one = GpuVector::from_host(&gpu, &[1.0; 10], "one");
        let mut out = GpuVector::from_host(&gpu, &[2.0; 10], "out");
        let terms: Vec<(f64, &GpuVector)> = (0..7).map(|_| (1.0, &one)).collect();
        alg.accumulate(&mut out, &terms);
        alg.accumulate(&mut out, &terms);
        let back = out.to_host(&gpu).expect("readback");
        assert!(back.iter().all(|v| (v - 16.0).abs() < 1e-14));
        // (5, acc) and (2, acc)
        assert_eq!(alg.cached_kernels(), 2);
    }
}
