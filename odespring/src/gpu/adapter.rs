// SPDX-License-Identifier: AGPL-3.0-only

//! GPU adapter discovery and selection.
//!
//! The adapter is chosen by `ODESPRING_GPU_ADAPTER` or auto-detected by
//! `SHADER_F64` support, preferring discrete GPUs.

use crate::error::{OdeSpringError, Result};

/// Environment variable naming the adapter to use.
pub const ADAPTER_ENV: &str = "ODESPRING_GPU_ADAPTER";

/// Environment variable restricting the wgpu backends.
pub const BACKEND_ENV: &str = "ODESPRING_WGPU_BACKEND";

/// Summary of a discovered GPU adapter.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    /// Enumeration index (stable within a single run).
    pub index: usize,
    pub name: String,
    pub driver: String,
    pub backend: wgpu::Backend,
    /// Whether `SHADER_F64` is supported.
    pub has_f64: bool,
    pub device_type: wgpu::DeviceType,
}

impl std::fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let f64_tag = if self.has_f64 { "f64" } else { "f32" };
        let kind = match self.device_type {
            wgpu::DeviceType::DiscreteGpu => "discrete",
            wgpu::DeviceType::IntegratedGpu => "integrated",
            wgpu::DeviceType::VirtualGpu => "virtual",
            wgpu::DeviceType::Cpu => "cpu",
            wgpu::DeviceType::Other => "other",
        };
        write!(
            f,
            "[{}] {} ({}, {:?}, {}, {})",
            self.index, self.name, self.driver, self.backend, kind, f64_tag
        )
    }
}

/// Parsed value of [`ADAPTER_ENV`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterSelector {
    /// Discrete + `SHADER_F64` first, then any `SHADER_F64` adapter.
    Auto,
    /// Enumeration index; falls back to a name match if out of range.
    Index(usize),
    /// Lower-cased name substring.
    Name(String),
}

impl AdapterSelector {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let selector = raw.trim().to_lowercase();
        if selector.is_empty() || selector == "auto" {
            Self::Auto
        } else if let Ok(idx) = selector.parse::<usize>() {
            Self::Index(idx)
        } else {
            Self::Name(selector)
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(&std::env::var(ADAPTER_ENV).unwrap_or_default())
    }
}

/// Backends named by [`BACKEND_ENV`]; anything unrecognised means all.
#[must_use]
pub fn parse_backends(raw: Option<&str>) -> wgpu::Backends {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("vulkan") => wgpu::Backends::VULKAN,
        Some("metal") => wgpu::Backends::METAL,
        Some("dx12") => wgpu::Backends::DX12,
        Some("gl") => wgpu::Backends::GL,
        _ => wgpu::Backends::all(),
    }
}

fn create_instance(backends: wgpu::Backends) -> wgpu::Instance {
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    })
}

fn env_backends() -> wgpu::Backends {
    parse_backends(std::env::var(BACKEND_ENV).ok().as_deref())
}

/// Enumerate adapters on the configured backends.
#[must_use]
pub fn enumerate_adapters() -> Vec<AdapterInfo> {
    let backends = env_backends();
    create_instance(backends)
        .enumerate_adapters(backends)
        .into_iter()
        .enumerate()
        .map(|(i, adapter)| {
            let info = adapter.get_info();
            AdapterInfo {
                index: i,
                name: info.name,
                driver: info.driver,
                backend: info.backend,
                has_f64: adapter.features().contains(wgpu::Features::SHADER_F64),
                device_type: info.device_type,
            }
        })
        .collect()
}

/// Select an adapter per [`AdapterSelector::from_env`].
///
/// # Errors
///
/// Returns [`OdeSpringError::NoAdapter`] if nothing matches.
pub fn select_adapter() -> Result<wgpu::Adapter> {
    let selector = AdapterSelector::from_env();
    let backends = env_backends();
    let adapters = create_instance(backends).enumerate_adapters(backends);
    log::debug!("{} adapter(s) found, selector {selector:?}", adapters.len());
    if adapters.is_empty() {
        return Err(OdeSpringError::NoAdapter);
    }
    match selector {
        AdapterSelector::Auto => auto_select(adapters),
        AdapterSelector::Index(idx) if idx < adapters.len() => adapters
            .into_iter()
            .nth(idx)
            .ok_or(OdeSpringError::NoAdapter),
        AdapterSelector::Index(idx) => select_by_name(adapters, &idx.to_string()),
        AdapterSelector::Name(name) => select_by_name(adapters, &name),
    }
}

fn auto_select(adapters: Vec<wgpu::Adapter>) -> Result<wgpu::Adapter> {
    let (discrete, other): (Vec<_>, Vec<_>) = adapters
        .into_iter()
        .filter(|a| a.features().contains(wgpu::Features::SHADER_F64))
        .partition(|a| a.get_info().device_type == wgpu::DeviceType::DiscreteGpu);
    discrete
        .into_iter()
        .chain(other)
        .next()
        .ok_or(OdeSpringError::NoAdapter)
}

fn select_by_name(adapters: Vec<wgpu::Adapter>, needle: &str) -> Result<wgpu::Adapter> {
    adapters
        .into_iter()
        .find(|a| a.get_info().name.to_lowercase().contains(needle))
        .ok_or_else(|| {
            log::error!("no adapter matching '{needle}'");
            OdeSpringError::NoAdapter
        })
}
