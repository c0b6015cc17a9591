//! One-time probe of the compute backend.
//!
//! The host application calls [`probe`] once at start-up. An unavailable
//! backend is reported as a warning and the process continues on the CPU.

use burn::prelude::*;
use burn::backend::NdArray;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Requested compute device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Cpu,
    Cuda,
    Wgpu,
}

impl FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" | "ndarray" => Ok(DeviceKind::Cpu),
            "cuda" | "gpu" => Ok(DeviceKind::Cuda),
            "wgpu" => Ok(DeviceKind::Wgpu),
            other => Err(format!("Unknown device: {}", other)),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceKind::Cpu => "cpu",
            DeviceKind::Cuda => "cuda",
            DeviceKind::Wgpu => "wgpu",
        };
        f.write_str(name)
    }
}

/// Outcome of the backend probe
#[derive(Debug, Clone, Serialize)]
pub struct Capability {
    /// Device asked for
    pub requested: DeviceKind,
    /// Device that will be used
    pub active: DeviceKind,
    /// Whether a tensor could be allocated on the active device
    pub available: bool,
}

impl Capability {
    /// Whether the requested device is the one in use
    pub fn is_fallback(&self) -> bool {
        self.requested != self.active
    }
}

static CAPABILITY: OnceLock<Capability> = OnceLock::new();

/// Probe the backend once per process; later calls return the first result
pub fn probe(requested: DeviceKind) -> &'static Capability {
    CAPABILITY.get_or_init(|| check(requested))
}

fn check(requested: DeviceKind) -> Capability {
    if requested != DeviceKind::Cpu {
        warn!(
            "Backend '{}' is not compiled into this build; falling back to cpu",
            requested
        );
    }

    let available = cpu_available();
    if !available {
        warn!("CPU backend failed its allocation check");
    }
    debug!("Backend probe: requested {}, available {}", requested, available);

    Capability {
        requested,
        active: DeviceKind::Cpu,
        available,
    }
}

fn cpu_available() -> bool {
    type Cpu = NdArray<f32>;

    let device = <Cpu as Backend>::Device::default();
    let sum: f32 = Tensor::<Cpu, 1>::ones([4], &device).sum().into_scalar();
    (sum - 4.0).abs() < f32::EPSILON
}
