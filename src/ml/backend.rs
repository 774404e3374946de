// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// Training runs on Autodiff<_> of one of these; evaluation runs
// on the plain backend.

use serde::{Deserialize, Serialize};

pub type CpuBackend = burn::backend::NdArray;
pub type GpuBackend = burn::backend::Wgpu;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// CPU, always available
    NdArray,
    /// WGPU default adapter
    Wgpu,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::NdArray => write!(f, "ndarray"),
            BackendKind::Wgpu    => write!(f, "wgpu"),
        }
    }
}
