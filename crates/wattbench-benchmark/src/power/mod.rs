//! Best-effort power-draw monitoring across GPU vendors.
//!
//! Supported:
//!   - NVIDIA (all OS) via nvidia-smi
//!   - AMD Linux via rocm-smi
//!   - Apple Silicon via powermetrics (requires passwordless sudo)
//!
//! Unsupported platforms yield an unavailable [`PowerStats`], never an error.

mod probe;
mod sampler;

pub use probe::{detect_method, PowerProbe, VendorProbe};
pub use sampler::PowerSampler;

pub use wattbench_core::{PowerMethod, PowerStats};
