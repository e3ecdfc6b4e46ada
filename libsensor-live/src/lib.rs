//! Live capture provider: device enumeration and selection, BPF pre-filter and a
//! blocking capture loop with cooperative stop

mod device;
mod engine;
mod error;

pub use device::*;
pub use engine::*;
pub use error::*;
