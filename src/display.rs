//! Optional display peer.
//!
//! A renderer may be attached to exaggerate specimen displacements so the
//! fracture is visible. The controller works identically without one.

use crate::phase::LoadMode;

/// Receives per-phase display settings.
pub trait DisplayPeer: Send {
    /// Set the uniform displacement scale factor.
    fn set_displacement_scale(&mut self, scale: f64);
}

/// Displacement scale for a phase: 1000 in tension, 100 in compression.
#[must_use]
pub const fn displacement_scale(mode: LoadMode) -> f64 {
    match mode {
        LoadMode::Tension => 1000.0,
        LoadMode::Compression => 100.0,
    }
}
