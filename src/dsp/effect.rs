//! Effect trait definition
//!
//! Base trait for the in-memory effects that keep the buffer length intact
//! (fades, gain and dynamics). Trimming stages change the frame count and are
//! plain functions instead.

use crate::engine::AudioBuffer;

/// In-place, length-preserving DSP effect
pub trait Effect: Send {
    /// Process audio buffer in-place
    fn process(&mut self, buffer: &mut AudioBuffer);
}
