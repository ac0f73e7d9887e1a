// ── Shadow store ──
//
// Last-known device state, mutated by telemetry frames and confirmed
// commands, consumed by rendering.

mod shadow;

pub use shadow::ShadowStore;
