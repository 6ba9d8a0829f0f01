//! astroprop: an orbital state propagation kernel.
//!
//! The workspace splits the engine into focused crates — core types,
//! frame/time adapters, force models, integrators, event detection, and the
//! propagation session — and this facade re-exports them under stable
//! module names. The [`scenario`] module assembles a runnable
//! [`session::PropagationSession`] from a parsed configuration document
//! plus a set of ephemeris/frame/time providers.

pub use astroprop_config as config;
pub use astroprop_core::{constants, matrix, state, time, units, vector};
pub use astroprop_events as events;
pub use astroprop_export as export;
pub use astroprop_forces as forces;
pub use astroprop_frames as frames;
pub use astroprop_integrate as integrate;
pub use astroprop_session as session;

pub mod scenario;

/// Returns the version of the library for smoke tests.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
