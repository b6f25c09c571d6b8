//! Interactive 3D view of a two-ring cognitive loop.
//!
//! Twelve processing nodes sit on an outer and inner ring around a
//! wireframe core; their glow follows the latest emotional and somatic
//! snapshot, and the whole view orbits and zooms under pointer input.

pub mod config;
pub mod rendering;
pub mod simulation;
pub mod topology;

pub use config::VizConfig;
pub use simulation::{ActivitySnapshot, Visualization};
