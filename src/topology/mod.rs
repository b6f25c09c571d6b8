//! Static structure of the cognitive loop: which nodes exist, how they are
//! wired, and where they sit in space.

pub mod layout;
pub mod table;

pub use layout::{compute_layout, ring_position, Layout};
pub use table::{EdgeCategory, EdgeSpec, NodeId, NodeSpec, Ring, Topology};
