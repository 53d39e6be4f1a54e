//! Index-based primitives for building graphs out of unordered line data.
//!
//! Everything here works on plain `u32` indices into caller-owned arenas:
//! features and endpoints are addressed by position, never by pointer.

pub mod adj;
pub mod components;
pub mod id;
pub mod snap;

pub use adj::AdjacencyMatrix;
pub use components::{connected_components, Components};
pub use id::{FeatureId, GroupId, NodeId};
pub use snap::{cluster_points, Clusters, SnapStrategy};
