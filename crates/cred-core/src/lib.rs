//! # cred-core
//! Foundation types and traits shared by the cred and grain crates.

pub mod address;
pub mod allocation;
pub mod constants;
pub mod error;
pub mod grain;
pub mod graph;
pub mod interval;
pub mod traits;
pub mod types;

pub use address::{AddressInterner, EdgeAddress, NodeAddress};
pub use allocation::{
    Allocation, AllocationId, AllocationPolicy, Distribution, GrainReceipt, PolicyKind,
};
pub use grain::Grain;
pub use graph::{Edge, EdgeWeight, Node, WeightedGraph};
pub use interval::{Interval, Intervals};
pub use types::{
    AllocationIdentity, AttributionRecipient, IdentityId, Participant, PersonalAttribution,
    Proportion,
};
