//! Value objects - immutable, validated-by-construction types.

mod qos;
mod topic;

pub use qos::QoS;
pub use topic::Topic;
