//! The replication engine: gossip, anti-entropy, repair, health monitor,
//! heartbeat handling, and garbage collection (§4.3, §4.6–§4.8, §4.10).
//!
//! Each loop is a cooperatively scheduled `tokio` task, matching the
//! teacher's cluster-node background-task layout: one `tokio::spawn` per
//! loop, ticked by an `interval`, selecting against a shared shutdown
//! broadcast so [`crate::metadata_node::MetadataNode::stop`] tears every
//! loop down together.
pub mod anti_entropy;
pub mod apply;
pub mod gc;
pub mod gossip;
pub mod health;
pub mod heartbeat;
pub mod repair;
