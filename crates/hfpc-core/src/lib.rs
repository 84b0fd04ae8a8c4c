//! Core utilities for the HFP client stack
//!
//! This crate provides fundamental types used across the stack:
//! - MonoTime for monotonic stack timing
//! - BdAddr device addresses
//! - Call and audio types shared between entities
//! - SAP and entity identifiers
//! - Common macros and debug utilities

pub mod address;
pub mod call;
pub mod debug;
pub mod hfp_common;
pub mod hfp_entities;
pub mod mono_time;

// Re-export commonly used items
pub use address::BdAddr;
pub use call::*;
pub use hfp_common::*;
pub use hfp_entities::HfpEntity;
pub use mono_time::MonoTime;

/// Index of a call as reported by the peer in current-call listings
pub type CallId = u32;

/// Reserved id for an HF-originated call the peer has not yet confirmed.
/// Rebound to the peer-assigned id on the first call listing that shows it.
pub const OUTGOING_CALL_ID: CallId = u32::MAX;
