//! Entities of the HFP client stack
//!
//! Each entity owns one concern and talks to the others exclusively through
//! typed primitives delivered by the message router:
//! - `transport`: bridge to the native Bluetooth stack (worker thread)
//! - `hf`: the HF client itself (sessions, calls, audio coordination)

pub mod entity_trait;
pub mod messagerouter;

pub mod hf;
pub mod observer;
pub mod transport;

pub use entity_trait::HfpEntityTrait;
pub use messagerouter::{MessagePrio, MessageQueue, MessageRouter};
