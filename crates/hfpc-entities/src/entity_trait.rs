use crate::MessageQueue;
use as_any::AsAny;
use hfpc_config::SharedConfig;
use hfpc_core::{hfp_entities::HfpEntity, MonoTime};
use hfpc_saps::HfpMsg;

/// Trait for stack entities
/// Used by MessageRouter for passing messages between entities
pub trait HfpEntityTrait: Send + AsAny {
    /// Returns the entity type identifier
    fn entity(&self) -> HfpEntity;

    /// Handle incoming SAP primitive
    fn rx_prim(&mut self, queue: &mut MessageQueue, message: HfpMsg);

    /// Update configuration (optional)
    #[allow(dead_code)]
    fn set_config(&mut self, _config: SharedConfig) {}

    /// Called at the start of each tick; deadline checks go here
    fn tick_start(&mut self, _queue: &mut MessageQueue, _now: MonoTime) {}

    /// Called at the end of each tick
    fn tick_end(&mut self, _queue: &mut MessageQueue, _now: MonoTime) -> bool {
        false
    }
}
