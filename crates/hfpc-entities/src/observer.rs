use hfpc_core::hfp_entities::HfpEntity;
use hfpc_saps::HfpMsg;

use crate::{HfpEntityTrait, MessageQueue};

/// Terminal observer for a notification stream nothing else consumes.
/// The daemon registers one per observer entity so notifications land in
/// the log instead of tripping the router's unknown-destination warning.
pub struct NotificationObserver {
    entity: HfpEntity,
}

impl NotificationObserver {
    pub fn new(entity: HfpEntity) -> Self {
        Self { entity }
    }
}

impl HfpEntityTrait for NotificationObserver {
    fn entity(&self) -> HfpEntity {
        self.entity
    }

    fn rx_prim(&mut self, _queue: &mut MessageQueue, message: HfpMsg) {
        tracing::info!("<- {:?}", message.msg);
    }
}
