use hfpc_core::hfp_entities::HfpEntity;
use hfpc_entities::{HfpEntityTrait, MessageQueue};
use hfpc_saps::sapmsg::HfpMsg;

/// An entity sink for testing purposes
/// Collects all received HfpMsg messages for later inspection
pub struct Sink {
    component: HfpEntity,
    msgqueue: Vec<HfpMsg>,
}

impl Sink {
    pub fn new(component: HfpEntity) -> Self {
        Self {
            component,
            msgqueue: vec![],
        }
    }

    pub fn take_msgqueue(&mut self) -> Vec<HfpMsg> {
        std::mem::take(&mut self.msgqueue)
    }
}

impl HfpEntityTrait for Sink {
    fn entity(&self) -> HfpEntity {
        self.component
    }

    fn rx_prim(&mut self, _queue: &mut MessageQueue, message: HfpMsg) {
        tracing::debug!("rx_prim: {:?}", message);
        self.msgqueue.push(message);
    }
}
