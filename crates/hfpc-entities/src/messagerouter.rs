use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hfpc_config::SharedConfig;
use hfpc_core::{hfp_entities::HfpEntity, MonoTime};
use hfpc_saps::HfpMsg;

use crate::HfpEntityTrait;

/// Tick interval of the stack clock
pub const TICK_MS: u64 = 100;

#[derive(Default)]
pub enum MessagePrio {
    Immediate,
    #[default]
    Normal,
}

pub struct MessageQueue {
    messages: VecDeque<HfpMsg>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self {
            messages: VecDeque::new(),
        }
    }

    pub fn push_back(&mut self, message: HfpMsg) {
        self.messages.push_back(message);
    }

    pub fn push_prio(&mut self, message: HfpMsg, prio: MessagePrio) {
        match prio {
            MessagePrio::Immediate => {
                // Insert at the front for immediate processing
                self.messages.push_front(message);
            }
            MessagePrio::Normal => {
                // Insert at the back for normal processing
                self.messages.push_back(message);
            }
        }
    }

    pub fn pop_front(&mut self) -> Option<HfpMsg> {
        self.messages.pop_front()
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MessageRouter {
    /// While currently unused by the MessageRouter, this may change in the future
    /// As such, we provide the MessageRouter with a copy of the SharedConfig
    _config: SharedConfig,
    entities: HashMap<HfpEntity, Box<dyn HfpEntityTrait>>,
    msg_queue: MessageQueue,

    /// The current stack time, advanced by TICK_MS at the end of every tick
    now: MonoTime,
}

impl MessageRouter {
    pub fn new(config: SharedConfig) -> Self {
        Self {
            entities: HashMap::new(),
            msg_queue: MessageQueue {
                messages: VecDeque::new(),
            },
            _config: config,
            now: MonoTime::default(),
        }
    }

    pub fn now(&self) -> MonoTime {
        self.now
    }

    /// Jump the stack clock forward. Tests use this to hit deadline checks
    /// without spinning ticks.
    pub fn advance_millis(&mut self, ms: u64) {
        self.now = self.now.add_millis(ms);
    }

    pub fn register_entity(&mut self, entity: Box<dyn HfpEntityTrait>) {
        let comp_type = entity.entity();
        tracing::debug!("register_entity {:?}", comp_type);
        self.entities.insert(comp_type, entity);
    }

    /// Returns a mut ref to a component of the requested type
    pub fn get_entity(&mut self, comp: HfpEntity) -> Option<&mut dyn HfpEntityTrait> {
        self.entities.get_mut(&comp).map(|entity| entity.as_mut())
    }

    pub fn submit_message(&mut self, message: HfpMsg) {
        tracing::debug!(
            "submit_message {:?}: {:?} -> {:?}",
            message.get_sap(),
            message.get_source(),
            message.get_dest()
        );
        self.msg_queue.push_back(message);
    }

    pub fn deliver_message(&mut self) {
        let message = self.msg_queue.pop_front();
        if let Some(message) = message {
            tracing::debug!(
                "deliver_message: got {:?}: {:?} -> {:?}",
                message.get_sap(),
                message.get_source(),
                message.get_dest()
            );

            // Determine the destination entity
            let dest = message.get_dest();

            // Check if the destination entity registered and deliver if found
            if let Some(entity) = self.entities.get_mut(dest) {
                entity.rx_prim(&mut self.msg_queue, message);
            } else {
                tracing::warn!(
                    "deliver_message: entity {:?} not found for {:?}: {:?} -> {:?}",
                    dest,
                    message.get_sap(),
                    message.get_source(),
                    message.get_dest()
                );
            }
        }
    }

    pub fn deliver_all_messages(&mut self) {
        while !self.msg_queue.messages.is_empty() {
            self.deliver_message();
        }
    }

    pub fn get_msgqueue_len(&self) -> usize {
        self.msg_queue.messages.len()
    }

    pub fn tick_start(&mut self) {
        tracing::debug!("--- tick {} ----------------------------", self.now);

        // Call tick on all entities
        for entity in self.entities.values_mut() {
            entity.tick_start(&mut self.msg_queue, self.now);
        }
    }

    pub fn tick_end(&mut self) {
        for entity in self.entities.values_mut() {
            entity.tick_end(&mut self.msg_queue, self.now);
        }
        self.deliver_all_messages();

        // Advance the stack clock
        self.now = self.now.add_millis(TICK_MS);
    }

    /// Runs the full stack either forever or for a specified number of ticks.
    /// With `num_ticks` None the loop paces itself to TICK_MS wall time;
    /// bounded runs (tests) spin as fast as possible.
    /// The optional `running` flag stops the loop when cleared.
    pub fn run_stack(&mut self, num_ticks: Option<usize>, running: Option<Arc<AtomicBool>>) {
        let mut ticks: usize = 0;

        loop {
            // Send tick_start event
            self.tick_start();

            // Deliver messages until queue empty
            while self.get_msgqueue_len() > 0 {
                self.deliver_all_messages();
            }

            // Send tick_end event and process final messages
            self.tick_end();

            // Check if we should stop
            ticks += 1;
            if let Some(num_ticks) = num_ticks {
                if ticks >= num_ticks {
                    break;
                }
            } else {
                std::thread::sleep(Duration::from_millis(TICK_MS));
            }
            if let Some(ref running) = running {
                if !running.load(Ordering::SeqCst) {
                    tracing::info!("run_stack: shutdown requested");
                    break;
                }
            }
        }
    }
}
