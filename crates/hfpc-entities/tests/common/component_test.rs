use hfpc_config::{SharedConfig, StackConfig, StackState, TransportBackend};
use hfpc_core::hfp_entities::HfpEntity;
use hfpc_core::{BdAddr, Sap};
use hfpc_entities::hf::HfClient;
use hfpc_entities::MessageRouter;
use hfpc_saps::sapmsg::{HfpMsg, HfpMsgInner};
use hfpc_saps::tnhf::{HfAction, TnhfActionReq};

use super::sink::Sink;

/// Creates a default config for testing. It can still be modified as needed
/// before passing it to the ComponentTest constructor
pub fn default_test_config() -> StackConfig {
    let mut config = StackConfig::new();
    // These tests don't attach a native stack, so backend is None
    config.transport.backend = TransportBackend::None;
    config
}

/// Infrastructure for testing the HF client end-to-end
/// Registers the HF client plus sinks for all observer entities, so tests
/// can inject transport indications and user actions and inspect every
/// message the client produces
pub struct ComponentTest {
    pub config: SharedConfig,
    pub router: MessageRouter,
    pub sinks: Vec<HfpEntity>,
}

impl ComponentTest {
    pub fn new(config: StackConfig) -> Self {
        let shared_config = SharedConfig::from_parts(config, StackState::default());
        let router = MessageRouter::new(shared_config.clone());

        Self {
            config: shared_config,
            router,
            sinks: vec![],
        }
    }

    pub fn get_shared_config(&self) -> SharedConfig {
        self.config.clone()
    }

    /// Register the HF client and a sink per requested entity
    pub fn populate_entities(&mut self, sinks: Vec<HfpEntity>) {
        let hf = HfClient::new(self.config.clone());
        self.router.register_entity(Box::new(hf));
        self.create_sinks(sinks);
    }

    fn create_sinks(&mut self, sinks: Vec<HfpEntity>) {
        for sink in sinks.iter() {
            assert!(!self.sinks.contains(sink), "Sink already exists: {:?}", sink);
            assert!(
                self.router.get_entity(*sink).is_none(),
                "Sink already registered as entity: {:?}",
                sink
            );

            self.sinks.push(*sink);
            let sink = Sink::new(*sink);
            self.router.register_entity(Box::new(sink));
        }
    }

    /// Access the HF client for the read-only query surface
    pub fn hf_client(&mut self) -> &mut HfClient {
        self.router
            .get_entity(HfpEntity::Hf)
            .expect("HF client not registered")
            .as_any_mut()
            .downcast_mut::<HfClient>()
            .expect("entity is not HfClient")
    }

    /// Inject a transport indication as if the native stack produced it
    pub fn submit_ind(&mut self, msg: HfpMsgInner) {
        let message = HfpMsg::new(
            Sap::BthfSap,
            HfpEntity::Transport,
            HfpEntity::Hf,
            self.router.now(),
            msg,
        );
        self.router.submit_message(message);
    }

    /// Inject a user action
    pub fn submit_action(&mut self, peer: BdAddr, action: HfAction) {
        let message = HfpMsg::new(
            Sap::TnhfSap,
            HfpEntity::Control,
            HfpEntity::Hf,
            self.router.now(),
            HfpMsgInner::TnhfActionReq(TnhfActionReq { peer, action }),
        );
        self.router.submit_message(message);
    }

    pub fn run_stack(&mut self, num_ticks: Option<usize>) {
        self.router.run_stack(num_ticks, None);
    }

    pub fn submit_message(&mut self, message: HfpMsg) {
        self.router.submit_message(message);
    }

    pub fn deliver_all_messages(&mut self) {
        self.router.deliver_all_messages();
    }

    /// Collect everything the sinks received, in delivery order per sink
    pub fn dump_sinks(&mut self) -> Vec<HfpMsg> {
        let mut msgs = vec![];
        for sink in self.sinks.clone().iter() {
            msgs.append(&mut self.dump_sink(*sink));
        }
        msgs
    }

    /// Collect what one sink received
    pub fn dump_sink(&mut self, entity: HfpEntity) -> Vec<HfpMsg> {
        if let Some(component) = self.router.get_entity(entity) {
            if let Some(sink) = component.as_any_mut().downcast_mut::<Sink>() {
                return sink.take_msgqueue();
            }
        }
        vec![]
    }
}
