use std::collections::HashMap;

use hfpc_config::SharedConfig;
use hfpc_core::{hfp_entities::HfpEntity, AudioState, BdAddr, Call, CallId, HfState, MonoTime};
use hfpc_saps::bthf::{ChldFeatures, PeerFeatures};
use hfpc_saps::tnhf::{AudioPolicy, HfAction};
use hfpc_saps::{HfpMsg, HfpMsgInner};

use crate::hf::components::indicators::AmbientIndicators;
use crate::hf::session::HfSession;
use crate::{HfpEntityTrait, MessageQueue};

/// The HF client entity: owns one session per peer and routes transport
/// indications and user actions to them. Sessions live from the first
/// Connecting transition until they fall back to Disconnected.
pub struct HfClient {
    config: SharedConfig,
    now: MonoTime,
    sessions: HashMap<BdAddr, HfSession>,
}

impl HfClient {
    pub fn new(config: SharedConfig) -> Self {
        Self {
            config,
            now: MonoTime::default(),
            sessions: HashMap::new(),
        }
    }

    // ─── Public action surface ────────────────────────────────────
    //
    // Each returns whether the action can be attempted in the current
    // state; completion arrives as notifications.

    pub fn connect(&mut self, queue: &mut MessageQueue, peer: BdAddr) -> bool {
        self.dispatch_action(queue, peer, HfAction::Connect)
    }

    pub fn disconnect(&mut self, queue: &mut MessageQueue, peer: BdAddr) -> bool {
        self.dispatch_action(queue, peer, HfAction::Disconnect)
    }

    pub fn connect_audio(&mut self, queue: &mut MessageQueue, peer: BdAddr) -> bool {
        self.dispatch_action(queue, peer, HfAction::ConnectAudio)
    }

    pub fn disconnect_audio(&mut self, queue: &mut MessageQueue, peer: BdAddr) -> bool {
        self.dispatch_action(queue, peer, HfAction::DisconnectAudio)
    }

    pub fn dial(&mut self, queue: &mut MessageQueue, peer: BdAddr, number: String) -> bool {
        self.dispatch_action(queue, peer, HfAction::Dial(number))
    }

    pub fn accept_call(&mut self, queue: &mut MessageQueue, peer: BdAddr) -> bool {
        self.dispatch_action(queue, peer, HfAction::AcceptCall)
    }

    pub fn reject_call(&mut self, queue: &mut MessageQueue, peer: BdAddr) -> bool {
        self.dispatch_action(queue, peer, HfAction::RejectCall)
    }

    pub fn terminate_call(
        &mut self,
        queue: &mut MessageQueue,
        peer: BdAddr,
        id: Option<CallId>,
    ) -> bool {
        self.dispatch_action(queue, peer, HfAction::TerminateCall(id))
    }

    pub fn hold_call(&mut self, queue: &mut MessageQueue, peer: BdAddr) -> bool {
        self.dispatch_action(queue, peer, HfAction::HoldCall)
    }

    pub fn private_mode(&mut self, queue: &mut MessageQueue, peer: BdAddr, id: CallId) -> bool {
        self.dispatch_action(queue, peer, HfAction::PrivateMode(id))
    }

    pub fn explicit_transfer(&mut self, queue: &mut MessageQueue, peer: BdAddr) -> bool {
        self.dispatch_action(queue, peer, HfAction::ExplicitTransfer)
    }

    pub fn send_dtmf(&mut self, queue: &mut MessageQueue, peer: BdAddr, code: char) -> bool {
        self.dispatch_action(queue, peer, HfAction::SendDtmf(code))
    }

    pub fn voice_recognition(
        &mut self,
        queue: &mut MessageQueue,
        peer: BdAddr,
        enable: bool,
    ) -> bool {
        self.dispatch_action(queue, peer, HfAction::VoiceRecognition(enable))
    }

    pub fn set_audio_route_allowed(
        &mut self,
        queue: &mut MessageQueue,
        peer: BdAddr,
        allowed: bool,
    ) -> bool {
        self.dispatch_action(queue, peer, HfAction::SetAudioRouteAllowed(allowed))
    }

    pub fn set_audio_policy(
        &mut self,
        queue: &mut MessageQueue,
        peer: BdAddr,
        policy: AudioPolicy,
    ) -> bool {
        self.dispatch_action(queue, peer, HfAction::SetAudioPolicy(policy))
    }

    // ─── Read-only query surface ──────────────────────────────────

    pub fn connection_state(&self, peer: BdAddr) -> HfState {
        self.sessions
            .get(&peer)
            .map(|s| s.state())
            .unwrap_or(HfState::Disconnected)
    }

    pub fn audio_state(&self, peer: BdAddr) -> AudioState {
        self.sessions
            .get(&peer)
            .map(|s| s.audio_state())
            .unwrap_or(AudioState::Disconnected)
    }

    pub fn current_calls(&self, peer: BdAddr) -> Vec<Call> {
        self.sessions
            .get(&peer)
            .map(|s| s.current_calls())
            .unwrap_or_default()
    }

    pub fn features(&self, peer: BdAddr) -> Option<(PeerFeatures, ChldFeatures)> {
        self.sessions.get(&peer).and_then(|s| s.features())
    }

    pub fn indicators(&self, peer: BdAddr) -> Option<AmbientIndicators> {
        self.sessions.get(&peer).map(|s| s.indicators())
    }

    pub fn connected_peers(&self) -> Vec<BdAddr> {
        let mut v: Vec<BdAddr> = self
            .sessions
            .iter()
            .filter(|(_, s)| matches!(s.state(), HfState::Connected | HfState::AudioOn))
            .map(|(peer, _)| *peer)
            .collect();
        v.sort();
        v
    }

    // ─── Internals ────────────────────────────────────────────────

    fn dispatch_action(&mut self, queue: &mut MessageQueue, peer: BdAddr, action: HfAction) -> bool {
        // Only a connect may bring a session into existence
        if !self.sessions.contains_key(&peer) {
            if action != HfAction::Connect {
                tracing::debug!("{}: {:?} for unknown device, rejected", peer, action);
                return false;
            }
            tracing::info!("{}: new session", peer);
            self.sessions
                .insert(peer, HfSession::new(self.config.clone(), peer, self.now));
        }

        let session = self
            .sessions
            .get_mut(&peer)
            .expect("session inserted above");
        let accepted = session.handle_action(queue, action);
        self.purge_disconnected();
        accepted
    }

    /// Sessions that fell back to Disconnected are gone for good; a new
    /// connect starts from scratch
    fn purge_disconnected(&mut self) {
        self.sessions.retain(|peer, session| {
            let keep = session.state() != HfState::Disconnected;
            if !keep {
                tracing::info!("{}: session destroyed", peer);
            }
            keep
        });
    }

    fn peer_of(msg: &HfpMsgInner) -> Option<BdAddr> {
        match msg {
            HfpMsgInner::BthfConnStateInd(ind) => Some(ind.peer),
            HfpMsgInner::BthfAudioStateInd(ind) => Some(ind.peer),
            HfpMsgInner::BthfCurrentCallInd(ind) => Some(ind.peer),
            HfpMsgInner::BthfCmdResultInd(ind) => Some(ind.peer),
            HfpMsgInner::BthfNetworkStateInd(ind) => Some(ind.peer),
            HfpMsgInner::BthfNetworkRoamingInd(ind) => Some(ind.peer),
            HfpMsgInner::BthfNetworkSignalInd(ind) => Some(ind.peer),
            HfpMsgInner::BthfBatteryLevelInd(ind) => Some(ind.peer),
            HfpMsgInner::BthfOperatorNameInd(ind) => Some(ind.peer),
            HfpMsgInner::BthfCallIndicatorInd(ind) => Some(ind.peer),
            HfpMsgInner::BthfRingInd(ind) => Some(ind.peer),
            HfpMsgInner::BthfInBandRingInd(ind) => Some(ind.peer),
            HfpMsgInner::BthfVrStateInd(ind) => Some(ind.peer),
            HfpMsgInner::BthfVolumeInd(ind) => Some(ind.peer),
            HfpMsgInner::BthfSubscriberInfoInd(ind) => Some(ind.peer),
            HfpMsgInner::TnhfActionReq(req) => Some(req.peer),
            _ => None,
        }
    }

    /// An unknown peer may only enter via a transport connection
    /// indication (incoming connection accepted by the native stack)
    fn admits_new_session(msg: &HfpMsgInner) -> bool {
        matches!(msg, HfpMsgInner::BthfConnStateInd(_))
    }
}

impl HfpEntityTrait for HfClient {
    fn entity(&self) -> HfpEntity {
        HfpEntity::Hf
    }

    fn set_config(&mut self, config: SharedConfig) {
        self.config = config;
    }

    fn rx_prim(&mut self, queue: &mut MessageQueue, message: HfpMsg) {
        let Some(peer) = Self::peer_of(&message.msg) else {
            tracing::warn!("rx_prim: unexpected message {:?}", message.msg);
            return;
        };

        // Actions go through the same path as the public methods so both
        // get identical state handling
        if let HfpMsgInner::TnhfActionReq(req) = message.msg {
            self.dispatch_action(queue, peer, req.action);
            return;
        }

        if !self.sessions.contains_key(&peer) {
            if !Self::admits_new_session(&message.msg) {
                // Unknown-device events are tolerated, not fatal
                tracing::debug!("{}: {:?} for unknown device, ignored", peer, message.msg);
                return;
            }
            tracing::info!("{}: new session (remote initiated)", peer);
            self.sessions
                .insert(peer, HfSession::new(self.config.clone(), peer, self.now));
        }

        if let Some(session) = self.sessions.get_mut(&peer) {
            session.rx_prim(queue, message);
        }
        self.purge_disconnected();
    }

    fn tick_start(&mut self, queue: &mut MessageQueue, now: MonoTime) {
        self.now = now;
        for session in self.sessions.values_mut() {
            session.tick_start(queue, now);
        }
        self.purge_disconnected();
    }
}
